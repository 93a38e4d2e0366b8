//! Line-oriented operator console over the account registry

use std::fmt::Write as _;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::account::{AccountId, AccountRegistry};

pub const HELP: &str = "\
Commands:
  list                              show accounts
  tick                              show current network tick
  history                           show transaction log
  json                              dump accounts and log as JSON
  create [balance]                  create an account with a generated seed
  withdraw <id> <amount> <dest>     send funds to an external public id
  transfer <from> <to> <amount>     move funds between accounts
  deposit <id> <amount>             credit an account locally
  lock <id>                         toggle the lock flag
  poll                              request balances for all wallets
  help                              show this text
  quit                              exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    List,
    Tick,
    History,
    Json,
    Create { balance: Option<u64> },
    Withdraw { id: AccountId, amount: u64, destination: String },
    Transfer { from: AccountId, to: AccountId, amount: u64 },
    Deposit { id: AccountId, amount: u64 },
    Lock { id: AccountId },
    Poll,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((verb, args)) = parts.split_first() else {
        return Err("empty command".to_string());
    };

    let expect = |n: usize| -> Result<(), String> {
        if args.len() == n {
            Ok(())
        } else {
            Err(format!("{} takes {} argument(s)", verb, n))
        }
    };

    match verb.to_lowercase().as_str() {
        "list" | "ls" => Ok(ConsoleCommand::List),
        "tick" => Ok(ConsoleCommand::Tick),
        "history" => Ok(ConsoleCommand::History),
        "json" => Ok(ConsoleCommand::Json),
        "create" => match args {
            [] => Ok(ConsoleCommand::Create { balance: None }),
            [balance] => Ok(ConsoleCommand::Create {
                balance: Some(parse_amount(balance)?),
            }),
            _ => Err("create takes at most 1 argument".to_string()),
        },
        "withdraw" => {
            expect(3)?;
            Ok(ConsoleCommand::Withdraw {
                id: args[0].parse()?,
                amount: parse_amount(args[1])?,
                destination: args[2].to_string(),
            })
        }
        "transfer" => {
            expect(3)?;
            Ok(ConsoleCommand::Transfer {
                from: args[0].parse()?,
                to: args[1].parse()?,
                amount: parse_amount(args[2])?,
            })
        }
        "deposit" => {
            expect(2)?;
            Ok(ConsoleCommand::Deposit {
                id: args[0].parse()?,
                amount: parse_amount(args[1])?,
            })
        }
        "lock" => {
            expect(1)?;
            Ok(ConsoleCommand::Lock { id: args[0].parse()? })
        }
        "poll" => Ok(ConsoleCommand::Poll),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(format!("unknown command '{}'", other)),
    }
}

fn parse_amount(s: &str) -> Result<u64, String> {
    s.parse::<u64>().map_err(|_| format!("Invalid amount: {}", s))
}

/// Run one command and render its result
pub async fn execute(registry: &AccountRegistry, command: ConsoleCommand) -> String {
    match command {
        ConsoleCommand::List => {
            let accounts = registry.accounts().await;
            if accounts.is_empty() {
                return "No accounts".to_string();
            }
            let mut out = String::new();
            for a in accounts {
                let _ = writeln!(
                    out,
                    "Account {}: {} Qubic{}\t{}",
                    a.id,
                    a.balance,
                    if a.locked { " [locked]" } else { "" },
                    a.public_id
                );
            }
            out.trim_end().to_string()
        }
        ConsoleCommand::Tick => format!("Current tick: {}", registry.current_tick()),
        ConsoleCommand::History => {
            let log = registry.transactions().await;
            if log.is_empty() {
                return "No transactions".to_string();
            }
            log.iter()
                .map(|r| format!("{:?} {} from {} to {} @ tick {}", r.kind, r.amount, r.from, r.to, r.tick))
                .collect::<Vec<_>>()
                .join("\n")
        }
        ConsoleCommand::Json => {
            let dump = serde_json::json!({
                "tick": registry.current_tick(),
                "accounts": registry.accounts().await,
                "transactions": registry.transactions().await,
            });
            serde_json::to_string_pretty(&dump).unwrap_or_else(|e| format!("Serialization failed: {}", e))
        }
        ConsoleCommand::Create { balance } => match registry.create_generated_account(balance).await {
            Ok(a) => format!("Created account {} with {} Qubic ({})", a.id, a.balance, a.public_id),
            Err(e) => format!("Account creation failed: {}", e),
        },
        ConsoleCommand::Withdraw { id, amount, destination } => {
            registry.withdraw(id, amount, &destination).await.to_string()
        }
        ConsoleCommand::Transfer { from, to, amount } => {
            registry.transfer(from, to, amount).await.to_string()
        }
        ConsoleCommand::Deposit { id, amount } => registry.deposit(id, amount).await.to_string(),
        ConsoleCommand::Lock { id } => match registry.toggle_lock(id).await {
            Some(true) => format!("Account {} locked", id),
            Some(false) => format!("Account {} unlocked", id),
            None => format!("Unknown account {}", id),
        },
        ConsoleCommand::Poll => format!("Requested {} balances", registry.check_balances().await),
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Quit => "Bye".to_string(),
    }
}

/// Read commands from stdin until `quit` or EOF
pub async fn run_console(registry: &AccountRegistry) -> std::io::Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    stdout.write_all(format!("{}\n> ", HELP).as_bytes()).await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        let reply = match parse_command(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => execute(registry, command).await,
            Err(e) => format!("Error: {}", e),
        };
        stdout.write_all(format!("{}\n> ", reply).as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
