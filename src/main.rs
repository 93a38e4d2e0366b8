use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use qubic_exchange::cli::{console, Cli, Commands};
use qubic_exchange::identity::{generate_seed, IdentityPackage};
use qubic_exchange::{ExchangeConfig, ExchangeService, LocalWalletFactory, SimulatedSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = ExchangeConfig::load_or_default(&cli.config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_exchange(config).await?,
        Commands::Seed { length } => {
            let length = length.unwrap_or(config.accounts.seed_length);
            println!("{}", generate_seed(&config.accounts.seed_alphabet, length)?);
        }
        Commands::Identity { seed } => {
            let package = IdentityPackage::from_seed(&seed)?;
            println!("Public ID: {}", package.public_id);
            println!("Public Key: {}", hex::encode(package.public_key));
        }
    }
    Ok(())
}

async fn run_exchange(config: ExchangeConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("=== Qubic Exchange Simulation ===");

    let session = Arc::new(SimulatedSession::new(
        config.network.peer_host.clone(),
        Duration::from_millis(config.network.tick_interval_ms),
        config.network.initial_tick,
    ));
    let service = ExchangeService::new(Arc::new(LocalWalletFactory::new()), session.clone(), config);

    let handles = service.connect()?;
    for account in service.provision().await? {
        info!("Account {}: {} Qubic ({})", account.id, account.balance, account.public_id);
    }

    let registry = service.registry();
    if let Err(e) = console::run_console(&registry).await {
        error!("Console error: {}", e);
    }

    service.shutdown();
    session.stop();
    for handle in handles {
        let _ = handle.await;
    }
    info!("Shut down");
    Ok(())
}
