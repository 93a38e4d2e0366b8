//! Account registry: sole owner of accounts, balances and the transaction log.
//!
//! Every operation holds the state lock from validation to the last mutation,
//! including across the wallet factory await, so operations never interleave and
//! the two legs of a transfer are applied together.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::balance::{self, BalanceError};
use super::types::{
    Account, AccountId, AccountSnapshot, OperationOutcome, Party, Rejection, SubmissionFailure,
    TransactionKind, TransactionRecord,
};
use crate::config::AccountsConfig;
use crate::error::ExchangeError;
use crate::identity::generate_seed;
use crate::network::NetworkSession;
use crate::wallet::{Wallet, WalletFactory};

#[derive(Default)]
struct RegistryState {
    accounts: Vec<Account>,
    hot_wallet: Option<Wallet>,
    log: Vec<TransactionRecord>,
}

impl RegistryState {
    fn position(&self, id: AccountId) -> Option<usize> {
        self.accounts.iter().position(|a| a.id == id)
    }

    fn next_id(&self) -> AccountId {
        AccountId(self.accounts.len() as u32 + 1)
    }
}

pub struct AccountRegistry {
    factory: Arc<dyn WalletFactory>,
    session: Arc<dyn NetworkSession>,
    settings: AccountsConfig,
    current_tick: AtomicU64,
    state: Mutex<RegistryState>,
}

impl AccountRegistry {
    pub fn new(
        factory: Arc<dyn WalletFactory>,
        session: Arc<dyn NetworkSession>,
        settings: AccountsConfig,
    ) -> Self {
        Self {
            factory,
            session,
            settings,
            current_tick: AtomicU64::new(0),
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Create an account with the configured provisioning balance
    pub async fn create_account(&self, seed: &str) -> Result<AccountSnapshot, ExchangeError> {
        self.create_account_with_balance(seed, self.settings.initial_balance)
            .await
    }

    pub async fn create_account_with_balance(
        &self,
        seed: &str,
        balance: u64,
    ) -> Result<AccountSnapshot, ExchangeError> {
        let mut state = self.state.lock().await;
        let package = self.factory.create_identity(seed).await?;
        let id = state.next_id();

        let account = Account {
            id,
            wallet: Wallet::from_package(seed, package, balance),
            balance,
            locked: false,
        };
        info!("Created account {} ({}) with balance {}", id, account.wallet.public_id, balance);

        let snapshot = account.snapshot();
        state.accounts.push(account);
        Ok(snapshot)
    }

    /// Create an account from a freshly generated seed
    pub async fn create_generated_account(
        &self,
        balance: Option<u64>,
    ) -> Result<AccountSnapshot, ExchangeError> {
        let seed = generate_seed(&self.settings.seed_alphabet, self.settings.seed_length)?;
        let balance = balance.unwrap_or(self.settings.initial_balance);
        self.create_account_with_balance(&seed, balance).await
    }

    /// Derive and hold the hot wallet. Replaces any previous one.
    pub async fn set_hot_wallet(&self, seed: &str) -> Result<String, ExchangeError> {
        let mut state = self.state.lock().await;
        let package = self.factory.create_identity(seed).await?;
        let wallet = Wallet::from_package(seed, package, 0);
        let public_id = wallet.public_id.clone();
        info!("Hot wallet set to {}", public_id);
        state.hot_wallet = Some(wallet);
        Ok(public_id)
    }

    /// Send `amount` from an account to an external public id
    pub async fn withdraw(
        &self,
        id: AccountId,
        amount: u64,
        destination_public_id: &str,
    ) -> OperationOutcome {
        let mut state = self.state.lock().await;

        let Some(idx) = state.position(id) else {
            return rejected("withdraw", Rejection::UnknownAccount(id));
        };
        if amount == 0 {
            return rejected("withdraw", Rejection::InvalidAmount);
        }
        let account = &state.accounts[idx];
        if account.locked {
            return rejected("withdraw", Rejection::AccountLocked(id));
        }
        let balance_after = match balance::debit(account.balance, amount) {
            Ok(b) => b,
            Err(_) => return rejected("withdraw", insufficient(account, amount)),
        };

        let seed = account.wallet.seed.clone();
        let tick = self.current_tick();
        if let Err(failure) = self.submit(&seed, destination_public_id, amount, tick).await {
            error!("Withdrawal from account {} failed: {}", id, failure);
            return OperationOutcome::SubmissionFailed(failure);
        }

        state.accounts[idx].balance = balance_after;
        let record = TransactionRecord {
            kind: TransactionKind::Withdraw,
            amount,
            from: Party::Account(id),
            to: Party::External,
            destination_public_id: Some(destination_public_id.to_string()),
            tick,
            recorded_at: Utc::now(),
        };
        state.log.push(record.clone());
        info!("Withdrawal successful for account {}: {} to {}", id, amount, destination_public_id);
        OperationOutcome::Completed(record)
    }

    /// Move `amount` between two accounts. Blocked if either party is locked.
    pub async fn transfer(
        &self,
        sender: AccountId,
        receiver: AccountId,
        amount: u64,
    ) -> OperationOutcome {
        let mut state = self.state.lock().await;

        let Some(from) = state.position(sender) else {
            return rejected("transfer", Rejection::UnknownAccount(sender));
        };
        let Some(to) = state.position(receiver) else {
            return rejected("transfer", Rejection::UnknownAccount(receiver));
        };
        if from == to {
            return rejected("transfer", Rejection::SameAccount);
        }
        if amount == 0 {
            return rejected("transfer", Rejection::InvalidAmount);
        }
        for idx in [from, to] {
            if state.accounts[idx].locked {
                return rejected("transfer", Rejection::AccountLocked(state.accounts[idx].id));
            }
        }

        let (sender_after, receiver_after) = match balance::transfer_legs(
            state.accounts[from].balance,
            state.accounts[to].balance,
            amount,
        ) {
            Ok(legs) => legs,
            Err(BalanceError::InsufficientFunds) => {
                return rejected("transfer", insufficient(&state.accounts[from], amount));
            }
            Err(BalanceError::Overflow) => {
                return rejected("transfer", Rejection::BalanceOverflow(receiver));
            }
        };

        let seed = state.accounts[from].wallet.seed.clone();
        let destination = state.accounts[to].wallet.public_id.clone();
        let tick = self.current_tick();
        if let Err(failure) = self.submit(&seed, &destination, amount, tick).await {
            error!("Transfer from account {} to {} failed: {}", sender, receiver, failure);
            return OperationOutcome::SubmissionFailed(failure);
        }

        state.accounts[from].balance = sender_after;
        state.accounts[to].balance = receiver_after;
        let record = TransactionRecord {
            kind: TransactionKind::Transfer,
            amount,
            from: Party::Account(sender),
            to: Party::Account(receiver),
            destination_public_id: None,
            tick,
            recorded_at: Utc::now(),
        };
        state.log.push(record.clone());
        info!("Transfer successful from account {} to account {}: {}", sender, receiver, amount);
        OperationOutcome::Completed(record)
    }

    /// Local credit with no network interaction
    pub async fn deposit(&self, id: AccountId, amount: u64) -> OperationOutcome {
        let mut state = self.state.lock().await;

        let Some(idx) = state.position(id) else {
            return rejected("deposit", Rejection::UnknownAccount(id));
        };
        if amount == 0 {
            return rejected("deposit", Rejection::InvalidAmount);
        }
        if state.accounts[idx].locked {
            return rejected("deposit", Rejection::AccountLocked(id));
        }
        let Ok(balance_after) = balance::credit(state.accounts[idx].balance, amount) else {
            return rejected("deposit", Rejection::BalanceOverflow(id));
        };

        state.accounts[idx].balance = balance_after;
        let record = TransactionRecord {
            kind: TransactionKind::Deposit,
            amount,
            from: Party::External,
            to: Party::Account(id),
            destination_public_id: None,
            tick: self.current_tick(),
            recorded_at: Utc::now(),
        };
        state.log.push(record.clone());
        info!("Deposit of {} credited to account {}", amount, id);
        OperationOutcome::Completed(record)
    }

    /// Flip the lock flag. `None` for an unknown id.
    pub async fn toggle_lock(&self, id: AccountId) -> Option<bool> {
        let mut state = self.state.lock().await;
        let idx = state.position(id)?;
        let account = &mut state.accounts[idx];
        account.locked = !account.locked;
        info!("Account {} {}", id, if account.locked { "locked" } else { "unlocked" });
        Some(account.locked)
    }

    /// Fire one balance query per known wallet, hot wallet first.
    /// Results are not awaited or applied.
    pub async fn check_balances(&self) -> usize {
        let ids: Vec<String> = {
            let state = self.state.lock().await;
            state
                .hot_wallet
                .iter()
                .map(|w| w.public_id.clone())
                .chain(state.accounts.iter().map(|a| a.wallet.public_id.clone()))
                .collect()
        };
        for public_id in &ids {
            self.session.request_balance(public_id);
        }
        debug!("Requested {} balances from {}", ids.len(), self.session.peer());
        ids.len()
    }

    /// Record a new network tick and poll balances. Stale ticks are ignored.
    pub async fn handle_tick(&self, tick: u64) -> Option<usize> {
        let previous = self.current_tick.fetch_max(tick, Ordering::SeqCst);
        if previous > tick {
            warn!("Ignoring stale tick {} (current {})", tick, previous);
            return None;
        }
        debug!("Tick {}", tick);
        Some(self.check_balances().await)
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick.load(Ordering::SeqCst)
    }

    pub async fn accounts(&self) -> Vec<AccountSnapshot> {
        let state = self.state.lock().await;
        state.accounts.iter().map(Account::snapshot).collect()
    }

    pub async fn account(&self, id: AccountId) -> Option<AccountSnapshot> {
        let state = self.state.lock().await;
        state.position(id).map(|idx| state.accounts[idx].snapshot())
    }

    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.state.lock().await.log.clone()
    }

    pub async fn hot_wallet_public_id(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.hot_wallet.as_ref().map(|w| w.public_id.clone())
    }

    async fn submit(
        &self,
        seed: &str,
        destination: &str,
        amount: u64,
        tick: u64,
    ) -> Result<(), SubmissionFailure> {
        let payload = self
            .factory
            .create_transaction(seed, destination, amount, tick)
            .await
            .map_err(|e| SubmissionFailure::Error(e.to_string()))?;

        match self.session.send_package(&payload) {
            Ok(true) => Ok(()),
            Ok(false) => Err(SubmissionFailure::Refused),
            Err(e) => Err(SubmissionFailure::Error(e.to_string())),
        }
    }
}

fn rejected(operation: &str, rejection: Rejection) -> OperationOutcome {
    warn!("{} rejected: {}", operation, rejection);
    OperationOutcome::Rejected(rejection)
}

fn insufficient(account: &Account, requested: u64) -> Rejection {
    Rejection::InsufficientFunds {
        account: account.id,
        available: account.balance,
        requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mock_registry;

    #[tokio::test]
    async fn test_create_account_assigns_sequential_ids() {
        let (registry, _, _) = mock_registry();

        let first = registry.create_account("seed-a").await.unwrap();
        let second = registry.create_account_with_balance("seed-b", 10000).await.unwrap();

        assert_eq!(first.id, AccountId(1));
        assert_eq!(first.balance, 1000);
        assert_eq!(first.wallet_balance, 1000);
        assert_eq!(second.id, AccountId(2));
        assert_eq!(second.balance, 10000);
        assert_ne!(first.public_id, second.public_id);
        assert!(!first.locked);
    }

    #[tokio::test]
    async fn test_create_account_propagates_derivation_failure() {
        let (registry, factory, _) = mock_registry();
        factory.fail_identity.store(true, Ordering::SeqCst);

        assert!(registry.create_account("seed").await.is_err());
        assert!(registry.accounts().await.is_empty());

        factory.fail_identity.store(false, Ordering::SeqCst);
        let account = registry.create_account("seed").await.unwrap();
        assert_eq!(account.id, AccountId(1));
    }

    #[tokio::test]
    async fn test_generated_account_uses_configured_seed_shape() {
        let (registry, _, _) = mock_registry();
        let account = registry.create_generated_account(Some(42)).await.unwrap();

        assert_eq!(account.balance, 42);
        assert_eq!(account.public_id.len(), crate::identity::PUBLIC_ID_LENGTH);
    }

    #[tokio::test]
    async fn test_withdraw_success_scenario() {
        let (registry, factory, session) = mock_registry();
        let id = registry.create_account_with_balance("seed", 10000).await.unwrap().id;
        registry.handle_tick(7).await;

        let outcome = registry.withdraw(id, 500, "dest-1").await;

        let record = outcome.record().expect("withdraw should complete").clone();
        assert_eq!(record.kind, TransactionKind::Withdraw);
        assert_eq!(record.amount, 500);
        assert_eq!(record.from, Party::Account(AccountId(1)));
        assert_eq!(record.to, Party::External);
        assert_eq!(record.tick, 7);
        assert_eq!(registry.account(id).await.unwrap().balance, 9500);
        assert_eq!(registry.transactions().await, vec![record]);
        assert_eq!(
            factory.calls(),
            vec![("seed".to_string(), "dest-1".to_string(), 500, 7)]
        );
        assert_eq!(session.sent().len(), 1);
        assert_eq!(session.sent()[0].signature_hex, "transaction-payload");
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_funds_submits_nothing() {
        let (registry, factory, session) = mock_registry();
        let id = registry.create_account_with_balance("seed", 500).await.unwrap().id;

        let outcome = registry.withdraw(id, 1000, "destination-id").await;

        assert_eq!(
            outcome,
            OperationOutcome::Rejected(Rejection::InsufficientFunds {
                account: id,
                available: 500,
                requested: 1000,
            })
        );
        assert_eq!(registry.account(id).await.unwrap().balance, 500);
        assert!(factory.calls().is_empty());
        assert!(session.sent().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_entire_balance() {
        let (registry, _, _) = mock_registry();
        let id = registry.create_account("seed").await.unwrap().id;

        assert!(registry.withdraw(id, 1000, "dest").await.is_completed());
        assert_eq!(registry.account(id).await.unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_refused_submission_leaves_state_untouched() {
        let (registry, _, session) = mock_registry();
        let a = registry.create_account_with_balance("a", 1000).await.unwrap().id;
        let b = registry.create_account_with_balance("b", 500).await.unwrap().id;
        session.set_accept(false);

        assert_eq!(
            registry.withdraw(a, 100, "dest").await,
            OperationOutcome::SubmissionFailed(SubmissionFailure::Refused)
        );
        assert_eq!(
            registry.transfer(a, b, 100).await,
            OperationOutcome::SubmissionFailed(SubmissionFailure::Refused)
        );
        assert_eq!(registry.account(a).await.unwrap().balance, 1000);
        assert_eq!(registry.account(b).await.unwrap().balance, 500);
        assert!(registry.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_submission_errors_are_reported() {
        let (registry, factory, session) = mock_registry();
        let id = registry.create_account("seed").await.unwrap().id;

        session.raise.store(true, Ordering::SeqCst);
        let outcome = registry.withdraw(id, 10, "dest").await;
        assert!(matches!(
            outcome,
            OperationOutcome::SubmissionFailed(SubmissionFailure::Error(ref msg)) if msg.contains("socket closed")
        ));

        session.raise.store(false, Ordering::SeqCst);
        factory.fail_transaction.store(true, Ordering::SeqCst);
        let outcome = registry.withdraw(id, 10, "dest").await;
        assert!(matches!(
            outcome,
            OperationOutcome::SubmissionFailed(SubmissionFailure::Error(_))
        ));
        assert_eq!(registry.account(id).await.unwrap().balance, 1000);
    }

    #[tokio::test]
    async fn test_transfer_moves_funds_and_preserves_sum() {
        let (registry, factory, _) = mock_registry();
        let a = registry.create_account_with_balance("seed1", 1000).await.unwrap();
        let b = registry.create_account_with_balance("seed2", 500).await.unwrap();

        let outcome = registry.transfer(a.id, b.id, 500).await;

        assert!(outcome.is_completed());
        let a_after = registry.account(a.id).await.unwrap().balance;
        let b_after = registry.account(b.id).await.unwrap().balance;
        assert_eq!((a_after, b_after), (500, 1000));
        assert_eq!(a_after + b_after, 1500);
        assert_eq!(
            factory.calls(),
            vec![("seed1".to_string(), b.public_id.clone(), 500, 0)]
        );
        let log = registry.transactions().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, TransactionKind::Transfer);
        assert_eq!(log[0].from, Party::Account(a.id));
        assert_eq!(log[0].to, Party::Account(b.id));
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds() {
        let (registry, factory, _) = mock_registry();
        let a = registry.create_account_with_balance("seed1", 1000).await.unwrap().id;
        let b = registry.create_account_with_balance("seed2", 500).await.unwrap().id;

        let outcome = registry.transfer(b, a, 1000).await;

        assert!(matches!(
            outcome,
            OperationOutcome::Rejected(Rejection::InsufficientFunds { available: 500, requested: 1000, .. })
        ));
        assert_eq!(registry.account(a).await.unwrap().balance, 1000);
        assert_eq!(registry.account(b).await.unwrap().balance, 500);
        assert!(factory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_argument_checks() {
        let (registry, _, _) = mock_registry();
        let a = registry.create_account("a").await.unwrap().id;

        assert_eq!(
            registry.transfer(a, AccountId(9), 1).await,
            OperationOutcome::Rejected(Rejection::UnknownAccount(AccountId(9)))
        );
        assert_eq!(
            registry.transfer(a, a, 1).await,
            OperationOutcome::Rejected(Rejection::SameAccount)
        );
        let b = registry.create_account("b").await.unwrap().id;
        assert_eq!(
            registry.transfer(a, b, 0).await,
            OperationOutcome::Rejected(Rejection::InvalidAmount)
        );
    }

    #[tokio::test]
    async fn test_transfer_receiver_overflow() {
        let (registry, _, session) = mock_registry();
        let a = registry.create_account_with_balance("a", 10).await.unwrap().id;
        let b = registry.create_account_with_balance("b", u64::MAX).await.unwrap().id;

        assert_eq!(
            registry.transfer(a, b, 5).await,
            OperationOutcome::Rejected(Rejection::BalanceOverflow(b))
        );
        assert!(session.sent().is_empty());
    }

    #[tokio::test]
    async fn test_locked_account_blocks_every_mutation() {
        let (registry, _, session) = mock_registry();
        let a = registry.create_account_with_balance("a", 1000).await.unwrap().id;
        let b = registry.create_account_with_balance("b", 500).await.unwrap().id;
        assert_eq!(registry.toggle_lock(a).await, Some(true));

        let locked = OperationOutcome::Rejected(Rejection::AccountLocked(a));
        assert_eq!(registry.withdraw(a, 10, "dest").await, locked);
        assert_eq!(registry.transfer(a, b, 10).await, locked);
        assert_eq!(registry.transfer(b, a, 10).await, locked);
        assert_eq!(registry.deposit(a, 10).await, locked);

        assert_eq!(registry.account(a).await.unwrap().balance, 1000);
        assert_eq!(registry.account(b).await.unwrap().balance, 500);
        assert!(session.sent().is_empty());

        assert_eq!(registry.toggle_lock(a).await, Some(false));
        assert!(registry.transfer(b, a, 10).await.is_completed());
    }

    #[tokio::test]
    async fn test_toggle_lock_unknown_id_is_noop() {
        let (registry, _, _) = mock_registry();
        registry.create_account("a").await.unwrap();

        assert_eq!(registry.toggle_lock(AccountId(5)).await, None);
        assert!(!registry.account(AccountId(1)).await.unwrap().locked);
    }

    #[tokio::test]
    async fn test_deposit_is_local_credit() {
        let (registry, factory, session) = mock_registry();
        let id = registry.create_account("a").await.unwrap().id;

        let outcome = registry.deposit(id, 250).await;

        let record = outcome.record().unwrap();
        assert_eq!(record.kind, TransactionKind::Deposit);
        assert_eq!(record.from, Party::External);
        assert_eq!(record.to, Party::Account(id));
        assert_eq!(registry.account(id).await.unwrap().balance, 1250);
        assert!(factory.calls().is_empty());
        assert!(session.sent().is_empty());

        assert_eq!(
            registry.deposit(id, 0).await,
            OperationOutcome::Rejected(Rejection::InvalidAmount)
        );
        assert_eq!(
            registry.deposit(AccountId(3), 1).await,
            OperationOutcome::Rejected(Rejection::UnknownAccount(AccountId(3)))
        );
    }

    #[tokio::test]
    async fn test_check_balances_polls_hot_wallet_then_accounts() {
        let (registry, _, session) = mock_registry();
        let a = registry.create_account("a").await.unwrap();
        let b = registry.create_account("b").await.unwrap();
        let hot = registry.set_hot_wallet("hot").await.unwrap();

        assert_eq!(registry.check_balances().await, 3);
        assert_eq!(session.balance_requests(), vec![hot.clone(), a.public_id, b.public_id]);
        assert_eq!(registry.hot_wallet_public_id().await, Some(hot));
    }

    #[tokio::test]
    async fn test_handle_tick_updates_tick_and_ignores_stale() {
        let (registry, _, session) = mock_registry();
        registry.create_account("a").await.unwrap();

        assert_eq!(registry.handle_tick(5).await, Some(1));
        assert_eq!(registry.current_tick(), 5);
        assert_eq!(registry.handle_tick(3).await, None);
        assert_eq!(registry.current_tick(), 5);
        assert_eq!(session.balance_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_transfers_never_overdraw() {
        let (registry, _, _) = mock_registry();
        let a = registry.create_account_with_balance("a", 1000).await.unwrap().id;
        let b = registry.create_account_with_balance("b", 0).await.unwrap().id;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move { registry.transfer(a, b, 100).await }));
        }
        let mut completed = 0;
        for handle in handles {
            if handle.await.unwrap().is_completed() {
                completed += 1;
            }
        }

        assert_eq!(completed, 10);
        assert_eq!(registry.account(a).await.unwrap().balance, 0);
        assert_eq!(registry.account(b).await.unwrap().balance, 1000);
    }
}
