use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::account::{AccountRegistry, AccountSnapshot};
use crate::config::ExchangeConfig;
use crate::error::ExchangeError;
use crate::network::{NetworkEvent, NetworkSession};
use crate::wallet::WalletFactory;

/// Wires a network session's events into the account registry
pub struct ExchangeService {
    registry: Arc<AccountRegistry>,
    session: Arc<dyn NetworkSession>,
    config: ExchangeConfig,
    shutdown: watch::Sender<bool>,
}

impl ExchangeService {
    pub fn new(
        factory: Arc<dyn WalletFactory>,
        session: Arc<dyn NetworkSession>,
        config: ExchangeConfig,
    ) -> Self {
        let registry = Arc::new(AccountRegistry::new(
            factory,
            session.clone(),
            config.accounts.clone(),
        ));
        let (shutdown, _) = watch::channel(false);
        Self {
            registry,
            session,
            config,
            shutdown,
        }
    }

    pub fn registry(&self) -> Arc<AccountRegistry> {
        self.registry.clone()
    }

    /// Start the session, then spawn the event loop and the periodic balance poll
    pub fn connect(&self) -> Result<Vec<JoinHandle<()>>, ExchangeError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.session.start(tx)?;

        let events = tokio::spawn(run_event_loop(
            self.registry.clone(),
            rx,
            self.shutdown.subscribe(),
        ));
        let poll = tokio::spawn(run_balance_poll(
            self.registry.clone(),
            Duration::from_millis(self.config.network.balance_poll_interval_ms),
            self.shutdown.subscribe(),
        ));
        Ok(vec![events, poll])
    }

    /// Set the hot wallet (if configured) and create one account per demo balance
    pub async fn provision(&self) -> Result<Vec<AccountSnapshot>, ExchangeError> {
        if let Some(seed) = &self.config.accounts.hot_wallet_seed {
            self.registry.set_hot_wallet(seed).await?;
        }
        let mut created = Vec::with_capacity(self.config.accounts.demo_balances.len());
        for balance in &self.config.accounts.demo_balances {
            created.push(self.registry.create_generated_account(Some(*balance)).await?);
        }
        Ok(created)
    }

    /// Stop the spawned loops
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Dispatch one session event
pub async fn handle_event(registry: &AccountRegistry, event: NetworkEvent) {
    match event {
        NetworkEvent::PeerConnected(peer) => info!("Peer {} connected", peer),
        NetworkEvent::PeerDisconnected(peer) => warn!("Peer {} disconnected", peer),
        NetworkEvent::Tick(tick) => {
            registry.handle_tick(tick).await;
        }
        NetworkEvent::BalanceReported { public_id, balance } => {
            debug!("Network balance for {}: {}", public_id, balance);
        }
    }
}

pub async fn run_event_loop(
    registry: Arc<AccountRegistry>,
    mut events: UnboundedReceiver<NetworkEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => handle_event(&registry, event).await,
                None => {
                    debug!("Session event channel closed");
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }
}

pub async fn run_balance_poll(
    registry: Arc<AccountRegistry>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut timer = time::interval(period);
    timer.tick().await;
    loop {
        tokio::select! {
            _ = timer.tick() => {
                registry.check_balances().await;
            }
            _ = shutdown.changed() => break,
        }
    }
}
