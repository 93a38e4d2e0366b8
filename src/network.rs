use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ExchangeError;
use crate::wallet::TransactionPayload;

/// Callbacks raised by a session, delivered in order on one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NetworkEvent {
    PeerConnected(String),
    PeerDisconnected(String),
    Tick(u64),
    BalanceReported { public_id: String, balance: u64 },
}

/// Connection to a single network peer
pub trait NetworkSession: Send + Sync {
    /// Begin peer connection and tick delivery
    fn start(&self, events: UnboundedSender<NetworkEvent>) -> Result<(), ExchangeError>;

    /// Fire-and-forget balance query; any answer arrives as `BalanceReported`
    fn request_balance(&self, public_id: &str);

    /// Best-effort submission indicator, not ledger finality
    fn send_package(&self, payload: &TransactionPayload) -> Result<bool, ExchangeError>;

    fn peer(&self) -> &str;
}

#[derive(Default)]
struct SessionState {
    events: Option<UnboundedSender<NetworkEvent>>,
    ticker: Option<JoinHandle<()>>,
    submitted: Vec<TransactionPayload>,
    balance_requests: Vec<String>,
    received: HashMap<String, u64>,
}

/// In-process session: emits ticks on a timer and accepts signed packages
pub struct SimulatedSession {
    peer_host: String,
    tick_interval: Duration,
    initial_tick: u64,
    refuse_submissions: AtomicBool,
    state: Mutex<SessionState>,
}

impl SimulatedSession {
    pub fn new(peer_host: impl Into<String>, tick_interval: Duration, initial_tick: u64) -> Self {
        SimulatedSession {
            peer_host: peer_host.into(),
            tick_interval,
            initial_tick,
            refuse_submissions: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// When set, every submission reports `false`
    pub fn set_refuse_submissions(&self, refuse: bool) {
        self.refuse_submissions.store(refuse, Ordering::SeqCst);
    }

    pub fn is_started(&self) -> bool {
        self.state().events.is_some()
    }

    pub fn submitted_packages(&self) -> Vec<TransactionPayload> {
        self.state().submitted.clone()
    }

    pub fn balance_requests(&self) -> Vec<String> {
        self.state().balance_requests.clone()
    }

    /// Tear down tick delivery and report the disconnect
    pub fn stop(&self) {
        let mut state = self.state();
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        if let Some(events) = state.events.take() {
            let _ = events.send(NetworkEvent::PeerDisconnected(self.peer_host.clone()));
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NetworkSession for SimulatedSession {
    fn start(&self, events: UnboundedSender<NetworkEvent>) -> Result<(), ExchangeError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ExchangeError::Network(format!("no async runtime: {}", e)))?;

        let mut state = self.state();
        if state.events.is_some() {
            return Err(ExchangeError::Network("session already started".to_string()));
        }

        info!("Connecting to peer {}", self.peer_host);
        events
            .send(NetworkEvent::PeerConnected(self.peer_host.clone()))
            .map_err(|_| ExchangeError::Network("event receiver dropped".to_string()))?;

        let ticks = events.clone();
        let interval = self.tick_interval;
        let mut tick = self.initial_tick;
        state.ticker = Some(runtime.spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await;
            loop {
                timer.tick().await;
                tick += 1;
                if ticks.send(NetworkEvent::Tick(tick)).is_err() {
                    debug!("Tick receiver dropped, stopping ticker");
                    break;
                }
            }
        }));
        state.events = Some(events);
        Ok(())
    }

    fn request_balance(&self, public_id: &str) {
        let mut state = self.state();
        state.balance_requests.push(public_id.to_string());
        let balance = state.received.get(public_id).copied().unwrap_or(0);
        if let Some(events) = &state.events {
            let _ = events.send(NetworkEvent::BalanceReported {
                public_id: public_id.to_string(),
                balance,
            });
        }
    }

    fn send_package(&self, payload: &TransactionPayload) -> Result<bool, ExchangeError> {
        let mut state = self.state();
        if state.events.is_none() {
            return Err(ExchangeError::Network("session not started".to_string()));
        }
        if self.refuse_submissions.load(Ordering::SeqCst) {
            warn!("Peer refused package from {}", payload.source_public_id);
            return Ok(false);
        }
        if !payload.verify() {
            warn!("Rejecting package with bad signature from {}", payload.source_public_id);
            return Ok(false);
        }

        let received = state
            .received
            .entry(payload.destination_public_id.clone())
            .or_insert(0);
        *received = received.saturating_add(payload.amount);
        state.submitted.push(payload.clone());
        debug!(
            "Package accepted: {} -> {} amount {} at tick {}",
            payload.source_public_id, payload.destination_public_id, payload.amount, payload.tick
        );
        Ok(true)
    }

    fn peer(&self) -> &str {
        &self.peer_host
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        if let Some(ticker) = self.state().ticker.take() {
            ticker.abort();
        }
    }
}
