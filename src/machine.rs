//! Connection state machine
//!
//! A detection cycle runs once per generation, only from [`ConnectionState::Detecting`]:
//!
//! ```text
//! Detecting ─┬─ no provider / access denied / no chain id ─▶ NoWallet
//!            ├─ diagnostic route or unknown chain ────────▶ NetworkUnsupported
//!            ├─ blacked-out pairing ──────────────────────▶ MaintenanceNotice
//!            ├─ bridge construction failed ───────────────▶ NetworkUnsupported
//!            └─ bridge built ─────────────────────────────▶ DepositReady | WithdrawalReady
//! ```
//!
//! A wallet change notification bumps the generation, drops the bridge handle
//! and returns the machine to `Detecting`. Results of a cycle that finish
//! after their generation was superseded are discarded.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use alloy::primitives::ChainId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::{
    bridge::{BridgeFactory, BridgeHandle},
    error::ConnectError,
    provider::{ChangeSubscription, ProviderGateway},
    resolver::{NetworkResolver, Orientation},
};

/// URL fragment that forces the informational view.
pub const DIAGNOSTIC_ROUTE: &str = "#info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Detecting,
    NoWallet,
    NetworkUnsupported,
    DepositReady,
    WithdrawalReady,
    MaintenanceNotice,
}

impl ConnectionState {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::DepositReady | Self::WithdrawalReady)
    }

    pub fn orientation(self) -> Option<Orientation> {
        match self {
            Self::DepositReady => Some(Orientation::Deposit),
            Self::WithdrawalReady => Some(Orientation::Withdrawal),
            _ => None,
        }
    }

    fn ready(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Deposit => Self::DepositReady,
            Orientation::Withdrawal => Self::WithdrawalReady,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Detecting => "detecting",
            Self::NoWallet => "no-wallet",
            Self::NetworkUnsupported => "network-unsupported",
            Self::DepositReady => "deposit-ready",
            Self::WithdrawalReady => "withdrawal-ready",
            Self::MaintenanceNotice => "maintenance-notice",
        };
        f.write_str(name)
    }
}

/// Published view of the machine. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub state: ConnectionState,
    pub active_chain_id: Option<String>,
    pub bridge: Option<Arc<BridgeHandle>>,
    /// Why the cycle settled where it did, for non-ready states
    pub failure: Option<ConnectError>,
    pub generation: u64,
}

impl Snapshot {
    fn detecting(generation: u64) -> Self {
        Self {
            state: ConnectionState::Detecting,
            active_chain_id: None,
            bridge: None,
            failure: None,
            generation,
        }
    }

    pub fn bridge_ready(&self) -> bool {
        self.state.is_ready() && self.bridge.is_some()
    }
}

/// A pairing that is temporarily disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub chain_id: ChainId,
    pub partner_chain_id: ChainId,
    #[serde(default)]
    pub message: Option<String>,
}

impl MaintenanceWindow {
    /// Order-insensitive.
    pub fn matches(&self, chain_id: ChainId, partner_chain_id: ChainId) -> bool {
        (self.chain_id == chain_id && self.partner_chain_id == partner_chain_id)
            || (self.chain_id == partner_chain_id && self.partner_chain_id == chain_id)
    }

    pub fn notice(&self) -> String {
        self.message.clone().unwrap_or_else(|| {
            format!(
                "Bridging between {} and {} is offline for maintenance",
                self.chain_id, self.partner_chain_id
            )
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MachineOptions {
    pub maintenance: Vec<MaintenanceWindow>,
    /// Current UI route; [`DIAGNOSTIC_ROUTE`] triggers the diagnostic override
    pub route: Option<String>,
}

impl MachineOptions {
    fn diagnostic_override(&self) -> bool {
        self.route.as_deref() == Some(DIAGNOSTIC_ROUTE)
    }
}

pub struct ConnectionStateMachine {
    gateway: ProviderGateway,
    resolver: NetworkResolver,
    factory: BridgeFactory,
    options: MachineOptions,
    state: watch::Sender<Snapshot>,
    /// Generation + 1 of the last cycle that was started, 0 before any
    started: AtomicU64,
    listeners: Mutex<Option<ChangeSubscription>>,
    reset_tx: mpsc::UnboundedSender<u64>,
    reset_rx: Mutex<Option<mpsc::UnboundedReceiver<u64>>>,
}

impl ConnectionStateMachine {
    pub fn new(
        gateway: ProviderGateway,
        resolver: NetworkResolver,
        factory: BridgeFactory,
        options: MachineOptions,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(Snapshot::detecting(0));
        let (reset_tx, reset_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            gateway,
            resolver,
            factory,
            options,
            state,
            started: AtomicU64::new(0),
            listeners: Mutex::new(None),
            reset_tx,
            reset_rx: Mutex::new(Some(reset_rx)),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().state
    }

    pub fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }

    /// Run one detection cycle for the current generation.
    ///
    /// Does nothing unless the machine is in `Detecting` and no cycle has
    /// been started for this generation yet. Returns the state afterwards.
    pub async fn detect(&self) -> ConnectionState {
        let generation = {
            let snapshot = self.state.borrow();
            if snapshot.state != ConnectionState::Detecting {
                return snapshot.state;
            }
            snapshot.generation
        };
        if self.started.fetch_max(generation + 1, Ordering::AcqRel) > generation {
            tracing::debug!(generation, "detection already in flight");
            return self.state();
        }

        tracing::debug!(generation, "starting detection");
        self.run_cycle(generation).await;
        self.state()
    }

    async fn run_cycle(&self, generation: u64) {
        if !self.gateway.is_available() {
            tracing::warn!("no wallet provider detected");
            return self.settle(
                generation,
                ConnectionState::NoWallet,
                None,
                Some(ConnectError::NoProvider),
            );
        }

        match self.gateway.request_access().await {
            Ok(account) => tracing::debug!(address = %account.address, "wallet access granted"),
            Err(err) => {
                tracing::warn!(%err, "failed to enable wallet");
                return self.settle(
                    generation,
                    ConnectionState::NoWallet,
                    None,
                    Some(ConnectError::AccessDenied),
                );
            }
        }

        let Some(chain_id) = self.gateway.current_chain_id() else {
            tracing::warn!("wallet reported no network");
            return self.settle(
                generation,
                ConnectionState::NoWallet,
                None,
                Some(ConnectError::NoProvider),
            );
        };
        if !self.set_active_chain(generation, &chain_id) {
            return;
        }
        self.install_listeners(generation);

        if self.options.diagnostic_override() {
            tracing::info!(%chain_id, "diagnostic route requested");
            return self.settle(
                generation,
                ConnectionState::NetworkUnsupported,
                None,
                Some(ConnectError::UnsupportedNetwork),
            );
        }

        let classification = self.resolver.classify(&chain_id);
        let (Some(orientation), Some((network, partner))) =
            (classification.orientation(), classification.pairing())
        else {
            tracing::warn!(%chain_id, "unsupported network");
            return self.settle(
                generation,
                ConnectionState::NetworkUnsupported,
                None,
                Some(ConnectError::UnsupportedNetwork),
            );
        };

        if let Some(window) = self
            .options
            .maintenance
            .iter()
            .find(|window| window.matches(network.chain_id, partner.chain_id))
        {
            tracing::info!(
                chain_id = network.chain_id,
                partner_chain_id = partner.chain_id,
                "pairing under maintenance"
            );
            return self.settle(
                generation,
                ConnectionState::MaintenanceNotice,
                None,
                Some(ConnectError::MaintenanceWindow(window.notice())),
            );
        }

        tracing::info!("{orientation} mode detected");
        match self
            .factory
            .build(orientation, network, partner, &self.gateway)
            .await
        {
            Ok(handle) => self.settle(
                generation,
                ConnectionState::ready(orientation),
                Some(Arc::new(handle)),
                None,
            ),
            Err(err) => {
                tracing::warn!(%err, %orientation, "bridge initialization failed");
                self.settle(
                    generation,
                    ConnectionState::NetworkUnsupported,
                    None,
                    Some(ConnectError::BridgeInitFailure),
                )
            }
        }
    }

    fn set_active_chain(&self, generation: u64, chain_id: &str) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            snapshot.active_chain_id = Some(chain_id.to_string());
            true
        })
    }

    /// Publish the outcome of a cycle unless its generation was superseded.
    fn settle(
        &self,
        generation: u64,
        state: ConnectionState,
        bridge: Option<Arc<BridgeHandle>>,
        failure: Option<ConnectError>,
    ) {
        let published = self.state.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            snapshot.state = state;
            snapshot.bridge = bridge;
            snapshot.failure = failure;
            true
        });

        if published {
            tracing::info!(generation, %state, "connection state changed");
        } else {
            tracing::warn!(generation, %state, "discarding result of superseded detection cycle");
        }
    }

    /// Replace this machine's listeners with ones bound to `generation`.
    fn install_listeners(&self, generation: u64) {
        let (on_network, on_account) = (self.reset_tx.clone(), self.reset_tx.clone());
        let subscription = self.gateway.subscribe_to_changes(
            move || {
                let _ = on_network.send(generation);
            },
            move || {
                let _ = on_account.send(generation);
            },
        );
        *self.listeners.lock() = subscription;
    }

    /// Discard all derived state and return to `Detecting` under a new generation.
    pub fn reset(&self) {
        drop(self.listeners.lock().take());
        self.state.send_modify(|snapshot| {
            *snapshot = Snapshot::detecting(snapshot.generation + 1);
        });
        tracing::info!(generation = self.state.borrow().generation, "connection reset");
    }

    /// Drive detection cycles, resetting whenever a wallet listener fires.
    ///
    /// Never returns on the first call; later calls return immediately.
    pub async fn run(self: Arc<Self>) {
        let Some(mut resets) = self.reset_rx.lock().take() else {
            tracing::warn!("state machine already running");
            return;
        };

        loop {
            let machine = self.clone();
            tokio::spawn(async move {
                machine.detect().await;
            });

            loop {
                let Some(generation) = resets.recv().await else {
                    return;
                };
                if generation == self.state.borrow().generation {
                    break;
                }
                tracing::debug!(generation, "ignoring reset for stale generation");
            }
            self.reset();
        }
    }
}
