//! Wallet provider boundary
//!
//! [`InjectedProvider`] is the surface a wallet exposes to the connector:
//! raw JSON-RPC requests, the synchronously readable `networkVersion` and
//! `selectedAddress` fields, and `networkChanged` / `accountsChanged` events.
//! [`ProviderGateway`] wraps an optional provider and implements the access,
//! inspection, subscription and network-switch operations on top of it.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};

use crate::{
    error::{AccessError, RpcError},
    network::Network,
    rpc::{self, RpcClient},
};

/// Notifications a wallet fires when the user changes something on its side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    NetworkChanged(String),
    AccountsChanged(Vec<Address>),
}

#[async_trait]
pub trait InjectedProvider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Decimal chain id, absent until the provider has initialized.
    fn network_version(&self) -> Option<String>;

    fn selected_address(&self) -> Option<Address>;

    fn events(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Lets the injected provider back a signer.
pub struct InjectedRpc(Arc<dyn InjectedProvider>);

#[async_trait]
impl RpcClient for InjectedRpc {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.0.request(method, params).await
    }
}

/// Accounts granted by a successful access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAccount {
    pub address: Address,
    pub accounts: Vec<Address>,
}

/// Single-fire latch; only the first `trip` wins.
#[derive(Debug, Clone, Default)]
pub struct ReloadLatch(Arc<AtomicBool>);

impl ReloadLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for the caller that flipped the latch.
    pub fn trip(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Listener registration for one detection cycle; dropping it unsubscribes.
#[derive(Debug)]
pub struct ChangeSubscription {
    task: JoinHandle<()>,
    latch: ReloadLatch,
}

impl ChangeSubscription {
    pub fn has_fired(&self) -> bool {
        self.latch.is_tripped()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Clone, Default)]
pub struct ProviderGateway {
    provider: Option<Arc<dyn InjectedProvider>>,
}

impl ProviderGateway {
    pub fn new(provider: Option<Arc<dyn InjectedProvider>>) -> Self {
        Self { provider }
    }

    pub fn injected(provider: Arc<dyn InjectedProvider>) -> Self {
        Self::new(Some(provider))
    }

    pub fn absent() -> Self {
        Self::new(None)
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Ask the wallet for account access.
    pub async fn request_access(&self) -> Result<ActiveAccount, AccessError> {
        let provider = self.provider.as_ref().ok_or(AccessError::NoProvider)?;
        let accounts: Vec<Address> =
            rpc::call(&InjectedRpc(provider.clone()), "eth_requestAccounts", json!([])).await?;

        let address = *accounts.first().ok_or(AccessError::Rejected)?;
        Ok(ActiveAccount { address, accounts })
    }

    pub fn current_chain_id(&self) -> Option<String> {
        self.provider.as_ref()?.network_version()
    }

    pub fn selected_address(&self) -> Option<Address> {
        self.provider.as_ref()?.selected_address()
    }

    /// JSON-RPC view of the injected provider.
    pub fn rpc(&self) -> Option<Arc<dyn RpcClient>> {
        let provider = self.provider.clone()?;
        Some(Arc::new(InjectedRpc(provider)))
    }

    /// Register change listeners. At most one of them runs per subscription,
    /// whichever event arrives first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_to_changes<N, A>(
        &self,
        on_network_change: N,
        on_account_change: A,
    ) -> Option<ChangeSubscription>
    where
        N: Fn() + Send + Sync + 'static,
        A: Fn() + Send + Sync + 'static,
    {
        let provider = self.provider.as_ref()?;
        let mut events = provider.events();
        let latch = ReloadLatch::new();
        tracing::debug!("setting change listeners");

        let fired = latch.clone();
        let task = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "change listener lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                if !fired.trip() {
                    tracing::debug!(?event, "ignoring change, reset already triggered");
                    continue;
                }
                match event {
                    ProviderEvent::NetworkChanged(chain_id) => {
                        tracing::info!(%chain_id, "wallet network changed");
                        on_network_change();
                    }
                    ProviderEvent::AccountsChanged(accounts) => {
                        tracing::info!(?accounts, "wallet accounts changed");
                        on_account_change();
                    }
                }
            }
        });

        Some(ChangeSubscription { task, latch })
    }

    /// Ask the wallet to add (and switch to) `network`.
    ///
    /// Returns `None` when there is no provider or the wallet refuses.
    pub async fn request_network_switch(&self, network: &Network) -> Option<Value> {
        let Some(provider) = self.provider.as_ref() else {
            tracing::warn!("no wallet provider injected");
            return None;
        };

        match provider
            .request("wallet_addEthereumChain", add_chain_params(network))
            .await
        {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(chain_id = network.chain_id, %err, "network switch request failed");
                None
            }
        }
    }
}

fn add_chain_params(network: &Network) -> Value {
    json!([{
        "chainId": format!("{:#x}", network.chain_id),
        "chainName": network.name,
        "nativeCurrency": {
            "name": "Ether",
            "symbol": "ETH",
            "decimals": 18,
        },
        "rpcUrls": [network.rpc_url],
    }])
}
