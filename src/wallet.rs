//! Wallet backed by a JSON-RPC endpoint with unlocked accounts.
//!
//! Stands in for a browser-injected provider: `networkVersion` and
//! `selectedAddress` are cached from the last [`RpcWallet::sync`], and
//! [`RpcWallet::watch`] polls the endpoint to raise change events.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use alloy::primitives::{Address, ChainId, U64};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::{sync::broadcast, task::JoinHandle};

use crate::{
    error::RpcError,
    provider::{InjectedProvider, ProviderEvent},
    rpc::{self, RpcClient},
};

#[derive(Debug, Default)]
struct WalletCache {
    network_version: Option<String>,
    accounts: Option<Vec<Address>>,
}

pub struct RpcWallet {
    rpc: Arc<dyn RpcClient>,
    cache: RwLock<WalletCache>,
    events: broadcast::Sender<ProviderEvent>,
}

impl RpcWallet {
    pub fn new(rpc: Arc<dyn RpcClient>) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            rpc,
            cache: RwLock::new(WalletCache::default()),
            events,
        })
    }

    /// Refresh the cached network and accounts, firing events for changes.
    ///
    /// The first sync only initializes the cache.
    pub async fn sync(&self) -> Result<Vec<ProviderEvent>, RpcError> {
        let chain_id: U64 = rpc::call(self.rpc.as_ref(), "eth_chainId", json!([])).await?;
        let network_version = chain_id.to::<ChainId>().to_string();
        let accounts: Vec<Address> = rpc::call(self.rpc.as_ref(), "eth_accounts", json!([])).await?;

        let mut changes = Vec::new();
        {
            let mut cache = self.cache.write();
            if let Some(previous) = &cache.network_version {
                if *previous != network_version {
                    changes.push(ProviderEvent::NetworkChanged(network_version.clone()));
                }
            }
            if let Some(previous) = &cache.accounts {
                if *previous != accounts {
                    changes.push(ProviderEvent::AccountsChanged(accounts.clone()));
                }
            }
            cache.network_version = Some(network_version);
            cache.accounts = Some(accounts);
        }

        for change in &changes {
            // no listeners is fine
            let _ = self.events.send(change.clone());
        }
        Ok(changes)
    }

    /// Poll for changes every `interval` until the wallet is dropped.
    pub fn watch(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let wallet: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(wallet) = wallet.upgrade() else {
                    break;
                };
                if let Err(err) = wallet.sync().await {
                    tracing::warn!(%err, "wallet sync failed");
                }
            }
        })
    }
}

#[async_trait]
impl InjectedProvider for RpcWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            // unlocked accounts are already authorized
            "eth_requestAccounts" => self.rpc.request("eth_accounts", params).await,
            _ => self.rpc.request(method, params).await,
        }
    }

    fn network_version(&self) -> Option<String> {
        self.cache.read().network_version.clone()
    }

    fn selected_address(&self) -> Option<Address> {
        self.cache.read().accounts.as_ref()?.first().copied()
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
