//! Scripted wallet, chains and connector for driving the state machine.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use alloy::primitives::{Address, Bytes, ChainId};
use async_trait::async_trait;
use bridge_connector::{
    error::{BridgeInitError, RpcError},
    machine::MachineOptions,
    rpc::{RpcClient, RpcConnector},
    BridgeFactory, ConnectionStateMachine, InjectedProvider, NetworkRegistry, NetworkResolver,
    ProviderEvent, ProviderGateway, Snapshot,
};
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch, Notify};

pub fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

/// One chain's JSON-RPC endpoint.
pub struct MockChain {
    pub chain_id: ChainId,
    pub accounts: Vec<Address>,
    code: Mutex<HashMap<Address, Bytes>>,
    gated: AtomicBool,
    release: Notify,
    calls: Mutex<Vec<String>>,
}

impl MockChain {
    pub fn new(chain_id: ChainId, accounts: Vec<Address>) -> Arc<Self> {
        Arc::new(Self {
            chain_id,
            accounts,
            code: Mutex::new(HashMap::new()),
            gated: AtomicBool::new(false),
            release: Notify::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn deploy(&self, address: Address) {
        self.code
            .lock()
            .unwrap()
            .insert(address, Bytes::from_static(&[0x60, 0x80]));
    }

    /// Hold every `eth_chainId` until [`MockChain::open`].
    pub fn close(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn open(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
        self.release.notify_one();
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| *call == method)
            .count()
    }
}

#[async_trait]
impl RpcClient for MockChain {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push(method.to_string());
        match method {
            "eth_chainId" => {
                if self.gated.load(Ordering::SeqCst) {
                    self.release.notified().await;
                }
                Ok(json!(format!("{:#x}", self.chain_id)))
            }
            "eth_accounts" => Ok(json!(self.accounts)),
            "eth_getCode" => {
                let address: Address = serde_json::from_value(params[0].clone())
                    .map_err(|err| RpcError::Transport(err.to_string()))?;
                let code = self
                    .code
                    .lock()
                    .unwrap()
                    .get(&address)
                    .cloned()
                    .unwrap_or_default();
                Ok(json!(code))
            }
            _ => Err(RpcError::Response {
                code: -32601,
                message: format!("the method {method} does not exist"),
            }),
        }
    }
}

/// Injected wallet sitting on top of one [`MockChain`].
pub struct MockWallet {
    pub chain: Arc<MockChain>,
    pub network_version: Mutex<Option<String>>,
    pub selected: Mutex<Option<Address>>,
    pub reject_access: AtomicBool,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockWallet {
    pub fn new(chain: Arc<MockChain>, selected: Option<Address>) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            network_version: Mutex::new(Some(chain.chain_id.to_string())),
            chain,
            selected: Mutex::new(selected),
            reject_access: AtomicBool::new(false),
            events,
        })
    }

    pub fn fire(&self, event: ProviderEvent) {
        self.events.send(event).expect("no listeners registered");
    }

    pub fn listeners(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl InjectedProvider for MockWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        if method == "eth_requestAccounts" {
            self.chain.calls.lock().unwrap().push(method.to_string());
            if self.reject_access.load(Ordering::SeqCst) {
                return Err(RpcError::Response {
                    code: 4001,
                    message: "User rejected the request.".into(),
                });
            }
            return Ok(json!(self.chain.accounts));
        }
        self.chain.request(method, params).await
    }

    fn network_version(&self) -> Option<String> {
        self.network_version.lock().unwrap().clone()
    }

    fn selected_address(&self) -> Option<Address> {
        *self.selected.lock().unwrap()
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub struct MockConnector {
    chains: HashMap<String, Arc<MockChain>>,
    connects: AtomicUsize,
}

impl MockConnector {
    pub fn with(mut self, rpc_url: &str, chain: Arc<MockChain>) -> Self {
        self.chains.insert(rpc_url.to_string(), chain);
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl RpcConnector for MockConnector {
    fn connect(&self, rpc_url: &str) -> Result<Arc<dyn RpcClient>, BridgeInitError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let chain = self
            .chains
            .get(rpc_url)
            .cloned()
            .ok_or_else(|| BridgeInitError::InvalidRpcUrl {
                url: rpc_url.to_string(),
                reason: "unreachable".into(),
            })?;
        Ok(chain)
    }
}

/// Ethereum mainnet and Arbitrum One with both gateway routers deployed.
pub struct Mainnet {
    pub ethereum: Arc<MockChain>,
    pub arbitrum: Arc<MockChain>,
    pub connector: Arc<MockConnector>,
}

impl Mainnet {
    pub fn new() -> Self {
        let registry = NetworkRegistry::builtin();
        let ethereum_net = registry.get(1).unwrap();
        let arbitrum_net = registry.get(42161).unwrap();

        let ethereum = MockChain::new(1, vec![alice()]);
        ethereum.deploy(ethereum_net.token_bridge.l1_address);
        let arbitrum = MockChain::new(42161, vec![alice()]);
        arbitrum.deploy(arbitrum_net.token_bridge.l2_address);

        let connector = MockConnector::default()
            .with(&ethereum_net.rpc_url, ethereum.clone())
            .with(&arbitrum_net.rpc_url, arbitrum.clone());

        Self {
            ethereum,
            arbitrum,
            connector: Arc::new(connector),
        }
    }

    /// Wallet connected to `chain`, with `bob` selected.
    pub fn wallet_on(&self, chain: &Arc<MockChain>) -> Arc<MockWallet> {
        MockWallet::new(chain.clone(), Some(bob()))
    }

    pub fn machine(
        &self,
        wallet: Option<Arc<MockWallet>>,
        options: MachineOptions,
    ) -> Arc<ConnectionStateMachine> {
        let gateway = match wallet {
            Some(wallet) => ProviderGateway::injected(wallet),
            None => ProviderGateway::absent(),
        };
        ConnectionStateMachine::new(
            gateway,
            NetworkResolver::new(NetworkRegistry::builtin()),
            BridgeFactory::new(self.connector.clone()),
            options,
        )
    }
}

/// Wait until a published snapshot satisfies `predicate`.
pub async fn wait_for(
    updates: &mut watch::Receiver<Snapshot>,
    predicate: impl FnMut(&Snapshot) -> bool,
) -> Snapshot {
    tokio::time::timeout(Duration::from_secs(5), updates.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("state machine dropped")
        .clone()
}
