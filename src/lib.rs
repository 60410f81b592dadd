//! Wallet connection and bridge initialization for a parent/child chain pair.
//!
//! The wallet's active network decides whether the bridge runs in deposit
//! (parent to child) or withdrawal (child to parent) mode:
//!
//! - [`provider`] wraps the injected wallet
//! - [`network`] is the static table of known networks
//! - [`resolver`] classifies the wallet's network
//! - [`bridge`] builds the oriented bridge handle
//! - [`machine`] ties them together and publishes the connection state

pub mod bridge;
pub mod config;
pub mod error;
pub mod machine;
pub mod network;
pub mod provider;
pub mod resolver;
pub mod rpc;
pub mod wallet;

pub use bridge::{BridgeFactory, BridgeHandle, ChainSigner};
pub use config::ConnectorConfig;
pub use error::ConnectError;
pub use machine::{ConnectionState, ConnectionStateMachine, MachineOptions, Snapshot};
pub use network::{Network, NetworkRegistry, TokenBridgeAddresses};
pub use provider::{InjectedProvider, ProviderEvent, ProviderGateway};
pub use resolver::{Classification, NetworkResolver, Orientation};
pub use wallet::RpcWallet;
