//! Error types
//!
//! Every failure inside a detection cycle is caught where it happens and
//! mapped to a terminal state; [`ConnectError`] is what presentation code sees.

use alloy::primitives::ChainId;
use thiserror::Error;

/// User-facing failure taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Ethereum provider not detected; make sure you have a wallet connected")]
    NoProvider,

    /// Rendered exactly like [`ConnectError::NoProvider`].
    #[error("Ethereum provider not detected; make sure you have a wallet connected")]
    AccessDenied,

    #[error("Unsupported network; switch your wallet to a supported network")]
    UnsupportedNetwork,

    #[error("{0}")]
    MaintenanceWindow(String),

    /// Rendered exactly like [`ConnectError::UnsupportedNetwork`].
    #[error("Unsupported network; switch your wallet to a supported network")]
    BridgeInitFailure,
}

/// Failure of the wallet's account access request.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("no wallet provider injected")]
    NoProvider,

    #[error("user rejected the account access request")]
    Rejected,

    #[error("account access request failed: {0}")]
    Provider(#[from] RpcError),
}

/// Failure while building a [`crate::bridge::BridgeHandle`].
#[derive(Error, Debug)]
pub enum BridgeInitError {
    #[error("no wallet provider injected")]
    NoProvider,

    #[error("wallet exposes no account at index 0")]
    NoInjectedAccount,

    #[error("wallet reports no selected account")]
    NoSelectedAccount,

    #[error("invalid rpc url {url}: {reason}")]
    InvalidRpcUrl { url: String, reason: String },

    #[error("signer for chain {expected} is connected to chain {actual}")]
    ChainMismatch { expected: ChainId, actual: ChainId },

    #[error("no token bridge contract deployed at {address} on chain {chain_id}")]
    MissingContract { chain_id: ChainId, address: String },

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// JSON-RPC transport or protocol failure.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Response { code: i64, message: String },

    #[error("malformed rpc response for {method}: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Static network table inconsistencies.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate network {0}")]
    Duplicate(ChainId),

    #[error("network {chain_id} names unknown partner {partner_chain_id}")]
    UnknownPartner {
        chain_id: ChainId,
        partner_chain_id: ChainId,
    },
}

/// Configuration file problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
