//! Minimal JSON-RPC seam shared by the wallet and the standalone signers.

use std::{marker::PhantomData, sync::Arc};

use alloy::{
    network::Ethereum,
    primitives::{Address, Bytes, ChainId, U64},
    providers::{Provider, ProviderBuilder},
    transports::{http::reqwest::Url, Transport, TransportError},
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{BridgeInitError, RpcError};

#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        let id: U64 = decode("eth_chainId", self.request("eth_chainId", json!([])).await?)?;
        Ok(id.to::<ChainId>())
    }

    /// Deployed bytecode at `address` on the latest block.
    async fn code_at(&self, address: Address) -> Result<Bytes, RpcError> {
        let code = self
            .request("eth_getCode", json!([address, "latest"]))
            .await?;
        decode("eth_getCode", code)
    }
}

/// Issue a request and decode its result.
pub async fn call<R: DeserializeOwned>(
    client: &dyn RpcClient,
    method: &str,
    params: Value,
) -> Result<R, RpcError> {
    decode(method, client.request(method, params).await?)
}

fn decode<R: DeserializeOwned>(method: &str, value: Value) -> Result<R, RpcError> {
    serde_json::from_value(value).map_err(|source| RpcError::Decode {
        method: method.to_string(),
        source,
    })
}

/// Opens standalone clients for the non-injected side of a pairing.
pub trait RpcConnector: Send + Sync {
    fn connect(&self, rpc_url: &str) -> Result<Arc<dyn RpcClient>, BridgeInitError>;
}

/// [`RpcClient`] over any alloy provider.
pub struct AlloyRpc<P, T> {
    provider: P,
    _phantom: PhantomData<T>,
}

impl<P, T> AlloyRpc<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<P, T> RpcClient for AlloyRpc<P, T>
where
    P: Provider<T, Ethereum> + Send + Sync + 'static,
    T: Transport + Clone + Send + Sync + 'static,
{
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        tracing::debug!(method, %params, "rpc request");
        self.provider
            .raw_request(method.to_string().into(), params)
            .await
            .map_err(transport_error)
    }

    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        self.provider.get_chain_id().await.map_err(transport_error)
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, RpcError> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(transport_error)
    }
}

fn transport_error(err: TransportError) -> RpcError {
    match err {
        alloy::transports::RpcError::ErrorResp(payload) => RpcError::Response {
            code: payload.code,
            message: payload.message.to_string(),
        },
        other => RpcError::Transport(other.to_string()),
    }
}

/// Connects over HTTP with a bare alloy provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

impl HttpConnector {
    pub fn connect_http(rpc_url: &str) -> Result<Arc<dyn RpcClient>, BridgeInitError> {
        let url = rpc_url
            .parse::<Url>()
            .map_err(|err| BridgeInitError::InvalidRpcUrl {
                url: rpc_url.to_string(),
                reason: err.to_string(),
            })?;
        let provider = ProviderBuilder::new().on_http(url);
        Ok(Arc::new(AlloyRpc::new(provider)))
    }
}

impl RpcConnector for HttpConnector {
    fn connect(&self, rpc_url: &str) -> Result<Arc<dyn RpcClient>, BridgeInitError> {
        Self::connect_http(rpc_url)
    }
}
