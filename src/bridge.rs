//! Oriented bridge handles and their construction.

use std::{fmt, sync::Arc};

use alloy::primitives::{Address, ChainId};
use futures_util::future::try_join;
use serde_json::json;

use crate::{
    error::BridgeInitError,
    network::{Network, TokenBridgeAddresses},
    provider::ProviderGateway,
    resolver::Orientation,
    rpc::{self, RpcClient, RpcConnector},
};

/// An account on one chain, reachable through an RPC client.
pub struct ChainSigner {
    chain_id: ChainId,
    address: Address,
    rpc: Arc<dyn RpcClient>,
}

impl ChainSigner {
    pub fn new(chain_id: ChainId, address: Address, rpc: Arc<dyn RpcClient>) -> Self {
        Self {
            chain_id,
            address,
            rpc,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn rpc(&self) -> &dyn RpcClient {
        self.rpc.as_ref()
    }

    /// Confirm the client is on the expected chain and `router` has code there.
    async fn verify(&self, router: Address) -> Result<(), BridgeInitError> {
        let actual = self.rpc.chain_id().await?;
        if actual != self.chain_id {
            return Err(BridgeInitError::ChainMismatch {
                expected: self.chain_id,
                actual,
            });
        }

        if self.rpc.code_at(router).await?.is_empty() {
            return Err(BridgeInitError::MissingContract {
                chain_id: self.chain_id,
                address: router.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ChainSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainSigner")
            .field("chain_id", &self.chain_id)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Bridge between a parent and a child chain, bound to one orientation.
///
/// Read-only once built; a different orientation needs a new handle.
#[derive(Debug)]
pub struct BridgeHandle {
    orientation: Orientation,
    network: Network,
    partner: Network,
    l1_signer: ChainSigner,
    l2_signer: ChainSigner,
    token_bridge: TokenBridgeAddresses,
}

impl BridgeHandle {
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// The network the wallet is connected to.
    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn partner(&self) -> &Network {
        &self.partner
    }

    pub fn parent_network(&self) -> &Network {
        match self.orientation {
            Orientation::Deposit => &self.network,
            Orientation::Withdrawal => &self.partner,
        }
    }

    pub fn child_network(&self) -> &Network {
        match self.orientation {
            Orientation::Deposit => &self.partner,
            Orientation::Withdrawal => &self.network,
        }
    }

    pub fn l1_signer(&self) -> &ChainSigner {
        &self.l1_signer
    }

    pub fn l2_signer(&self) -> &ChainSigner {
        &self.l2_signer
    }

    pub fn token_bridge(&self) -> TokenBridgeAddresses {
        self.token_bridge
    }
}

/// Builds bridge handles; the wallet supplies one side, `connector` the other.
#[derive(Clone)]
pub struct BridgeFactory {
    connector: Arc<dyn RpcConnector>,
}

impl BridgeFactory {
    pub fn new(connector: Arc<dyn RpcConnector>) -> Self {
        Self { connector }
    }

    /// One construction attempt, no retries.
    ///
    /// The wallet's account 0 signs on `network`; the wallet's selected
    /// account signs on `partner` through a standalone client for
    /// `partner.rpc_url`.
    pub async fn build(
        &self,
        orientation: Orientation,
        network: &Network,
        partner: &Network,
        wallet: &ProviderGateway,
    ) -> Result<BridgeHandle, BridgeInitError> {
        let injected = wallet.rpc().ok_or(BridgeInitError::NoProvider)?;
        let selected = wallet
            .selected_address()
            .ok_or(BridgeInitError::NoSelectedAccount)?;

        let accounts: Vec<Address> =
            rpc::call(injected.as_ref(), "eth_accounts", json!([])).await?;
        let first = *accounts.first().ok_or(BridgeInitError::NoInjectedAccount)?;
        let injected_signer = ChainSigner::new(network.chain_id, first, injected);

        let standalone = self.connector.connect(&partner.rpc_url)?;
        let partner_signer = ChainSigner::new(partner.chain_id, selected, standalone);

        let (l1_signer, l2_signer) = match orientation {
            Orientation::Deposit => (injected_signer, partner_signer),
            Orientation::Withdrawal => (partner_signer, injected_signer),
        };

        let token_bridge = network.token_bridge;
        try_join(
            l1_signer.verify(token_bridge.l1_address),
            l2_signer.verify(token_bridge.l2_address),
        )
        .await?;

        tracing::info!(
            %orientation,
            l1_chain = l1_signer.chain_id(),
            l1_signer = %l1_signer.address(),
            l2_chain = l2_signer.chain_id(),
            l2_signer = %l2_signer.address(),
            "bridge initialized"
        );

        Ok(BridgeHandle {
            orientation,
            network: network.clone(),
            partner: partner.clone(),
            l1_signer,
            l2_signer,
            token_bridge,
        })
    }
}
