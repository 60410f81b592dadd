//! Known networks and their parent/child pairings.

use std::collections::BTreeMap;

use alloy::primitives::{address, Address, ChainId};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Token bridge gateway router contracts, one per side of a pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBridgeAddresses {
    /// Router on the parent chain
    pub l1_address: Address,
    /// Router on the child chain
    pub l2_address: Address,
}

/// A chain the connector knows how to bridge from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub chain_id: ChainId,
    pub name: String,
    /// True for the child (rollup) side of a pairing
    pub is_rollup_chain: bool,
    pub partner_chain_id: ChainId,
    /// Used only to reach this chain when the wallet is on its partner
    pub rpc_url: String,
    #[serde(default)]
    pub explorer_url: Option<String>,
    pub token_bridge: TokenBridgeAddresses,
}

const MAINNET_TOKEN_BRIDGE: TokenBridgeAddresses = TokenBridgeAddresses {
    l1_address: address!("72Ce9c846789fdB6fC1f34aC4AD25Dd9ef7031ef"),
    l2_address: address!("5288c571Fd7aD117beA99bF60FE0846C4E84F933"),
};

const RINKEBY_TOKEN_BRIDGE: TokenBridgeAddresses = TokenBridgeAddresses {
    l1_address: address!("70C143928eCfFaf9F5b406f7f4fC28Dc43d68380"),
    l2_address: address!("9413AD42910c1eA60c737dB5f58d1C504498a3cD"),
};

/// Immutable lookup table of networks keyed by chain id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRegistry {
    networks: BTreeMap<ChainId, Network>,
}

impl NetworkRegistry {
    /// Build a registry, rejecting duplicate ids and dangling partner ids.
    pub fn new(networks: impl IntoIterator<Item = Network>) -> Result<Self, RegistryError> {
        let mut table = BTreeMap::new();
        for network in networks {
            let chain_id = network.chain_id;
            if table.insert(chain_id, network).is_some() {
                return Err(RegistryError::Duplicate(chain_id));
            }
        }

        for network in table.values() {
            if !table.contains_key(&network.partner_chain_id) {
                return Err(RegistryError::UnknownPartner {
                    chain_id: network.chain_id,
                    partner_chain_id: network.partner_chain_id,
                });
            }
        }

        Ok(Self { networks: table })
    }

    /// Build a registry without the partner check.
    ///
    /// Lookups still fail closed on a dangling partner; this only exists so
    /// that behavior can be exercised.
    pub fn new_unchecked(networks: impl IntoIterator<Item = Network>) -> Self {
        Self {
            networks: networks.into_iter().map(|n| (n.chain_id, n)).collect(),
        }
    }

    /// Ethereum mainnet / Arbitrum One and Rinkeby / Arbitrum Rinkeby.
    pub fn builtin() -> Self {
        Self::new_unchecked([
            Network {
                chain_id: 1,
                name: "Mainnet".into(),
                is_rollup_chain: false,
                partner_chain_id: 42161,
                rpc_url: "https://cloudflare-eth.com".into(),
                explorer_url: Some("https://etherscan.io".into()),
                token_bridge: MAINNET_TOKEN_BRIDGE,
            },
            Network {
                chain_id: 42161,
                name: "Arbitrum One".into(),
                is_rollup_chain: true,
                partner_chain_id: 1,
                rpc_url: "https://arb1.arbitrum.io/rpc".into(),
                explorer_url: Some("https://arbiscan.io".into()),
                token_bridge: MAINNET_TOKEN_BRIDGE,
            },
            Network {
                chain_id: 4,
                name: "Rinkeby".into(),
                is_rollup_chain: false,
                partner_chain_id: 421611,
                rpc_url: "https://rinkeby-light.eth.linkpool.io".into(),
                explorer_url: Some("https://rinkeby.etherscan.io".into()),
                token_bridge: RINKEBY_TOKEN_BRIDGE,
            },
            Network {
                chain_id: 421611,
                name: "Arbitrum Rinkeby".into(),
                is_rollup_chain: true,
                partner_chain_id: 4,
                rpc_url: "https://rinkeby.arbitrum.io/rpc".into(),
                explorer_url: Some("https://rinkeby-explorer.arbitrum.io".into()),
                token_bridge: RINKEBY_TOKEN_BRIDGE,
            },
        ])
    }

    pub fn get(&self, chain_id: ChainId) -> Option<&Network> {
        self.networks.get(&chain_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
