//! Deposit / withdrawal classification of the wallet's active network.

use std::fmt;

use alloy::primitives::ChainId;

use crate::network::{Network, NetworkRegistry};

/// Direction a bridge handle is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Parent chain to child chain
    Deposit,
    /// Child chain to parent chain
    Withdrawal,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => f.write_str("deposit"),
            Self::Withdrawal => f.write_str("withdrawal"),
        }
    }
}

/// Result of resolving a reported chain id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Unsupported,
    DepositOriented { network: Network, partner: Network },
    WithdrawalOriented { network: Network, partner: Network },
}

impl Classification {
    pub fn orientation(&self) -> Option<Orientation> {
        match self {
            Self::Unsupported => None,
            Self::DepositOriented { .. } => Some(Orientation::Deposit),
            Self::WithdrawalOriented { .. } => Some(Orientation::Withdrawal),
        }
    }

    /// The wallet's network and its partner, when supported.
    pub fn pairing(&self) -> Option<(&Network, &Network)> {
        match self {
            Self::Unsupported => None,
            Self::DepositOriented { network, partner }
            | Self::WithdrawalOriented { network, partner } => Some((network, partner)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkResolver {
    registry: NetworkRegistry,
}

impl NetworkResolver {
    pub fn new(registry: NetworkRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Classify a chain id as reported by the wallet (decimal `networkVersion`).
    ///
    /// Ids are registry keys: only the canonical decimal spelling of a
    /// registered chain id resolves. Signs, padding and leading zeros do not.
    pub fn classify(&self, chain_id: &str) -> Classification {
        match chain_id.parse::<ChainId>() {
            Ok(id) if id.to_string() == chain_id => self.classify_id(id),
            _ => Classification::Unsupported,
        }
    }

    pub fn classify_id(&self, chain_id: ChainId) -> Classification {
        let Some(network) = self.registry.get(chain_id) else {
            return Classification::Unsupported;
        };
        // fail closed even though registries are validated on load
        let Some(partner) = self.registry.get(network.partner_chain_id) else {
            return Classification::Unsupported;
        };

        let (network, partner) = (network.clone(), partner.clone());
        if network.is_rollup_chain {
            Classification::WithdrawalOriented { network, partner }
        } else {
            Classification::DepositOriented { network, partner }
        }
    }
}
