//! Connector configuration

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    machine::{MachineOptions, MaintenanceWindow},
    network::{Network, NetworkRegistry},
};

/// File-backed settings, overridable from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Endpoint acting as the injected wallet; none means no wallet
    pub wallet_rpc_url: Option<String>,
    /// Wallet change polling period in milliseconds
    pub poll_interval_ms: u64,
    /// UI route, `#info` forces the informational view
    pub route: Option<String>,
    /// Replaces the built-in network table when non-empty
    pub networks: Vec<Network>,
    pub maintenance: Vec<MaintenanceWindow>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            wallet_rpc_url: None,
            poll_interval_ms: 1000,
            route: None,
            networks: Vec::new(),
            maintenance: Vec::new(),
        }
    }
}

impl ConnectorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn registry(&self) -> Result<NetworkRegistry, ConfigError> {
        if self.networks.is_empty() {
            return Ok(NetworkRegistry::builtin());
        }
        Ok(NetworkRegistry::new(self.networks.iter().cloned())?)
    }

    pub fn machine_options(&self) -> MachineOptions {
        MachineOptions {
            maintenance: self.maintenance.clone(),
            route: self.route.clone(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ConnectorConfig::from_toml("").unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert!(config.wallet_rpc_url.is_none());
        assert_eq!(config.registry().unwrap(), NetworkRegistry::builtin());
        assert!(config.machine_options().maintenance.is_empty());
    }

    #[test]
    fn parses_networks_and_maintenance() {
        let config = ConnectorConfig::from_toml(
            r##"
            wallet_rpc_url = "http://127.0.0.1:8545"
            poll_interval_ms = 250
            route = "#info"

            [[networks]]
            chain_id = 31337
            name = "Local L1"
            is_rollup_chain = false
            partner_chain_id = 31338
            rpc_url = "http://127.0.0.1:8545"
            token_bridge = { l1_address = "0x0000000000000000000000000000000000000b01", l2_address = "0x0000000000000000000000000000000000000b02" }

            [[networks]]
            chain_id = 31338
            name = "Local L2"
            is_rollup_chain = true
            partner_chain_id = 31337
            rpc_url = "http://127.0.0.1:8546"
            explorer_url = "http://127.0.0.1:4000"
            token_bridge = { l1_address = "0x0000000000000000000000000000000000000b01", l2_address = "0x0000000000000000000000000000000000000b02" }

            [[maintenance]]
            chain_id = 31338
            partner_chain_id = 31337
            message = "Sequencer offline 3pm-5pm EST"
            "##,
        )
        .unwrap();

        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get(31338).unwrap().is_rollup_chain);

        let options = config.machine_options();
        assert_eq!(options.route.as_deref(), Some("#info"));
        assert!(options.maintenance[0].matches(31337, 31338));
        assert_eq!(options.maintenance[0].notice(), "Sequencer offline 3pm-5pm EST");
    }

    #[test]
    fn example_config_loads() {
        let config = ConnectorConfig::from_toml(include_str!("../connector.example.toml")).unwrap();
        assert_eq!(config.wallet_rpc_url.as_deref(), Some("http://127.0.0.1:8545"));
        assert_eq!(config.registry().unwrap().len(), 2);
        assert!(config.route.is_none());
    }

    #[test]
    fn inconsistent_networks_rejected() {
        let config = ConnectorConfig::from_toml(
            r#"
            [[networks]]
            chain_id = 5
            name = "Goerli"
            is_rollup_chain = false
            partner_chain_id = 421613
            rpc_url = "http://127.0.0.1:8545"
            token_bridge = { l1_address = "0x0000000000000000000000000000000000000b01", l2_address = "0x0000000000000000000000000000000000000b02" }
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.registry(),
            Err(ConfigError::Registry(RegistryError::UnknownPartner {
                chain_id: 5,
                partner_chain_id: 421613
            }))
        ));
    }
}
