use std::collections::HashMap;

use btcvote_core::{AppConfig, validate_url};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chains::Network;

/// Configuration for a single RPC endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub network: Network,
    pub url: String,
    pub is_custom: bool,
    pub timeout_secs: u64,
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Manages per-network RPC endpoint configuration with custom override support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfigStore {
    configs: HashMap<Network, RpcConfig>,
}

impl RpcConfigStore {
    /// Create a store populated with each network's default RPC URL.
    pub fn with_defaults() -> Self {
        let configs = Network::all()
            .into_iter()
            .map(|network| {
                let rpc = RpcConfig {
                    network,
                    url: network.config().rpc_url,
                    is_custom: false,
                    timeout_secs: DEFAULT_TIMEOUT_SECS,
                };
                (network, rpc)
            })
            .collect();

        Self { configs }
    }

    /// Defaults plus the overrides from the app config. Overrides for chain
    /// ids without a contract table are skipped.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let mut store = Self::with_defaults();
        for (chain_id, url) in &config.rpc_overrides {
            let Some(network) = Network::from_chain_id(*chain_id) else {
                warn!(chain_id, "RPC override for unsupported chain ignored");
                continue;
            };
            if let Err(e) = store.set_custom_rpc(network, url.clone()) {
                warn!(chain_id, "{e}");
            }
        }
        store
    }

    pub fn get_rpc(&self, network: Network) -> Option<&RpcConfig> {
        self.configs.get(&network)
    }

    /// RPC URL for a chain id, using the fallback network for unknown ids.
    pub fn url_for_chain(&self, chain_id: u64) -> String {
        let network = Network::resolve(chain_id);
        self.get_rpc(network)
            .map(|c| c.url.clone())
            .unwrap_or_else(|| network.config().rpc_url)
    }

    /// Override the RPC URL for a network with a custom endpoint.
    ///
    /// Returns `Err` if the URL fails validation.
    pub fn set_custom_rpc(&mut self, network: Network, url: String) -> Result<(), String> {
        if !validate_url(&url) {
            return Err(format!("invalid RPC URL: {url}"));
        }

        let entry = self.configs.entry(network).or_insert_with(|| RpcConfig {
            network,
            url: String::new(),
            is_custom: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        });
        entry.url = url;
        entry.is_custom = true;
        Ok(())
    }

    /// Reset a network's RPC URL back to the built-in default.
    pub fn reset_to_default(&mut self, network: Network) {
        let entry = self.configs.entry(network).or_insert_with(|| RpcConfig {
            network,
            url: String::new(),
            is_custom: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        });
        entry.url = network.config().rpc_url;
        entry.is_custom = false;
    }
}

impl Default for RpcConfigStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_networks_and_are_not_custom() {
        let store = RpcConfigStore::with_defaults();
        for network in Network::all() {
            let rpc = store.get_rpc(network).unwrap();
            assert!(!rpc.is_custom);
        }
        assert_eq!(store.url_for_chain(31337), "http://127.0.0.1:8545");
    }

    #[test]
    fn set_custom_rpc_marks_as_custom() {
        let mut store = RpcConfigStore::with_defaults();
        store
            .set_custom_rpc(Network::Moonbeam, "https://my-node.example.com".into())
            .unwrap();
        let rpc = store.get_rpc(Network::Moonbeam).unwrap();
        assert!(rpc.is_custom);
        assert_eq!(rpc.url, "https://my-node.example.com");
    }

    #[test]
    fn set_custom_rpc_rejects_ftp_url() {
        let mut store = RpcConfigStore::with_defaults();
        assert!(store.set_custom_rpc(Network::Moonriver, "ftp://x.example.com".into()).is_err());
    }

    #[test]
    fn reset_to_default_restores_original_url() {
        let mut store = RpcConfigStore::with_defaults();
        let original = store.get_rpc(Network::Hardhat).unwrap().url.clone();
        store
            .set_custom_rpc(Network::Hardhat, "http://10.0.0.2:8545".into())
            .unwrap();
        store.reset_to_default(Network::Hardhat);
        let after = store.get_rpc(Network::Hardhat).unwrap();
        assert_eq!(after.url, original);
        assert!(!after.is_custom);
    }

    #[test]
    fn app_config_overrides_apply_and_unknown_chains_are_skipped() {
        let mut config = AppConfig::default();
        config.rpc_overrides.insert(1284, "https://moonbeam.example.com".into());
        config.rpc_overrides.insert(1, "https://mainnet.example.com".into());
        let store = RpcConfigStore::from_app_config(&config);
        assert_eq!(store.url_for_chain(1284), "https://moonbeam.example.com");
        // Unknown chain resolves to the Hardhat default.
        assert_eq!(store.url_for_chain(1), "http://127.0.0.1:8545");
    }
}
