use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// EVM networks the dashboard has contract tables for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Moonbeam,
    Moonriver,
    Hardhat,
}

/// Static metadata for a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network: Network,
    pub chain_id: u64,
    pub rpc_url: String,
    pub ws_url: Option<String>,
    pub explorer_url: Option<String>,
    pub native_symbol: String,
    pub native_name: String,
    pub native_decimals: u8,
    pub testnet: bool,
}

impl Network {
    /// The network unknown chain ids fall back to.
    pub const FALLBACK: Network = Network::Hardhat;

    pub fn all() -> [Network; 3] {
        [Network::Moonbeam, Network::Moonriver, Network::Hardhat]
    }

    /// Human-readable label for the network.
    pub fn label(&self) -> &'static str {
        match self {
            Network::Moonbeam => "Moonbeam",
            Network::Moonriver => "Moonriver",
            Network::Hardhat => "Hardhat Local",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Moonbeam => 1284,
            Network::Moonriver => 1285,
            Network::Hardhat => 31337,
        }
    }

    /// Exact lookup; `None` for chains without a contract table.
    pub fn from_chain_id(chain_id: u64) -> Option<Network> {
        Self::all().into_iter().find(|n| n.chain_id() == chain_id)
    }

    /// Lookup that falls back to [`Network::FALLBACK`] for unknown chain ids.
    pub fn resolve(chain_id: u64) -> Network {
        Self::from_chain_id(chain_id).unwrap_or_else(|| {
            warn!(chain_id, fallback = %Self::FALLBACK, "unsupported chain id, falling back");
            Self::FALLBACK
        })
    }

    pub fn config(&self) -> NetworkConfig {
        match self {
            Network::Moonbeam => NetworkConfig {
                network: *self,
                chain_id: self.chain_id(),
                rpc_url: "https://rpc.api.moonbeam.network".into(),
                ws_url: Some("wss://wss.api.moonbeam.network".into()),
                explorer_url: Some("https://moonscan.io".into()),
                native_symbol: "GLMR".into(),
                native_name: "GLMR".into(),
                native_decimals: 18,
                testnet: false,
            },
            Network::Moonriver => NetworkConfig {
                network: *self,
                chain_id: self.chain_id(),
                rpc_url: "https://rpc.api.moonriver.moonbeam.network".into(),
                ws_url: Some("wss://wss.api.moonriver.moonbeam.network".into()),
                explorer_url: Some("https://moonriver.moonscan.io".into()),
                native_symbol: "MOVR".into(),
                native_name: "MOVR".into(),
                native_decimals: 18,
                testnet: false,
            },
            Network::Hardhat => NetworkConfig {
                network: *self,
                chain_id: self.chain_id(),
                rpc_url: "http://127.0.0.1:8545".into(),
                ws_url: None,
                explorer_url: None,
                native_symbol: "ETH".into(),
                native_name: "Ether".into(),
                native_decimals: 18,
                testnet: true,
            },
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Display name for any chain id, including ones we have no table for.
pub fn network_name(chain_id: u64) -> &'static str {
    Network::from_chain_id(chain_id)
        .map(|n| n.label())
        .unwrap_or("未知")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_ids_round_trip() {
        for network in Network::all() {
            assert_eq!(Network::from_chain_id(network.chain_id()), Some(network));
        }
    }

    #[test]
    fn unknown_chain_falls_back_to_hardhat() {
        assert_eq!(Network::from_chain_id(1), None);
        assert_eq!(Network::resolve(1), Network::Hardhat);
        assert_eq!(Network::resolve(1284), Network::Moonbeam);
    }

    #[test]
    fn network_names() {
        assert_eq!(network_name(31337), "Hardhat Local");
        assert_eq!(network_name(1285), "Moonriver");
        assert_eq!(network_name(56), "未知");
    }

    #[test]
    fn only_hardhat_is_testnet() {
        assert!(Network::Hardhat.config().testnet);
        assert!(!Network::Moonbeam.config().testnet);
        assert_eq!(Network::Moonriver.config().native_symbol, "MOVR");
    }

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Network::Moonbeam).unwrap(), "\"moonbeam\"");
    }
}
