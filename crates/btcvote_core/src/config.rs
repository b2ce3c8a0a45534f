use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::demo::DemoDefaults;

// ---------------------------------------------------------------------------
// Environment variables
// ---------------------------------------------------------------------------

pub const ENV_API_BASE_URL: &str = "BTCVOTE_API_BASE_URL";
pub const ENV_WALLETCONNECT_PROJECT_ID: &str = "BTCVOTE_WALLETCONNECT_PROJECT_ID";
pub const ENV_CHAIN_ID: &str = "BTCVOTE_CHAIN_ID";
pub const ENV_LOG: &str = "BTCVOTE_LOG";

/// Per-chain RPC override variables, keyed by EVM chain id.
pub const RPC_ENV_OVERRIDES: [(&str, u64); 3] = [
    ("BTCVOTE_MOONBEAM_RPC_URL", 1284),
    ("BTCVOTE_MOONRIVER_RPC_URL", 1285),
    ("BTCVOTE_HARDHAT_RPC_URL", 31337),
];

/// Chain the dashboard talks to when nothing else is configured.
pub const DEFAULT_CHAIN_ID: u64 = 31337;

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// An account the Substrate extension exposes once access is granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedAccountConfig {
    pub name: String,
    pub address: String,
}

/// Application configuration stored at `~/.btcvote/config.json`.
///
/// Values from the environment take precedence over the file; see
/// [`AppConfig::apply_env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chain_id: u64,
    pub rpc_overrides: BTreeMap<u64, String>,

    /// Legacy REST backend. `None` puts every page into demo mode.
    pub api_base_url: Option<String>,
    pub walletconnect_project_id: Option<String>,

    // Polling
    pub read_poll_interval_ms: u64,
    pub balance_poll_interval_ms: u64,
    pub receipt_poll_interval_ms: u64,
    pub receipt_timeout_secs: u64,

    pub substrate_accounts: Vec<InjectedAccountConfig>,
    pub demo: DemoDefaults,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            rpc_overrides: BTreeMap::new(),
            api_base_url: None,
            walletconnect_project_id: None,
            read_poll_interval_ms: 10_000,
            balance_poll_interval_ms: 5_000,
            receipt_poll_interval_ms: 1_000,
            receipt_timeout_secs: 120,
            substrate_accounts: Vec::new(),
            demo: DemoDefaults::default(),
            log_level: "info".into(),
        }
    }
}

impl AppConfig {
    /// Returns the base config directory: `~/.btcvote/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".btcvote"))
    }

    /// Returns the config file path: `~/.btcvote/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.btcvote/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Ensures all required directories exist.
    pub fn ensure_dirs() -> Result<()> {
        for dir in [Self::base_dir()?, Self::logs_dir()?] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Loads config from disk (creating a default file if missing), then
    /// applies environment overrides.
    pub fn load() -> Result<Self> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        let mut config = Self::load_from_path(&path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self =
                serde_json::from_str(&content).with_context(|| "Failed to parse config.json")?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_BASE_URL) {
            self.api_base_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(id) = get(ENV_WALLETCONNECT_PROJECT_ID) {
            self.walletconnect_project_id = Some(id);
        }
        if let Some(raw) = get(ENV_CHAIN_ID) {
            match raw.trim().parse::<u64>() {
                Ok(id) => self.chain_id = id,
                Err(_) => warn!(value = %raw, "ignoring non-numeric {ENV_CHAIN_ID}"),
            }
        }
        if let Some(level) = get(ENV_LOG) {
            self.log_level = level;
        }
        for (key, chain_id) in RPC_ENV_OVERRIDES {
            if let Some(url) = get(key) {
                if validate_url(&url) {
                    self.rpc_overrides.insert(chain_id, url);
                } else {
                    warn!(%key, %url, "ignoring invalid RPC override");
                }
            }
        }

        if self.walletconnect_project_id.is_none() {
            warn!(
                "{ENV_WALLETCONNECT_PROJECT_ID} is not set; WalletConnect pairing is unavailable"
            );
        }
    }

    /// `true` when no legacy API is configured and pages run on local state.
    pub fn is_demo_mode(&self) -> bool {
        self.api_base_url.as_deref().is_none_or(str::is_empty)
    }

    pub fn read_poll_interval(&self) -> Duration {
        Duration::from_millis(self.read_poll_interval_ms.max(1))
    }

    pub fn balance_poll_interval(&self) -> Duration {
        Duration::from_millis(self.balance_poll_interval_ms.max(1))
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms.max(1))
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    /// Reject configurations that cannot work at all.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api_base_url {
            if !validate_url(url) {
                anyhow::bail!("invalid API base URL: {url}");
            }
        }
        for (chain_id, url) in &self.rpc_overrides {
            if !validate_url(url) {
                anyhow::bail!("invalid RPC URL for chain {chain_id}: {url}");
            }
        }
        if self.receipt_timeout_secs == 0 {
            anyhow::bail!("receipt_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}
