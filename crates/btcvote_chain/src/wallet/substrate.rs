use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use btcvote_core::{AppConfig, InjectedAccountConfig};

use super::{ConnectorEvent, ConnectorState, WalletConnector, WalletError, WalletKind};

/// Name the dashboard identifies itself with when requesting access.
pub const APP_NAME: &str = "BTC Prediction Voting";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedAccount {
    pub name: String,
    /// SS58-encoded address.
    pub address: String,
}

impl From<&InjectedAccountConfig> for InjectedAccount {
    fn from(config: &InjectedAccountConfig) -> Self {
        Self {
            name: config.name.clone(),
            address: config.address.clone(),
        }
    }
}

/// A Substrate wallet extension that can grant access to its accounts.
#[async_trait]
pub trait SubstrateExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Ask the extension for access; fails with `NoExtension` when it is not
    /// installed and `UserRejected` when access is denied.
    async fn enable(&self, app_name: &str) -> Result<Vec<InjectedAccount>, WalletError>;
}

/// Extension whose accounts come from configuration.
pub struct InjectedExtension {
    accounts: Vec<InjectedAccount>,
}

impl InjectedExtension {
    pub fn new(accounts: Vec<InjectedAccount>) -> Self {
        Self { accounts }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.substrate_accounts.iter().map(InjectedAccount::from).collect())
    }
}

#[async_trait]
impl SubstrateExtension for InjectedExtension {
    fn name(&self) -> &str {
        "injected"
    }

    async fn enable(&self, app_name: &str) -> Result<Vec<InjectedAccount>, WalletError> {
        if self.accounts.is_empty() {
            return Err(WalletError::NoExtension);
        }
        info!(app_name, accounts = self.accounts.len(), "substrate extension enabled");
        Ok(self.accounts.clone())
    }
}

/// Substrate wallet integration driving a [`SubstrateExtension`].
pub struct SubstrateConnector {
    extension: Arc<dyn SubstrateExtension>,
    state: ConnectorState,
    events: broadcast::Sender<ConnectorEvent>,
}

impl SubstrateConnector {
    pub fn new(extension: Arc<dyn SubstrateExtension>) -> Self {
        let (events, _rx) = broadcast::channel(16);
        Self {
            extension,
            state: ConnectorState::default(),
            events,
        }
    }

    /// The extension revoked access or was removed.
    pub fn extension_disconnected(&self) {
        self.state.settle(None);
        let _ = self.events.send(ConnectorEvent::Disconnected);
    }
}

#[async_trait]
impl WalletConnector for SubstrateConnector {
    fn kind(&self) -> WalletKind {
        WalletKind::Substrate
    }

    async fn connect(&self) -> Result<String, WalletError> {
        self.state.begin();
        let result = match self.extension.enable(APP_NAME).await {
            Ok(accounts) => accounts
                .into_iter()
                .next()
                .map(|account| account.address)
                .ok_or(WalletError::NoAccounts),
            Err(e) => Err(e),
        };
        self.state.settle(result.as_ref().ok().cloned());
        if let Ok(address) = &result {
            info!(extension = self.extension.name(), %address, "substrate account selected");
        }
        result
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.state.settle(None);
        Ok(())
    }

    fn address(&self) -> Option<String> {
        self.state.address()
    }

    fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectorEvent> {
        self.events.subscribe()
    }
}
