//! Wallet integrations behind one adapter.
//!
//! [`UnifiedWallet`] routes `connect` / `disconnect` to the integration
//! matching a [`WalletKind`] and exposes a single [`WalletSession`].

mod adapter;
mod evm;
mod substrate;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use btcvote_core::BtcvoteError;

pub use adapter::UnifiedWallet;
pub use evm::RpcEvmConnector;
pub use substrate::{InjectedAccount, InjectedExtension, SubstrateConnector, SubstrateExtension};

// ---------------------------------------------------------------------------
// Kinds and session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Evm,
    Substrate,
}

impl WalletKind {
    pub fn label(&self) -> &'static str {
        match self {
            WalletKind::Evm => "EVM",
            WalletKind::Substrate => "Polkadot",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WalletKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "evm" | "metamask" | "ethereum" => Ok(WalletKind::Evm),
            "substrate" | "polkadot" => Ok(WalletKind::Substrate),
            other => Err(format!("unknown wallet kind: {other}")),
        }
    }
}

/// What the rest of the app sees of the wallet.
///
/// `address.is_some() == connected` always holds, and `pending` is never set
/// together with `connected`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub kind: Option<WalletKind>,
    pub address: Option<String>,
    pub connected: bool,
    pub pending: bool,
}

impl WalletSession {
    pub fn is_consistent(&self) -> bool {
        self.address.is_some() == self.connected && !(self.pending && self.connected)
    }
}

/// Notifications an integration raises on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorEvent {
    Disconnected,
    AccountsChanged(Vec<String>),
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("No EVM wallet provider available")]
    NoProvider,

    #[error("No Substrate wallet extension available")]
    NoExtension,

    #[error("User rejected the connection request")]
    UserRejected,

    #[error("Wallet is on chain {actual}, expected {expected}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("Wallet exposes no accounts")]
    NoAccounts,

    #[error("Wallet RPC error: {0}")]
    Rpc(String),

    #[error("Connection attempt was cancelled")]
    Cancelled,
}

impl WalletError {
    pub fn user_message(&self) -> String {
        match self {
            WalletError::NoProvider => "未检测到 EVM 钱包".into(),
            WalletError::NoExtension => "未检测到 Polkadot 钱包扩展".into(),
            WalletError::UserRejected => "用户拒绝了连接请求".into(),
            WalletError::WrongChain { expected, .. } => {
                format!("请切换到 {} 网络", crate::chains::network_name(*expected))
            }
            WalletError::NoAccounts => "钱包中没有可用账户".into(),
            WalletError::Rpc(_) => "钱包连接失败，请重试".into(),
            WalletError::Cancelled => "连接已取消".into(),
        }
    }
}

impl From<WalletError> for BtcvoteError {
    fn from(err: WalletError) -> Self {
        BtcvoteError::Wallet(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Connector seam
// ---------------------------------------------------------------------------

/// One wallet integration.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    fn kind(&self) -> WalletKind;

    /// Run the handshake and return the selected account.
    async fn connect(&self) -> Result<String, WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;

    fn address(&self) -> Option<String>;

    fn is_pending(&self) -> bool;

    fn is_connected(&self) -> bool {
        self.address().is_some()
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectorEvent>;
}

/// Account and handshake flag shared by the connector implementations.
#[derive(Debug, Default)]
struct ConnectorState {
    inner: RwLock<ConnectorInner>,
}

#[derive(Debug, Default)]
struct ConnectorInner {
    address: Option<String>,
    pending: bool,
}

impl ConnectorState {
    fn address(&self) -> Option<String> {
        self.inner.read().address.clone()
    }

    fn is_pending(&self) -> bool {
        self.inner.read().pending
    }

    fn begin(&self) {
        let mut inner = self.inner.write();
        inner.pending = true;
        inner.address = None;
    }

    fn settle(&self, address: Option<String>) {
        let mut inner = self.inner.write();
        inner.pending = false;
        inner.address = address;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("MetaMask".parse::<WalletKind>(), Ok(WalletKind::Evm));
        assert_eq!("polkadot".parse::<WalletKind>(), Ok(WalletKind::Substrate));
        assert!("solana".parse::<WalletKind>().is_err());
    }

    #[test]
    fn default_session_is_consistent() {
        let session = WalletSession::default();
        assert!(session.is_consistent());
        assert!(session.kind.is_none());
    }

    #[test]
    fn wrong_chain_names_expected_network() {
        let err = WalletError::WrongChain {
            expected: 1284,
            actual: 1,
        };
        assert_eq!(err.user_message(), "请切换到 Moonbeam 网络");
    }
}
