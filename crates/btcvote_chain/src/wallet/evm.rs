use alloy_primitives::Address;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{ConnectorEvent, ConnectorState, WalletConnector, WalletError, WalletKind};
use crate::rpc::{CODE_METHOD_NOT_FOUND, CODE_USER_REJECTED, JsonRpcClient, RpcError};

/// EVM wallet backed by a node-managed account list.
///
/// The node (or a wallet bridge exposing the same RPC surface) holds the
/// keys and signs `eth_sendTransaction`, so connecting means asking it for
/// accounts on the expected chain.
pub struct RpcEvmConnector {
    client: JsonRpcClient,
    expected_chain_id: u64,
    state: ConnectorState,
    events: broadcast::Sender<ConnectorEvent>,
}

impl RpcEvmConnector {
    pub fn new(client: JsonRpcClient, expected_chain_id: u64) -> Self {
        let (events, _rx) = broadcast::channel(16);
        Self {
            client,
            expected_chain_id,
            state: ConnectorState::default(),
            events,
        }
    }

    pub fn client(&self) -> &JsonRpcClient {
        &self.client
    }

    /// Connected account as a typed address.
    pub fn account(&self) -> Option<Address> {
        self.state.address()?.parse().ok()
    }

    async fn handshake(&self) -> Result<String, WalletError> {
        let actual = self.client.chain_id().await.map_err(map_rpc)?;
        if actual != self.expected_chain_id {
            return Err(WalletError::WrongChain {
                expected: self.expected_chain_id,
                actual,
            });
        }

        let accounts = match self.client.request_accounts().await {
            Ok(accounts) => accounts,
            Err(RpcError::Rpc { code, .. }) if code == CODE_METHOD_NOT_FOUND => {
                debug!("eth_requestAccounts unsupported, using eth_accounts");
                self.client.accounts().await.map_err(map_rpc)?
            }
            Err(e) => return Err(map_rpc(e)),
        };

        accounts
            .first()
            .map(|a| a.to_string())
            .ok_or(WalletError::NoAccounts)
    }

    /// Re-read the account list and raise events when it changed. An empty
    /// list means the wallet went away.
    pub async fn refresh_accounts(&self) -> Result<(), WalletError> {
        let Some(current) = self.state.address() else {
            return Ok(());
        };
        let accounts: Vec<String> = self
            .client
            .accounts()
            .await
            .map_err(map_rpc)?
            .iter()
            .map(|a| a.to_string())
            .collect();

        match accounts.first() {
            None => {
                warn!("EVM wallet no longer exposes accounts");
                self.state.settle(None);
                let _ = self.events.send(ConnectorEvent::Disconnected);
            }
            Some(first) if *first != current => {
                info!(address = %first, "EVM account changed");
                self.state.settle(Some(first.clone()));
                let _ = self.events.send(ConnectorEvent::AccountsChanged(accounts));
            }
            Some(_) => {}
        }
        Ok(())
    }
}

#[async_trait]
impl WalletConnector for RpcEvmConnector {
    fn kind(&self) -> WalletKind {
        WalletKind::Evm
    }

    async fn connect(&self) -> Result<String, WalletError> {
        self.state.begin();
        let result = self.handshake().await;
        self.state.settle(result.as_ref().ok().cloned());
        result
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        // Node-managed accounts have no session to revoke.
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

fn map_rpc(err: RpcError) -> WalletError {
    match err {
        RpcError::Rpc { code, .. } if code == CODE_USER_REJECTED => WalletError::UserRejected,
        RpcError::Transport(_) | RpcError::Timeout => WalletError::NoProvider,
        other => WalletError::Rpc(other.to_string()),
    }
}
