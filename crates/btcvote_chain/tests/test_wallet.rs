use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use btcvote_chain::scripted::ScriptedTransport;
use btcvote_chain::*;
use serde_json::{Value, json};

const EVM_ACCOUNT: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const DOT_ACCOUNT: &str = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5";

fn hardhat_node() -> Arc<ScriptedTransport> {
    Arc::new(ScriptedTransport::new(|method, _| match method {
        "eth_chainId" => Ok(json!("0x7a69")),
        "eth_requestAccounts" | "eth_accounts" => Ok(json!([EVM_ACCOUNT.to_lowercase()])),
        _ => Ok(Value::Null),
    }))
}

fn evm_connector(transport: Arc<ScriptedTransport>) -> Arc<RpcEvmConnector> {
    Arc::new(RpcEvmConnector::new(JsonRpcClient::new(transport), 31337))
}

fn substrate_connector() -> Arc<SubstrateConnector> {
    Arc::new(SubstrateConnector::new(Arc::new(InjectedExtension::new(vec![
        InjectedAccount {
            name: "alice".into(),
            address: DOT_ACCOUNT.into(),
        },
    ]))))
}

fn wallet() -> UnifiedWallet {
    UnifiedWallet::new(evm_connector(hardhat_node()), substrate_connector())
}

/// Extension that refuses access and counts how often it was asked.
struct RejectingExtension {
    calls: AtomicUsize,
}

#[async_trait]
impl SubstrateExtension for RejectingExtension {
    fn name(&self) -> &str {
        "rejecting"
    }

    async fn enable(&self, _app_name: &str) -> Result<Vec<InjectedAccount>, WalletError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(WalletError::UserRejected)
    }
}

/// Extension that holds the handshake open until released.
struct GatedExtension {
    gate: tokio::sync::Notify,
}

#[async_trait]
impl SubstrateExtension for GatedExtension {
    fn name(&self) -> &str {
        "gated"
    }

    async fn enable(&self, _app_name: &str) -> Result<Vec<InjectedAccount>, WalletError> {
        self.gate.notified().await;
        Ok(vec![InjectedAccount {
            name: "alice".into(),
            address: DOT_ACCOUNT.into(),
        }])
    }
}

// ---------------------------------------------------------------------------
// Connect / disconnect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_connect_and_disconnect_both_kinds() {
    for (kind, expected) in [(WalletKind::Evm, EVM_ACCOUNT), (WalletKind::Substrate, DOT_ACCOUNT)] {
        let wallet = wallet();
        let address = wallet.connect(kind).await.unwrap();
        assert_eq!(address, expected);
        assert!(wallet.is_connected());
        assert_eq!(wallet.address().as_deref(), Some(expected));
        assert_eq!(wallet.kind(), Some(kind));
        assert!(wallet.session().is_consistent());

        wallet.disconnect().await;
        assert!(!wallet.is_connected());
        assert!(wallet.address().is_none());
        assert_eq!(wallet.session(), WalletSession::default());
    }
}

#[tokio::test]
async fn test_switching_kind_tears_down_previous_session() {
    let evm = evm_connector(hardhat_node());
    let substrate = substrate_connector();
    let wallet = UnifiedWallet::new(evm.clone(), substrate.clone());

    wallet.connect(WalletKind::Evm).await.unwrap();
    wallet.connect(WalletKind::Substrate).await.unwrap();

    assert_eq!(wallet.kind(), Some(WalletKind::Substrate));
    assert_eq!(wallet.address().as_deref(), Some(DOT_ACCOUNT));
    assert!(!evm.is_connected());
}

#[tokio::test]
async fn test_rejected_connection_leaves_no_session() {
    let extension = Arc::new(RejectingExtension {
        calls: AtomicUsize::new(0),
    });
    let wallet = UnifiedWallet::new(
        evm_connector(hardhat_node()),
        Arc::new(SubstrateConnector::new(extension.clone())),
    );

    let err = wallet.connect(WalletKind::Substrate).await.unwrap_err();
    assert_eq!(err, WalletError::UserRejected);
    assert_eq!(wallet.session(), WalletSession::default());
    // No automatic retry.
    assert_eq!(extension.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disconnect_during_handshake_wins() {
    let extension = Arc::new(GatedExtension {
        gate: tokio::sync::Notify::new(),
    });
    let substrate = Arc::new(SubstrateConnector::new(extension.clone()));
    let wallet = Arc::new(UnifiedWallet::new(evm_connector(hardhat_node()), substrate.clone()));

    let pending = tokio::spawn({
        let wallet = wallet.clone();
        async move { wallet.connect(WalletKind::Substrate).await }
    });
    tokio::time::timeout(Duration::from_secs(1), async {
        while !wallet.is_loading() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    wallet.disconnect().await;
    assert_eq!(wallet.session(), WalletSession::default());

    extension.gate.notify_one();
    let result = pending.await.unwrap();
    assert_eq!(result.unwrap_err(), WalletError::Cancelled);
    assert!(!wallet.is_connected());
    assert_eq!(wallet.session(), WalletSession::default());
    assert!(!substrate.is_connected());
}

#[tokio::test]
async fn test_wrong_chain_is_reported() {
    let node = Arc::new(ScriptedTransport::new(|method, _| match method {
        "eth_chainId" => Ok(json!("0x504")),
        _ => Ok(json!([EVM_ACCOUNT])),
    }));
    let wallet = UnifiedWallet::new(evm_connector(node), substrate_connector());
    let err = wallet.connect(WalletKind::Evm).await.unwrap_err();
    assert_eq!(
        err,
        WalletError::WrongChain {
            expected: 31337,
            actual: 1284
        }
    );
    assert!(!wallet.is_connected());
}

#[tokio::test]
async fn test_request_accounts_falls_back_to_eth_accounts() {
    let node = Arc::new(ScriptedTransport::new(|method, _| match method {
        "eth_chainId" => Ok(json!("0x7a69")),
        "eth_requestAccounts" => Err(RpcError::Rpc {
            code: -32601,
            message: "Method not found".into(),
            data: None,
        }),
        _ => Ok(json!([EVM_ACCOUNT])),
    }));
    let connector = evm_connector(node.clone());
    let address = connector.connect().await.unwrap();
    assert_eq!(address, EVM_ACCOUNT);
    assert_eq!(node.count("eth_accounts"), 1);
}

#[tokio::test]
async fn test_connect_rejection_by_wallet_rpc() {
    let node = Arc::new(ScriptedTransport::new(|method, _| match method {
        "eth_chainId" => Ok(json!("0x7a69")),
        _ => Err(RpcError::Rpc {
            code: 4001,
            message: "User rejected the request.".into(),
            data: None,
        }),
    }));
    let wallet = UnifiedWallet::new(evm_connector(node), substrate_connector());
    assert_eq!(
        wallet.connect(WalletKind::Evm).await.unwrap_err(),
        WalletError::UserRejected
    );
    assert!(wallet.kind().is_none());
}

// ---------------------------------------------------------------------------
// Connector events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_underlying_disconnect_resets_session() {
    let substrate = substrate_connector();
    let wallet = Arc::new(UnifiedWallet::new(evm_connector(hardhat_node()), substrate.clone()));
    let listener = wallet.spawn_event_listener();

    wallet.connect(WalletKind::Substrate).await.unwrap();
    substrate.extension_disconnected();

    tokio::time::timeout(Duration::from_secs(1), async {
        while wallet.kind().is_some() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(wallet.session(), WalletSession::default());
    listener.abort();
}

#[tokio::test]
async fn test_events_from_inactive_kind_are_ignored() {
    let wallet = wallet();
    wallet.connect(WalletKind::Evm).await.unwrap();
    wallet.handle_event(WalletKind::Substrate, &ConnectorEvent::Disconnected);
    assert_eq!(wallet.kind(), Some(WalletKind::Evm));

    wallet.handle_event(WalletKind::Evm, &ConnectorEvent::AccountsChanged(vec![]));
    assert!(wallet.kind().is_none());
}
