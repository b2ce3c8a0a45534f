use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{ConnectorEvent, WalletConnector, WalletError, WalletKind, WalletSession};

#[derive(Debug, Default, Clone, Copy)]
struct Selection {
    active: Option<WalletKind>,
    connecting: Option<WalletKind>,
    /// Bumped by every connect and disconnect; a handshake only commits when
    /// it is still the latest attempt.
    epoch: u64,
}

/// Single entry point over the EVM and Substrate integrations.
///
/// Only the active kind is stored; address, connection and pending flags are
/// read through the matching connector on every call.
pub struct UnifiedWallet {
    evm: Arc<dyn WalletConnector>,
    substrate: Arc<dyn WalletConnector>,
    selection: RwLock<Selection>,
}

impl UnifiedWallet {
    pub fn new(evm: Arc<dyn WalletConnector>, substrate: Arc<dyn WalletConnector>) -> Self {
        Self {
            evm,
            substrate,
            selection: RwLock::new(Selection::default()),
        }
    }

    fn connector(&self, kind: WalletKind) -> &Arc<dyn WalletConnector> {
        match kind {
            WalletKind::Evm => &self.evm,
            WalletKind::Substrate => &self.substrate,
        }
    }

    pub fn kind(&self) -> Option<WalletKind> {
        self.selection.read().active
    }

    pub fn session(&self) -> WalletSession {
        let selection = *self.selection.read();
        match (selection.active, selection.connecting) {
            (Some(kind), _) => {
                let connector = self.connector(kind);
                let address = connector.address();
                WalletSession {
                    kind: Some(kind),
                    connected: address.is_some(),
                    pending: address.is_none() && connector.is_pending(),
                    address,
                }
            }
            (None, Some(kind)) => WalletSession {
                kind: Some(kind),
                address: None,
                connected: false,
                pending: true,
            },
            (None, None) => WalletSession::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session().connected
    }

    pub fn address(&self) -> Option<String> {
        self.session().address
    }

    pub fn is_loading(&self) -> bool {
        self.session().pending
    }

    /// Connect with `kind`, tearing down a session of the other kind first.
    ///
    /// A failed handshake is logged and leaves no active session.
    pub async fn connect(&self, kind: WalletKind) -> Result<String, WalletError> {
        let previous = self.selection.read().active;
        match previous {
            Some(active) if active == kind => {
                if let Some(address) = self.connector(kind).address() {
                    debug!(%kind, "already connected");
                    return Ok(address);
                }
            }
            Some(other) => {
                info!(from = %other, to = %kind, "switching wallet integration");
                if let Err(e) = self.connector(other).disconnect().await {
                    warn!(kind = %other, error = %e, "teardown of previous wallet failed");
                }
            }
            None => {}
        }

        let epoch = {
            let mut selection = self.selection.write();
            selection.epoch += 1;
            selection.active = None;
            selection.connecting = Some(kind);
            selection.epoch
        };

        let result = self.connector(kind).connect().await;

        let superseded = {
            let mut selection = self.selection.write();
            if selection.epoch == epoch && selection.connecting == Some(kind) {
                selection.connecting = None;
                selection.active = result.as_ref().ok().map(|_| kind);
                false
            } else {
                true
            }
        };

        if superseded {
            if result.is_ok() {
                warn!(%kind, "connection finished after being cancelled, tearing down");
                if let Err(e) = self.connector(kind).disconnect().await {
                    warn!(%kind, error = %e, "teardown of cancelled connection failed");
                }
            }
            return Err(WalletError::Cancelled);
        }

        match result {
            Ok(address) => {
                info!(%kind, %address, "wallet connected");
                Ok(address)
            }
            Err(e) => {
                error!(%kind, error = %e, "wallet connection failed");
                Err(e)
            }
        }
    }

    /// Disconnect the active integration. The session is cleared even when
    /// the integration reports an error.
    pub async fn disconnect(&self) {
        let active = {
            let mut selection = self.selection.write();
            let active = selection.active.take();
            selection.connecting = None;
            selection.epoch += 1;
            active
        };
        let Some(kind) = active else {
            return;
        };
        match self.connector(kind).disconnect().await {
            Ok(()) => info!(%kind, "wallet disconnected"),
            Err(e) => warn!(%kind, error = %e, "wallet disconnect reported an error"),
        }
    }

    /// Apply an event raised by the `kind` integration.
    pub fn handle_event(&self, kind: WalletKind, event: &ConnectorEvent) {
        let mut selection = self.selection.write();
        if selection.active != Some(kind) {
            debug!(%kind, ?event, "event from inactive wallet ignored");
            return;
        }
        match event {
            ConnectorEvent::Disconnected => {
                info!(%kind, "wallet disconnected by integration");
                selection.active = None;
            }
            ConnectorEvent::AccountsChanged(accounts) if accounts.is_empty() => {
                info!(%kind, "wallet has no accounts left");
                selection.active = None;
            }
            ConnectorEvent::AccountsChanged(accounts) => {
                info!(%kind, address = %accounts[0], "wallet account changed");
            }
        }
    }

    /// Forward connector events to [`handle_event`](Self::handle_event) until
    /// both connectors close or the handle is aborted.
    pub fn spawn_event_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let wallet = Arc::clone(self);
        let mut evm = Some(self.evm.subscribe());
        let mut substrate = Some(self.substrate.subscribe());
        tokio::spawn(async move {
            while evm.is_some() || substrate.is_some() {
                tokio::select! {
                    event = recv(&mut evm) => {
                        if let Some(event) = event {
                            wallet.handle_event(WalletKind::Evm, &event);
                        }
                    }
                    event = recv(&mut substrate) => {
                        if let Some(event) = event {
                            wallet.handle_event(WalletKind::Substrate, &event);
                        }
                    }
                }
            }
        })
    }
}

/// Next event, `None` after a lag; clears the slot once the channel closes.
async fn recv(slot: &mut Option<broadcast::Receiver<ConnectorEvent>>) -> Option<ConnectorEvent> {
    let Some(rx) = slot.as_mut() else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Ok(event) => Some(event),
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "wallet events lagged");
            None
        }
        Err(RecvError::Closed) => {
            *slot = None;
            None
        }
    }
}
