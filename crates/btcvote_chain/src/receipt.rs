use std::time::Duration;

use alloy_primitives::B256;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::rpc::{JsonRpcClient, RpcError, TxReceipt};

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReceiptError {
    #[error("No receipt for {hash} after {waited:?}")]
    Timeout { hash: B256, waited: Duration },

    #[error("Stopped waiting for {0}")]
    Cancelled(B256),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Poll `eth_getTransactionReceipt` until the transaction is mined.
///
/// Returns the receipt whether it succeeded or reverted; callers decide what
/// a revert means. Transient RPC errors are retried until `timeout`.
pub async fn wait_for_receipt(
    client: &JsonRpcClient,
    hash: B256,
    poll_interval: Duration,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<TxReceipt, ReceiptError> {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut last_error: Option<RpcError> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(ReceiptError::Cancelled(hash));
        }

        match client.transaction_receipt(hash).await {
            Ok(Some(receipt)) => {
                info!(%hash, success = receipt.success, block = ?receipt.block_number, "transaction mined");
                return Ok(receipt);
            }
            Ok(None) => debug!(%hash, "receipt pending"),
            Err(e @ RpcError::Rpc { .. }) => return Err(e.into()),
            Err(e) => {
                debug!(%hash, error = %e, "receipt poll failed, retrying");
                last_error = Some(e);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(match last_error {
                Some(e @ RpcError::Transport(_)) => e.into(),
                _ => ReceiptError::Timeout {
                    hash,
                    waited: now - started,
                },
            });
        }

        let sleep_until = (now + poll_interval).min(deadline);
        tokio::select! {
            _ = tokio::time::sleep_until(sleep_until) => {}
            _ = cancel.cancelled() => return Err(ReceiptError::Cancelled(hash)),
        }
    }
}
