//! Minimal Ethereum JSON-RPC client.
//!
//! The transport is a trait so the same client runs over HTTP in production
//! and over an in-memory responder in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// JSON-RPC error code wallets use for "user rejected the request" (EIP-1193).
pub const CODE_USER_REJECTED: i64 = 4001;
/// Geth/Hardhat code for a call that reverted with data.
pub const CODE_EXECUTION_REVERTED: i64 = 3;
/// Generic server error; used by nodes for insufficient funds among others.
pub const CODE_SERVER_ERROR: i64 = -32000;
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("Malformed RPC response: {0}")]
    Decode(String),

    #[error("RPC request timed out")]
    Timeout,
}

impl RpcError {
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Sends one JSON-RPC request and returns its `result` member.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    data: Option<Value>,
}

/// JSON-RPC over HTTP POST.
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        trace!(url = %self.url, method, "rpc request");

        let resp = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout
                } else {
                    RpcError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        let parsed: RpcResponse = resp
            .json()
            .await
            .map_err(|e| RpcError::Decode(format!("HTTP {status}: {e}")))?;
        unwrap_response(parsed)
    }
}

fn unwrap_response(resp: RpcResponse) -> Result<Value, RpcError> {
    if let Some(err) = resp.error {
        return Err(RpcError::Rpc {
            code: err.code,
            message: err.message,
            data: err.data,
        });
    }
    // A missing `result` is a valid `null` (e.g. pending receipts).
    Ok(resp.result.unwrap_or(Value::Null))
}

// ---------------------------------------------------------------------------
// Typed client
// ---------------------------------------------------------------------------

/// A transaction for `eth_sendTransaction`; the node or wallet signs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
    pub value: U256,
}

impl TxRequest {
    pub fn call(from: Address, to: Address, data: Vec<u8>) -> Self {
        Self {
            from,
            to,
            data,
            value: U256::ZERO,
        }
    }

    pub fn transfer(from: Address, to: Address, value: U256) -> Self {
        Self {
            from,
            to,
            data: Vec::new(),
            value,
        }
    }

    fn to_json(&self) -> Value {
        let mut tx = json!({
            "from": self.from.to_string(),
            "to": self.to.to_string(),
        });
        if !self.data.is_empty() {
            tx["data"] = Value::String(format!("0x{}", hex::encode(&self.data)));
        }
        if !self.value.is_zero() {
            tx["value"] = Value::String(format!("0x{:x}", self.value));
        }
        tx
    }
}

/// The parts of a transaction receipt the flows care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

/// Typed wrapper over an [`RpcTransport`].
#[derive(Clone)]
pub struct JsonRpcClient {
    transport: Arc<dyn RpcTransport>,
}

impl JsonRpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    pub fn http(url: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Arc::new(HttpTransport::new(url, timeout)))
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!(method, "rpc");
        self.transport.request(method, params).await
    }

    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        let v = self.request("eth_chainId", json!([])).await?;
        parse_u64(&v)
    }

    pub async fn block_number(&self) -> Result<u64, RpcError> {
        let v = self.request("eth_blockNumber", json!([])).await?;
        parse_u64(&v)
    }

    pub async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        let v = self.request("eth_accounts", json!([])).await?;
        parse_addresses(&v)
    }

    /// EIP-1102 account access prompt.
    pub async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
        let v = self.request("eth_requestAccounts", json!([])).await?;
        parse_addresses(&v)
    }

    pub async fn get_balance(&self, address: Address) -> Result<U256, RpcError> {
        let v = self
            .request("eth_getBalance", json!([address.to_string(), "latest"]))
            .await?;
        parse_u256(&v)
    }

    /// `eth_call` against the latest block.
    pub async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let v = self
            .request(
                "eth_call",
                json!([{ "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) }, "latest"]),
            )
            .await?;
        parse_bytes(&v)
    }

    pub async fn send_transaction(&self, tx: &TxRequest) -> Result<B256, RpcError> {
        let v = self
            .request("eth_sendTransaction", json!([tx.to_json()]))
            .await?;
        parse_b256(&v)
    }

    /// `None` while the transaction is still pending.
    pub async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        let v = self
            .request("eth_getTransactionReceipt", json!([format!("0x{}", hex::encode(hash))]))
            .await?;
        if v.is_null() {
            return Ok(None);
        }
        let status = v
            .get("status")
            .ok_or_else(|| RpcError::Decode("receipt without status".into()))?;
        Ok(Some(TxReceipt {
            tx_hash: hash,
            success: parse_u64(status)? == 1,
            block_number: v.get("blockNumber").and_then(|b| parse_u64(b).ok()),
            gas_used: v.get("gasUsed").and_then(|g| parse_u64(g).ok()),
        }))
    }
}

// ---------------------------------------------------------------------------
// Hex helpers
// ---------------------------------------------------------------------------

fn as_hex_str(v: &Value) -> Result<&str, RpcError> {
    let s = v
        .as_str()
        .ok_or_else(|| RpcError::Decode(format!("expected hex string, got {v}")))?;
    s.strip_prefix("0x")
        .ok_or_else(|| RpcError::Decode(format!("missing 0x prefix: {s}")))
}

pub(crate) fn parse_u256(v: &Value) -> Result<U256, RpcError> {
    let digits = as_hex_str(v)?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|e| RpcError::Decode(e.to_string()))
}

pub(crate) fn parse_u64(v: &Value) -> Result<u64, RpcError> {
    let digits = as_hex_str(v)?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|e| RpcError::Decode(e.to_string()))
}

pub(crate) fn parse_bytes(v: &Value) -> Result<Vec<u8>, RpcError> {
    hex::decode(as_hex_str(v)?).map_err(|e| RpcError::Decode(e.to_string()))
}

fn parse_b256(v: &Value) -> Result<B256, RpcError> {
    let bytes = parse_bytes(v)?;
    if bytes.len() != 32 {
        return Err(RpcError::Decode(format!("expected 32-byte hash, got {}", bytes.len())));
    }
    Ok(B256::from_slice(&bytes))
}

fn parse_addresses(v: &Value) -> Result<Vec<Address>, RpcError> {
    let items = v
        .as_array()
        .ok_or_else(|| RpcError::Decode(format!("expected address array, got {v}")))?;
    items
        .iter()
        .map(|item| {
            let bytes = parse_bytes(item)?;
            if bytes.len() != 20 {
                return Err(RpcError::Decode(format!("bad address length {}", bytes.len())));
            }
            Ok(Address::from_slice(&bytes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedTransport;

    #[test]
    fn error_response_becomes_rpc_error() {
        let resp: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": { "code": 4001, "message": "User rejected the request." }
        }))
        .unwrap();
        let err = unwrap_response(resp).unwrap_err();
        assert_eq!(err.code(), Some(CODE_USER_REJECTED));
    }

    #[test]
    fn null_result_is_null() {
        let resp: RpcResponse =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "result": null })).unwrap();
        assert!(unwrap_response(resp).unwrap().is_null());
    }

    #[test]
    fn tx_json_omits_empty_data_and_zero_value() {
        let tx = TxRequest::call(Address::ZERO, Address::repeat_byte(1), vec![]);
        let v = tx.to_json();
        assert!(v.get("data").is_none());
        assert!(v.get("value").is_none());

        let tx = TxRequest::transfer(Address::ZERO, Address::repeat_byte(1), U256::from(255u64));
        assert_eq!(tx.to_json()["value"], "0xff");
    }

    #[test]
    fn hex_parsers() {
        assert_eq!(parse_u64(&json!("0x7a69")).unwrap(), 31337);
        assert_eq!(parse_u256(&json!("0x")).unwrap(), U256::ZERO);
        assert!(parse_u64(&json!("7a69")).is_err());
        assert_eq!(parse_bytes(&json!("0x0102")).unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn receipt_status_is_decoded() {
        let transport = ScriptedTransport::new(|method, _params| match method {
            "eth_getTransactionReceipt" => Ok(json!({ "status": "0x0", "blockNumber": "0x10" })),
            _ => Ok(Value::Null),
        });
        let client = JsonRpcClient::new(Arc::new(transport));
        let receipt = client.transaction_receipt(B256::ZERO).await.unwrap().unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.block_number, Some(16));
    }

    #[tokio::test]
    async fn pending_receipt_is_none() {
        let transport = ScriptedTransport::new(|_, _| Ok(Value::Null));
        let client = JsonRpcClient::new(Arc::new(transport));
        assert!(client.transaction_receipt(B256::ZERO).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn accounts_are_parsed() {
        let transport = ScriptedTransport::new(|_, _| {
            Ok(json!(["0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"]))
        });
        let client = JsonRpcClient::new(Arc::new(transport));
        let accounts = client.accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(
            accounts[0].to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }
}
