//! In-memory [`RpcTransport`] that answers from a closure.
//!
//! Used by tests across the workspace to drive the client, the read layer
//! and the write flows without a node.

use alloy_primitives::Address;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::rpc::{RpcError, RpcTransport};

type Responder = dyn Fn(&str, &Value) -> Result<Value, RpcError> + Send + Sync;

pub struct ScriptedTransport {
    responder: Box<Responder>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `(method, params)` pair seen so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|(m, _)| m == method).count()
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.calls.lock().push((method.to_string(), params.clone()));
        (self.responder)(method, &params)
    }
}

/// Target and calldata of an `eth_call` / `eth_sendTransaction` request.
pub fn call_parts(params: &Value) -> Option<(Address, Vec<u8>)> {
    let tx = params.get(0)?;
    let to: Address = tx.get("to")?.as_str()?.parse().ok()?;
    let data = match tx.get("data").and_then(Value::as_str) {
        Some(s) => hex::decode(s.strip_prefix("0x")?).ok()?,
        None => Vec::new(),
    };
    Some((to, data))
}

/// First four bytes of the calldata, if any.
pub fn call_selector(params: &Value) -> Option<[u8; 4]> {
    let (_, data) = call_parts(params)?;
    data.get(..4)?.try_into().ok()
}

/// ABI-encoded return data as the hex string a node would send back.
pub fn encode_return(data: &[u8]) -> Value {
    Value::String(format!("0x{}", hex::encode(data)))
}
