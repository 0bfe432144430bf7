//! JSON-RPC client over HTTP or the local geth IPC socket.
//!
//! Calls are sequential and blocking from the orchestrator's point of view:
//! each request is awaited to completion before the next starts, and no call
//! is ever retried. Failures surface as [`ConnectionError`] and are fatal to
//! the run.

use crate::RpcSettings;
use argus_utils::errors::ConnectionError;
use num_bigint::BigUint;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

enum Transport {
    Rpc { url: String, http: reqwest::Client },
    Ipc { path: PathBuf },
}

/// A connection to an Ethereum node.
pub struct NodeClient {
    transport: Transport,
}

impl NodeClient {
    /// HTTP JSON-RPC client for the given endpoint settings.
    pub fn rpc(settings: &RpcSettings) -> Self {
        let url = settings.url();
        tracing::debug!("using RPC endpoint {url}");
        Self {
            transport: Transport::Rpc {
                url,
                http: reqwest::Client::new(),
            },
        }
    }

    /// IPC client for a local node socket. Probes the socket once so a
    /// missing or unreadable endpoint fails at setup time.
    pub async fn ipc(path: impl Into<PathBuf>) -> Result<Self, ConnectionError> {
        let path = path.into();
        tracing::debug!("using IPC endpoint {}", path.display());
        UnixStream::connect(&path)
            .await
            .map_err(|e| ConnectionError::Ipc {
                path: path.display().to_string(),
                source: e,
            })?;
        Ok(Self {
            transport: Transport::Ipc { path },
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ConnectionError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        tracing::debug!("-> {method}");

        let response = match &self.transport {
            Transport::Rpc { url, http } => http
                .post(url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ConnectionError::Transport(e.to_string()))?
                .json::<Value>()
                .await
                .map_err(|e| ConnectionError::Response(e.to_string()))?,
            Transport::Ipc { path } => ipc_roundtrip(path, &request).await?,
        };

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ConnectionError::Rpc(message));
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| ConnectionError::Response("missing result field".into()))
    }

    /// `eth_getCode` at the latest block, decoded to raw bytes.
    pub async fn code_at(&self, address: &str) -> Result<Vec<u8>, ConnectionError> {
        let result = self.call("eth_getCode", json!([address, "latest"])).await?;
        let hex_str = expect_str(&result)?;
        hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|e| ConnectionError::Response(format!("invalid code hex: {e}")))
    }

    /// `eth_getBalance` at the latest block, in wei.
    pub async fn balance_of(&self, address: &str) -> Result<BigUint, ConnectionError> {
        let result = self
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity_big(&result)
    }

    /// `eth_blockNumber`.
    pub async fn block_number(&self) -> Result<u64, ConnectionError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&result)
    }

    /// `eth_getBlockByNumber` with full transaction objects. `None` when the
    /// node does not know the block.
    pub async fn block_by_number(&self, number: u64) -> Result<Option<Value>, ConnectionError> {
        let tag = format!("0x{number:x}");
        let result = self
            .call("eth_getBlockByNumber", json!([tag, true]))
            .await?;
        Ok(if result.is_null() { None } else { Some(result) })
    }

    /// `eth_getTransactionReceipt`. `None` for unknown transactions.
    pub async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<Value>, ConnectionError> {
        let result = self
            .call("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        Ok(if result.is_null() { None } else { Some(result) })
    }
}

/// One connect-send-read cycle on the IPC socket. geth answers each request
/// with a single JSON document; we read until it parses.
async fn ipc_roundtrip(path: &Path, request: &Value) -> Result<Value, ConnectionError> {
    let ipc_err = |e: std::io::Error| ConnectionError::Ipc {
        path: path.display().to_string(),
        source: e,
    };

    let mut stream = UnixStream::connect(path).await.map_err(ipc_err)?;
    let body =
        serde_json::to_vec(request).map_err(|e| ConnectionError::Transport(e.to_string()))?;
    stream.write_all(&body).await.map_err(ipc_err)?;

    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.map_err(ipc_err)?;
        if n == 0 {
            return Err(ConnectionError::Response(
                "connection closed mid-response".into(),
            ));
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Ok(value) = serde_json::from_slice::<Value>(&buf) {
            return Ok(value);
        }
    }
}

fn expect_str(value: &Value) -> Result<&str, ConnectionError> {
    value
        .as_str()
        .ok_or_else(|| ConnectionError::Response(format!("expected string, got {value}")))
}

/// Parses a hex quantity (`"0x1b4"`) into a u64.
fn parse_quantity(value: &Value) -> Result<u64, ConnectionError> {
    let s = expect_str(value)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ConnectionError::Response(format!("invalid quantity '{s}': {e}")))
}

/// Parses a hex quantity of arbitrary width (balances) into a BigUint.
fn parse_quantity_big(value: &Value) -> Result<BigUint, ConnectionError> {
    let s = expect_str(value)?;
    let digits = s.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(BigUint::from(0u8));
    }
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| ConnectionError::Response(format!("invalid quantity '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quantities() {
        assert_eq!(parse_quantity(&json!("0x1b4")).unwrap(), 436);
        assert!(parse_quantity(&json!("nope")).is_err());
        assert!(parse_quantity(&json!(12)).is_err());
    }

    #[test]
    fn parses_wide_quantities() {
        let wei = parse_quantity_big(&json!("0xde0b6b3a7640000")).unwrap();
        assert_eq!(wei.to_string(), "1000000000000000000");
        assert_eq!(parse_quantity_big(&json!("0x")).unwrap(), BigUint::from(0u8));
    }
}
