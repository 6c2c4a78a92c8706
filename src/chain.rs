use crate::domain::AuthChain;
use crate::errors::ChainError;
use alloy_primitives::{hex, Address, B256, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

sol! {
    function getNonce(address user) external view returns (uint256);
    function lastSignInTime(address user) external view returns (uint256);
    function userXP(address user) external view returns (uint256);
    function signIn(bytes serverSignature) external returns (bool);
}

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const RECEIPT_POLL_ATTEMPTS: u32 = 30;

/// Meme auth contract client over plain Ethereum JSON-RPC.
///
/// Every view goes through `eth_call` against the latest block so nonce and
/// cooldown state are always read fresh; the `signIn` transaction is sent
/// from a node-managed account via `eth_sendTransaction`.
#[derive(Debug, Clone)]
pub struct JsonRpcAuthChain {
    http: reqwest::Client,
    rpc_url: String,
    contract: Address,
    sender: Address,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Receipt {
    status: Option<String>,
}

impl JsonRpcAuthChain {
    pub fn new(rpc_url: String, contract: Address, sender: Address) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url,
            contract,
            sender,
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let envelope: RpcEnvelope = self
            .http
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = envelope.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        envelope
            .result
            .ok_or_else(|| ChainError::MalformedResponse("response carried no result".to_string()))
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let params = json!([
            { "to": self.contract, "data": hex::encode_prefixed(&data) },
            "latest",
        ]);
        let result = self.request("eth_call", params).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| ChainError::MalformedResponse("eth_call result is not a string".to_string()))?;
        hex::decode(raw)
            .map_err(|e| ChainError::MalformedResponse(format!("eth_call result is not hex: {e}")))
    }

    async fn call_uint(&self, data: Vec<u8>) -> Result<U256, ChainError> {
        let raw = self.call(data).await?;
        if raw.len() < 32 {
            return Err(ChainError::MalformedResponse(format!(
                "expected a 32-byte word, got {} bytes",
                raw.len()
            )));
        }
        Ok(U256::from_be_slice(&raw[..32]))
    }

    async fn call_u64(&self, data: Vec<u8>) -> Result<u64, ChainError> {
        let value = self.call_uint(data).await?;
        u64::try_from(value)
            .map_err(|_| ChainError::MalformedResponse("value exceeds u64".to_string()))
    }
}

#[async_trait]
impl AuthChain for JsonRpcAuthChain {
    async fn nonce_of(&self, user: Address) -> Result<u64, ChainError> {
        self.call_u64(getNonceCall { user }.abi_encode()).await
    }

    async fn last_sign_in_time(&self, user: Address) -> Result<u64, ChainError> {
        self.call_u64(lastSignInTimeCall { user }.abi_encode()).await
    }

    async fn user_xp(&self, user: Address) -> Result<u64, ChainError> {
        self.call_u64(userXPCall { user }.abi_encode()).await
    }

    async fn submit_sign_in(&self, signature: &str) -> Result<B256, ChainError> {
        let raw_signature = hex::decode(signature).map_err(|_| ChainError::InvalidSignature)?;
        let data = signInCall {
            serverSignature: raw_signature.into(),
        }
        .abi_encode();

        let params = json!([{
            "from": self.sender,
            "to": self.contract,
            "data": hex::encode_prefixed(&data),
        }]);
        let result = self.request("eth_sendTransaction", params).await?;
        let raw = result.as_str().ok_or_else(|| {
            ChainError::MalformedResponse("transaction hash is not a string".to_string())
        })?;
        let tx: B256 = raw
            .parse()
            .map_err(|e| ChainError::MalformedResponse(format!("bad transaction hash: {e}")))?;
        tracing::info!(tx = %tx, contract = %self.contract, "Submitted signIn transaction");
        Ok(tx)
    }

    async fn await_sign_in_confirmation(&self, tx: B256) -> Result<(), ChainError> {
        for _ in 0..RECEIPT_POLL_ATTEMPTS {
            let result = self.request("eth_getTransactionReceipt", json!([tx])).await?;
            if result.is_null() {
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
                continue;
            }
            let receipt: Receipt = serde_json::from_value(result)
                .map_err(|e| ChainError::MalformedResponse(format!("bad receipt: {e}")))?;
            return match receipt.status.as_deref() {
                Some("0x1") => {
                    tracing::info!(tx = %tx, "signIn transaction confirmed");
                    Ok(())
                }
                _ => Err(ChainError::Reverted(tx)),
            };
        }
        Err(ChainError::ConfirmationTimeout(tx))
    }
}
