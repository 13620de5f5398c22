//! Sui JSON-RPC adapter (plain HTTP, no SDK dependency).

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

use super::chain::{ChainClient, CoinPage, ExecutionResult, ExecutionStatus};
use crate::domain::numeric::parse_u64ish;
use crate::error::{Result, TrawlError};
use crate::signing::SignedTransaction;

/// Public mainnet fullnode
pub const SUI_MAINNET_URL: &str = "https://fullnode.mainnet.sui.io:443";

/// Error codes the fullnode uses for "no such object / field"
const NOT_FOUND_CODES: &[&str] = &["notExists", "dynamicFieldNotFound", "deleted"];

pub struct SuiRpcClient {
    http: Client,
    url: String,
    next_id: AtomicU64,
}

impl SuiRpcClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("trawl/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| TrawlError::Internal(format!("failed to build RPC HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status.as_u16() == 429 {
            return Err(TrawlError::RateLimited(format!("{} rate limited", method)));
        }

        if !status.is_success() {
            return Err(TrawlError::Rpc {
                code: i64::from(status.as_u16()),
                message: format!("{} failed: {}", method, text),
            });
        }

        let mut envelope: Value = serde_json::from_str(&text)?;

        if let Some(err) = envelope.get("error") {
            return Err(TrawlError::Rpc {
                code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        debug!(method, id, "rpc ok");
        Ok(envelope
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Pull `data.content.fields` out of an object response
    fn content_fields(response: &Value) -> Result<Option<Value>> {
        if let Some(code) = response
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(Value::as_str)
        {
            if NOT_FOUND_CODES.contains(&code) {
                return Ok(None);
            }
            return Err(TrawlError::InvalidObject(format!("object error: {}", code)));
        }

        let Some(data) = response.get("data").filter(|d| !d.is_null()) else {
            return Ok(None);
        };

        data.get("content")
            .and_then(|c| c.get("fields"))
            .cloned()
            .map(Some)
            .ok_or_else(|| TrawlError::InvalidObject("object has no content fields".to_string()))
    }

    fn effects_status(result: &Value) -> Option<ExecutionStatus> {
        result
            .get("effects")
            .and_then(|e| e.get("status"))
            .and_then(|s| serde_json::from_value(s.clone()).ok())
    }
}

#[async_trait]
impl ChainClient for SuiRpcClient {
    #[instrument(skip(self))]
    async fn get_object_fields(&self, object_id: &str) -> Result<Option<Value>> {
        let result = self
            .call(
                "sui_getObject",
                json!([object_id, { "showContent": true }]),
            )
            .await?;
        Self::content_fields(&result)
    }

    #[instrument(skip(self))]
    async fn get_dynamic_field_fields(
        &self,
        parent_id: &str,
        owner: &str,
    ) -> Result<Option<Value>> {
        let result = self
            .call(
                "suix_getDynamicFieldObject",
                json!([parent_id, { "type": "address", "value": owner }]),
            )
            .await;

        match result {
            Ok(result) => Self::content_fields(&result),
            // Some fullnode versions report a missing field as an RPC error
            Err(TrawlError::Rpc { message, .. })
                if NOT_FOUND_CODES.iter().any(|c| message.contains(c)) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn get_balance(&self, owner: &str, coin_type: &str) -> Result<u128> {
        let result = self
            .call("suix_getBalance", json!([owner, coin_type]))
            .await?;
        let total = result
            .get("totalBalance")
            .ok_or_else(|| TrawlError::InvalidObject("balance has no totalBalance".into()))?;
        match total {
            Value::String(s) => s
                .trim()
                .parse::<u128>()
                .map_err(|e| TrawlError::InvalidObject(format!("totalBalance {}: {}", s, e))),
            other => parse_u64ish(other)
                .map(u128::from)
                .ok_or_else(|| TrawlError::InvalidObject(format!("totalBalance {}", other))),
        }
    }

    #[instrument(skip(self))]
    async fn get_coins(
        &self,
        owner: &str,
        coin_type: &str,
        cursor: Option<&str>,
    ) -> Result<CoinPage> {
        let result = self
            .call("suix_getCoins", json!([owner, coin_type, cursor, Value::Null]))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    #[instrument(skip(self, tx_bytes))]
    async fn dry_run(&self, tx_bytes: &str) -> Result<ExecutionStatus> {
        let result = self
            .call("sui_dryRunTransactionBlock", json!([tx_bytes]))
            .await?;
        Self::effects_status(&result).ok_or_else(|| {
            TrawlError::InvalidObject("dry run response has no effects status".to_string())
        })
    }

    #[instrument(skip(self, signed))]
    async fn execute(&self, signed: &SignedTransaction) -> Result<ExecutionResult> {
        let result = self
            .call(
                "sui_executeTransactionBlock",
                json!([
                    signed.tx_bytes,
                    signed.signatures,
                    { "showEffects": true },
                    "WaitForLocalExecution"
                ]),
            )
            .await?;

        Ok(ExecutionResult {
            digest: result
                .get("digest")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            status: Self::effects_status(&result),
        })
    }
}
