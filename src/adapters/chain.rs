use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::numeric::deserialize_u64ish;
use crate::error::Result;
use crate::signing::SignedTransaction;

/// Effects status string the chain reports for a successful transaction
pub const STATUS_SUCCESS: &str = "success";

/// Native gas token type, short form
pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

/// Whether `coin_type` names the native gas token (short or long address form)
pub fn is_native_gas_coin(coin_type: &str) -> bool {
    let mut parts = coin_type.splitn(2, "::");
    let address = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default();
    if rest != "sui::SUI" {
        return false;
    }
    let digits = address.trim_start_matches("0x").trim_start_matches('0');
    digits == "2"
}

/// A single on-chain coin object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinObject {
    pub coin_object_id: String,
    #[serde(deserialize_with = "deserialize_u64ish")]
    pub balance: u64,
}

/// One page of `suix_getCoins`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinPage {
    #[serde(default)]
    pub data: Vec<CoinObject>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}

/// `effects.status` of a simulated or executed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecutionStatus {
    pub fn success() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: "failure".to_string(),
            error: Some(error.into()),
        }
    }

    /// Anything other than the literal success marker is a failure
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    pub fn describe(&self) -> String {
        match &self.error {
            Some(err) => format!("{}: {}", self.status, err),
            None => self.status.clone(),
        }
    }
}

/// Response of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub digest: String,
    /// Missing when the node returned no effects
    pub status: Option<ExecutionStatus>,
}

/// Read and submit access to the chain.
///
/// Implementations are injected into every component; there is no global client.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Content fields of an object, `None` if it does not exist
    async fn get_object_fields(&self, object_id: &str) -> Result<Option<Value>>;

    /// Content fields of the dynamic field keyed by `owner` under `parent_id`,
    /// `None` when the owner has no entry yet
    async fn get_dynamic_field_fields(&self, parent_id: &str, owner: &str)
        -> Result<Option<Value>>;

    /// Total balance of `coin_type` owned by `owner`, raw units
    async fn get_balance(&self, owner: &str, coin_type: &str) -> Result<u128>;

    /// One page of the owner's coin objects of `coin_type`
    async fn get_coins(
        &self,
        owner: &str,
        coin_type: &str,
        cursor: Option<&str>,
    ) -> Result<CoinPage>;

    /// Simulate signed transaction bytes against current state
    async fn dry_run(&self, tx_bytes: &str) -> Result<ExecutionStatus>;

    /// Submit and wait for local execution
    async fn execute(&self, signed: &SignedTransaction) -> Result<ExecutionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_native_gas_coin_forms() {
        assert!(is_native_gas_coin("0x2::sui::SUI"));
        assert!(is_native_gas_coin(
            "0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI"
        ));
        assert!(!is_native_gas_coin("0xa8816d::ocean::OCEAN"));
        assert!(!is_native_gas_coin("0x22::sui::SUI"));
    }

    #[test]
    fn test_coin_page_parses_string_balances() {
        let page: CoinPage = serde_json::from_value(json!({
            "data": [
                { "coinType": "0x1::ocean::OCEAN", "coinObjectId": "0xa", "balance": "1500", "version": "3" }
            ],
            "nextCursor": "0xa",
            "hasNextPage": true
        }))
        .unwrap();
        assert_eq!(page.data[0].balance, 1500);
        assert_eq!(page.next_cursor.as_deref(), Some("0xa"));
        assert!(page.has_next_page);
    }

    #[test]
    fn test_only_literal_success_is_success() {
        assert!(ExecutionStatus::success().is_success());
        let status = ExecutionStatus {
            status: "Success".into(),
            error: None,
        };
        assert!(!status.is_success());
        assert_eq!(
            ExecutionStatus::failure("MoveAbort").describe(),
            "failure: MoveAbort"
        );
    }
}
