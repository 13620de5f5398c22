use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::numeric::{parse_optional_u64ish, parse_u64ish};
use crate::error::{Result, TrawlError};

/// Per-address game state, read from the claim object's dynamic field.
///
/// A fresh snapshot is taken every poll; nothing here is cached between cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Vessel tier index
    pub boat: u64,
    /// Gear tier index
    pub mesh: u64,
    /// Resource-type tier index
    pub seafood: u64,
    /// Last claim, unix millis
    pub last_claim: u64,
    /// Index into the game's `specialBoost` table
    pub special_boost: Option<u64>,
    /// Trigger timestamp for trigger-relative boosts, unix millis
    pub special_boost_start_time: Option<u64>,
}

impl AccountState {
    /// Parse the content fields of the account's dynamic field object.
    ///
    /// Accepts both the bare struct fields and the `{name, value: {fields}}`
    /// wrapper that `Table` entries are rendered with.
    pub fn from_fields(fields: &Value) -> Result<Self> {
        let fields = if fields.get("boat").is_some() {
            fields
        } else {
            fields
                .get("value")
                .and_then(|v| v.get("fields").or(Some(v)))
                .filter(|v| v.get("boat").is_some())
                .ok_or_else(|| {
                    TrawlError::InvalidObject("account state has no `boat` field".to_string())
                })?
        };

        let required = |key: &str| -> Result<u64> {
            fields.get(key).and_then(parse_u64ish).ok_or_else(|| {
                TrawlError::InvalidObject(format!("account state field `{}` missing or invalid", key))
            })
        };

        Ok(Self {
            boat: required("boat")?,
            mesh: required("mesh")?,
            seafood: required("seafood")?,
            last_claim: required("last_claim")?,
            special_boost: fields.get("special_boost").and_then(parse_optional_u64ish),
            special_boost_start_time: fields
                .get("special_boost_start_time")
                .and_then(parse_optional_u64ish),
        })
    }
}
