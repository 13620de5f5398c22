//! Numeric parsing and token-unit helpers
//!
//! Sui's JSON-RPC encodes every `u64` as a string, while `gameInfo.json`
//! files in the wild mix strings and numbers. These helpers accept both.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Fractional digits of both SUI and the game token
pub const TOKEN_DECIMALS: u32 = 9;

/// Parse a JSON string or number into an exact decimal
pub fn parse_decimalish(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str_exact(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str_exact(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain)),
        _ => None,
    }
}

/// Parse a JSON string or number into a `u64`
pub fn parse_u64ish(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Parse a Move `Option<u64>` as rendered by the fullnode
///
/// Seen encodings: `null`, a bare value, or `{"vec": [value]}`.
pub fn parse_optional_u64ish(value: &Value) -> Option<u64> {
    match value {
        Value::Null => None,
        Value::Object(map) => match map.get("vec") {
            Some(Value::Array(items)) => items.first().and_then(parse_u64ish),
            _ => map.get("fields").and_then(parse_optional_u64ish),
        },
        other => parse_u64ish(other),
    }
}

pub fn deserialize_decimalish<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_decimalish(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected decimal, got {}", value)))
}

pub fn deserialize_opt_decimalish<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => parse_decimalish(&v)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected decimal, got {}", v))),
    }
}

pub fn deserialize_u64ish<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_u64ish(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected u64, got {}", value)))
}

/// Convert raw on-chain units (MIST-style, 9 decimals) to whole tokens
pub fn from_base_units(raw: u128) -> Decimal {
    // Decimal holds 96 bits of mantissa; anything larger is not a real balance.
    i128::try_from(raw)
        .ok()
        .and_then(|raw| Decimal::try_from_i128_with_scale(raw, TOKEN_DECIMALS).ok())
        .unwrap_or(Decimal::MAX)
        .normalize()
}

/// Convert whole tokens to raw on-chain units, truncating sub-unit dust
pub fn to_base_units(amount: Decimal) -> Option<u64> {
    use rust_decimal::prelude::ToPrimitive;

    if amount.is_sign_negative() {
        return None;
    }
    amount
        .checked_mul(Decimal::from(10u64.pow(TOKEN_DECIMALS)))?
        .trunc()
        .to_u64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_decimalish_accepts_strings_and_numbers() {
        assert_eq!(parse_decimalish(&json!("12.5")), Some(dec!(12.5)));
        assert_eq!(parse_decimalish(&json!(10000)), Some(dec!(10000)));
        assert_eq!(parse_decimalish(&json!(true)), None);
    }

    #[test]
    fn test_parse_optional_u64ish_encodings() {
        assert_eq!(parse_optional_u64ish(&json!(null)), None);
        assert_eq!(parse_optional_u64ish(&json!("3")), Some(3));
        assert_eq!(parse_optional_u64ish(&json!({ "vec": ["7"] })), Some(7));
        assert_eq!(parse_optional_u64ish(&json!({ "vec": [] })), None);
    }

    #[test]
    fn test_token_unit_conversion() {
        assert_eq!(from_base_units(1_500_000_000), dec!(1.5));
        assert_eq!(from_base_units(0), Decimal::ZERO);
        assert_eq!(to_base_units(dec!(2.5)), Some(2_500_000_000));
        assert_eq!(to_base_units(dec!(0.0000000019)), Some(1));
        assert_eq!(to_base_units(dec!(-1)), None);
    }
}
