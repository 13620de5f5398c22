//! Game configuration (`gameInfo.json`)
//!
//! Immutable for the life of a run. All multipliers and durations are
//! fixed-point integers scaled by 10,000.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;

use super::numeric::{
    deserialize_decimalish, deserialize_opt_decimalish, deserialize_u64ish, parse_u64ish,
};
use crate::error::{Result, TrawlError};

/// Vessel tier. `fishing_time` is both the cycle length (hours x 10,000)
/// and the vessel's throughput multiplier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoatTier {
    #[serde(deserialize_with = "deserialize_decimalish")]
    pub fishing_time: Decimal,
    /// Price (raw token units) to advance from this tier to the next
    #[serde(default, deserialize_with = "deserialize_opt_decimalish")]
    pub price_upgrade: Option<Decimal>,
}

/// Gear tier
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeshTier {
    #[serde(deserialize_with = "deserialize_decimalish")]
    pub speed: Decimal,
    #[serde(default, deserialize_with = "deserialize_opt_decimalish")]
    pub price_upgrade: Option<Decimal>,
}

/// Resource-type tier
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FishTypeTier {
    #[serde(deserialize_with = "deserialize_decimalish")]
    pub rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostKind {
    /// Active during an absolute window `[start_time, start_time + duration]`
    Window,
    /// Active for `duration` after the account's own trigger timestamp
    Triggered,
    Unknown(u64),
}

impl From<u64> for BoostKind {
    fn from(raw: u64) -> Self {
        match raw {
            0 => BoostKind::Window,
            1 => BoostKind::Triggered,
            other => BoostKind::Unknown(other),
        }
    }
}

fn deserialize_boost_kind<'de, D>(deserializer: D) -> std::result::Result<BoostKind, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_u64ish(&value)
        .map(BoostKind::from)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid boost type {}", value)))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecialBoost {
    #[serde(rename = "type", deserialize_with = "deserialize_boost_kind")]
    pub kind: BoostKind,
    #[serde(deserialize_with = "deserialize_decimalish")]
    pub rate: Decimal,
    #[serde(default, deserialize_with = "deserialize_u64ish")]
    pub start_time: u64,
    #[serde(deserialize_with = "deserialize_u64ish")]
    pub duration: u64,
}

impl SpecialBoost {
    /// Whether the boost multiplier applies at `now_ms`.
    ///
    /// `trigger_ms` is the account's boost start timestamp, only consulted
    /// for [`BoostKind::Triggered`].
    pub fn is_active(&self, now_ms: i64, trigger_ms: Option<u64>) -> bool {
        let start = match self.kind {
            BoostKind::Window => self.start_time,
            BoostKind::Triggered => match trigger_ms {
                Some(t) => t,
                None => return false,
            },
            BoostKind::Unknown(_) => return false,
        };
        let now = i128::from(now_ms);
        let start = i128::from(start);
        now >= start && now <= start + i128::from(self.duration)
    }
}

/// The whole game configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    #[serde(default)]
    pub boat_level: Vec<BoatTier>,
    #[serde(default)]
    pub mesh_level: Vec<MeshTier>,
    #[serde(default)]
    pub fish_type_level: Vec<FishTypeTier>,
    #[serde(default)]
    pub special_boost: Vec<SpecialBoost>,
    /// Reward (raw units) for an account that has never claimed
    #[serde(default, deserialize_with = "deserialize_decimalish_or_zero")]
    pub init_reward: Decimal,
}

fn deserialize_decimalish_or_zero<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_opt_decimalish(deserializer)?.unwrap_or(Decimal::ZERO))
}

impl GameInfo {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| TrawlError::GameData(format!("gameInfo: {}", e)))
    }

    /// Load from a `gameInfo.json` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TrawlError::GameData(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse the claim object's content fields, where the configuration is
    /// published as a JSON string under `data`.
    pub fn from_object_fields(fields: &Value) -> Result<Self> {
        match fields.get("data") {
            Some(Value::String(raw)) => Self::from_json_str(raw),
            Some(obj @ Value::Object(_)) => Ok(serde_json::from_value(obj.clone())?),
            _ => Err(TrawlError::InvalidObject(
                "claim object has no `data` field".to_string(),
            )),
        }
    }

    pub fn boat(&self, level: u64) -> Result<&BoatTier> {
        tier(&self.boat_level, level, "boatLevel")
    }

    pub fn mesh(&self, level: u64) -> Result<&MeshTier> {
        tier(&self.mesh_level, level, "meshLevel")
    }

    pub fn fish_type(&self, level: u64) -> Result<&FishTypeTier> {
        tier(&self.fish_type_level, level, "fishTypeLevel")
    }

    pub fn boost(&self, index: u64) -> Option<&SpecialBoost> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.special_boost.get(i))
    }
}

fn tier<'a, T>(table: &'a [T], level: u64, name: &str) -> Result<&'a T> {
    usize::try_from(level)
        .ok()
        .and_then(|i| table.get(i))
        .ok_or_else(|| {
            TrawlError::GameData(format!(
                "{}[{}] missing ({} tiers configured)",
                name,
                level,
                table.len()
            ))
        })
}
