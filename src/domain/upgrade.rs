use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::AccountState;
use super::game::GameInfo;

/// Upgradeable track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeTrack {
    /// Vessel
    Boat,
    /// Gear
    Mesh,
}

impl UpgradeTrack {
    /// Pick the track to advance next.
    ///
    /// The lagging track goes first; on a tie the gear (mesh) track wins.
    pub fn choose(boat: u64, mesh: u64) -> Self {
        if mesh > boat {
            UpgradeTrack::Boat
        } else {
            UpgradeTrack::Mesh
        }
    }

    /// Move entry point on the game package
    pub fn entry_function(&self) -> &'static str {
        match self {
            UpgradeTrack::Boat => "upgrade_boat",
            UpgradeTrack::Mesh => "upgrade_mesh",
        }
    }

    /// Key of the tier table in `gameInfo.json`
    pub fn table_name(&self) -> &'static str {
        match self {
            UpgradeTrack::Boat => "boatLevel",
            UpgradeTrack::Mesh => "meshLevel",
        }
    }
}

impl fmt::Display for UpgradeTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

/// What an upgrade attempt would do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradePlan {
    Upgrade {
        track: UpgradeTrack,
        current_level: u64,
        /// Raw token units
        price: u64,
    },
    /// No price configured for the current tier
    MaxLevel { track: UpgradeTrack, current_level: u64 },
}

impl UpgradePlan {
    /// The price to leave a tier is stored on that tier's own record.
    pub fn for_account(info: &GameInfo, state: &AccountState) -> Self {
        let track = UpgradeTrack::choose(state.boat, state.mesh);
        let current_level = match track {
            UpgradeTrack::Boat => state.boat,
            UpgradeTrack::Mesh => state.mesh,
        };
        let price = match track {
            UpgradeTrack::Boat => info.boat(current_level).ok().and_then(|t| t.price_upgrade),
            UpgradeTrack::Mesh => info.mesh(current_level).ok().and_then(|t| t.price_upgrade),
        };

        match price.and_then(|p| p.trunc().to_u64()).filter(|p| *p > 0) {
            Some(price) => UpgradePlan::Upgrade {
                track,
                current_level,
                price,
            },
            None => UpgradePlan::MaxLevel {
                track,
                current_level,
            },
        }
    }
}
