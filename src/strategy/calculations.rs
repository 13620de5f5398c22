//! Reward accrual calculator
//!
//! Pure function of the game configuration, one account snapshot and the
//! current time. Every step runs on `Decimal`; amounts carry 9 fractional
//! digits on chain and must not drift through the chained x10,000 scalings.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::fmt;
use tracing::warn;

use crate::domain::numeric::TOKEN_DECIMALS;
use crate::domain::{AccountState, GameInfo};
use crate::error::Result;

/// Fixed-point scale of every tier multiplier and duration
pub const SCALE: Decimal = dec!(10000);

/// Tier durations are stored in hours
const MS_PER_HOUR: Decimal = dec!(3600000);

/// Fractional digits kept after each division, same as the game's web client
const DIVISION_PLACES: u32 = 20;

/// Fractional digits of the displayed claimable amount
pub const CLAIMABLE_PLACES: u32 = 5;

/// Derived accrual for one account at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accrual {
    /// Milliseconds until the current cycle completes
    pub time_remaining_ms: u64,
    /// Claimable tokens, 5 fractional digits
    pub claimable: Decimal,
    /// 0..=100 while accruing; treat >= 100 as ready
    pub progress: Decimal,
}

impl Accrual {
    fn zero() -> Self {
        Self {
            time_remaining_ms: 0,
            claimable: Decimal::ZERO,
            progress: Decimal::ZERO,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.progress >= dec!(100)
    }

    /// Progress with two decimals, for status lines
    pub fn progress_display(&self) -> String {
        format!(
            "{:.2}%",
            self.progress
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        )
    }
}

impl fmt::Display for Accrual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.5} claimable, {}, {}s to claim",
            self.claimable,
            self.progress_display(),
            self.time_remaining_ms / 1000
        )
    }
}

fn div(numerator: Decimal, denominator: Decimal) -> Decimal {
    (numerator / denominator).round_dp_with_strategy(DIVISION_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

fn to_claimable(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CLAIMABLE_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute time remaining, claimable amount and progress.
///
/// - No game configuration: all zero.
/// - No account state (never interacted): ready, claimable = `initReward`
///   in whole tokens, unrounded.
/// - A `last_claim` ahead of `now_ms` (clock skew) reads as a cycle that has
///   just started.
/// - Missing tier records are a [`crate::error::TrawlError::GameData`] error.
pub fn compute_accrual(
    info: Option<&GameInfo>,
    state: Option<&AccountState>,
    now_ms: i64,
) -> Result<Accrual> {
    let Some(info) = info else {
        return Ok(Accrual::zero());
    };

    let Some(state) = state else {
        let scale = Decimal::from(10u64.pow(TOKEN_DECIMALS));
        return Ok(Accrual {
            time_remaining_ms: 0,
            claimable: info.init_reward / scale,
            progress: dec!(100),
        });
    };

    let boat = info.boat(state.boat)?;
    let mesh = info.mesh(state.mesh)?;
    let fish_type = info.fish_type(state.seafood)?;

    let cycle_ms = div(boat.fishing_time * MS_PER_HOUR, SCALE);
    if cycle_ms <= Decimal::ZERO {
        // Degenerate tier: nothing accrues, but nothing blocks a claim either
        return Ok(Accrual {
            time_remaining_ms: 0,
            claimable: Decimal::ZERO,
            progress: dec!(100),
        });
    }

    let now = Decimal::from(now_ms);
    let cycle_end = Decimal::from(state.last_claim) + cycle_ms;
    let remaining = if cycle_end > now {
        (cycle_end - now).min(cycle_ms)
    } else {
        Decimal::ZERO
    };
    let elapsed = cycle_ms - remaining;

    let mut amount = div(elapsed, cycle_ms) * boat.fishing_time;
    amount = div(amount, SCALE) * mesh.speed;
    amount = div(amount, SCALE) * fish_type.rate;
    amount = div(amount, SCALE);

    if let Some(index) = state.special_boost {
        match info.boost(index) {
            Some(boost) if boost.is_active(now_ms, state.special_boost_start_time) => {
                amount = div(amount * boost.rate, SCALE);
            }
            Some(_) => {}
            None => warn!("specialBoost[{}] not in game configuration, ignoring", index),
        }
    }

    Ok(Accrual {
        time_remaining_ms: remaining.ceil().to_u64().unwrap_or(u64::MAX),
        claimable: to_claimable(amount),
        progress: div(elapsed * dec!(100), cycle_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoatTier, BoostKind, FishTypeTier, MeshTier, SpecialBoost};
    use proptest::prelude::*;

    const NOW: i64 = 1_760_000_000_000;
    const HOUR_MS: i64 = 3_600_000;

    fn unit_info() -> GameInfo {
        GameInfo::from_json_str(
            r#"{
                "boatLevel": [{"fishing_time": 10000}, {"fishing_time": 20000}],
                "meshLevel": [{"speed": 10000}, {"speed": 15000}],
                "fishTypeLevel": [{"rate": 10000}, {"rate": 12000}],
                "initReward": "250000000"
            }"#,
        )
        .unwrap()
    }

    fn state_claimed_at(last_claim: i64) -> AccountState {
        AccountState {
            boat: 0,
            mesh: 0,
            seafood: 0,
            last_claim: last_claim as u64,
            special_boost: None,
            special_boost_start_time: None,
        }
    }

    #[test]
    fn test_no_game_config_is_zero() {
        let accrual = compute_accrual(None, Some(&state_claimed_at(0)), NOW).unwrap();
        assert_eq!(accrual, Accrual::zero());
        assert!(!accrual.is_ready());
    }

    #[test]
    fn test_new_account_gets_init_reward() {
        let info = unit_info();
        let accrual = compute_accrual(Some(&info), None, NOW).unwrap();
        assert_eq!(accrual.progress, dec!(100));
        assert_eq!(accrual.claimable, dec!(0.25));
        assert_eq!(accrual.time_remaining_ms, 0);
        assert!(accrual.is_ready());
    }

    #[test]
    fn test_init_reward_keeps_all_token_decimals() {
        let mut info = unit_info();
        info.init_reward = dec!(123456789);
        let accrual = compute_accrual(Some(&info), None, NOW).unwrap();
        assert_eq!(accrual.claimable, dec!(0.123456789));
    }

    #[test]
    fn test_last_claim_ahead_of_clock_is_not_negative() {
        let info = unit_info();
        let state = state_claimed_at(NOW + 500);
        let accrual = compute_accrual(Some(&info), Some(&state), NOW).unwrap();
        assert_eq!(accrual.progress, Decimal::ZERO);
        assert_eq!(accrual.claimable, Decimal::ZERO);
        assert_eq!(accrual.time_remaining_ms, HOUR_MS as u64);
    }

    #[test]
    fn test_full_cycle_elapsed_is_ready() {
        let info = unit_info();
        let state = state_claimed_at(NOW - HOUR_MS);
        let accrual = compute_accrual(Some(&info), Some(&state), NOW).unwrap();
        assert_eq!(accrual.progress, dec!(100));
        assert_eq!(accrual.time_remaining_ms, 0);
        assert_eq!(accrual.claimable, dec!(1.00000));
    }

    #[test]
    fn test_just_claimed_is_zero_progress() {
        let info = unit_info();
        let state = state_claimed_at(NOW);
        let accrual = compute_accrual(Some(&info), Some(&state), NOW).unwrap();
        assert_eq!(accrual.progress, Decimal::ZERO);
        assert_eq!(accrual.claimable, dec!(0.00000));
        assert_eq!(accrual.time_remaining_ms, HOUR_MS as u64);
        assert_eq!(format!("{:.5}", accrual.claimable), "0.00000");
    }

    #[test]
    fn test_half_cycle_with_multipliers() {
        let info = unit_info();
        let state = AccountState {
            boat: 1, // 2h cycle, x2 throughput
            mesh: 1, // x1.5
            seafood: 1, // x1.2
            ..state_claimed_at(NOW - HOUR_MS)
        };
        let accrual = compute_accrual(Some(&info), Some(&state), NOW).unwrap();
        assert_eq!(accrual.progress, dec!(50));
        assert_eq!(accrual.time_remaining_ms, HOUR_MS as u64);
        // 0.5 * 2 * 1.5 * 1.2
        assert_eq!(accrual.claimable, dec!(1.8));
    }

    #[test]
    fn test_progress_past_cycle_end_is_capped_at_100() {
        let info = unit_info();
        let state = state_claimed_at(NOW - 10 * HOUR_MS);
        let accrual = compute_accrual(Some(&info), Some(&state), NOW).unwrap();
        assert_eq!(accrual.progress, dec!(100));
        assert_eq!(accrual.claimable, dec!(1));
    }

    #[test]
    fn test_claimable_rounds_half_away_from_zero() {
        let info = unit_info();
        // 1/3 of an hour elapsed -> 0.333333...
        let state = state_claimed_at(NOW - HOUR_MS / 3);
        let accrual = compute_accrual(Some(&info), Some(&state), NOW).unwrap();
        assert_eq!(accrual.claimable, dec!(0.33333));
        assert_eq!(accrual.progress_display(), "33.33%");
    }

    #[test]
    fn test_window_boost_applies_only_inside_window() {
        let mut info = unit_info();
        info.special_boost.push(SpecialBoost {
            kind: BoostKind::Window,
            rate: dec!(20000),
            start_time: (NOW - 1_000) as u64,
            duration: 2_000,
        });
        let state = AccountState {
            special_boost: Some(0),
            ..state_claimed_at(NOW - HOUR_MS)
        };

        let inside = compute_accrual(Some(&info), Some(&state), NOW).unwrap();
        assert_eq!(inside.claimable, dec!(2));

        let after = compute_accrual(Some(&info), Some(&state), NOW + 5_000).unwrap();
        assert_eq!(after.claimable, dec!(1));
    }

    #[test]
    fn test_triggered_boost_uses_account_trigger_time() {
        let mut info = unit_info();
        info.special_boost.push(SpecialBoost {
            kind: BoostKind::Triggered,
            rate: dec!(15000),
            start_time: 0,
            duration: 60_000,
        });
        let mut state = AccountState {
            special_boost: Some(0),
            special_boost_start_time: Some((NOW - 30_000) as u64),
            ..state_claimed_at(NOW - HOUR_MS)
        };

        let active = compute_accrual(Some(&info), Some(&state), NOW).unwrap();
        assert_eq!(active.claimable, dec!(1.5));

        state.special_boost_start_time = Some((NOW - 120_000) as u64);
        let expired = compute_accrual(Some(&info), Some(&state), NOW).unwrap();
        assert_eq!(expired.claimable, dec!(1));
    }

    #[test]
    fn test_unknown_boost_index_is_ignored() {
        let info = unit_info();
        let state = AccountState {
            special_boost: Some(9),
            ..state_claimed_at(NOW - HOUR_MS)
        };
        let accrual = compute_accrual(Some(&info), Some(&state), NOW).unwrap();
        assert_eq!(accrual.claimable, dec!(1));
    }

    #[test]
    fn test_missing_tier_is_error() {
        let info = unit_info();
        let state = AccountState {
            seafood: 7,
            ..state_claimed_at(NOW)
        };
        assert!(compute_accrual(Some(&info), Some(&state), NOW).is_err());
    }

    #[test]
    fn test_progress_monotonic_in_time() {
        let info = unit_info();
        let state = state_claimed_at(NOW);
        let mut last = Decimal::MIN;
        for step in 0..=24 {
            let now = NOW + step * HOUR_MS / 20;
            let accrual = compute_accrual(Some(&info), Some(&state), now).unwrap();
            assert!(accrual.progress >= last);
            last = accrual.progress;
        }
        assert_eq!(last, dec!(100));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn prop_progress_non_decreasing(
            fishing_time in 1u32..200_000,
            speed in 1u32..50_000,
            rate in 1u32..50_000,
            since_claim in -100_000i64..100_000_000,
            step in 0i64..10_000_000,
        ) {
            let info = GameInfo {
                boat_level: vec![BoatTier { fishing_time: Decimal::from(fishing_time), price_upgrade: None }],
                mesh_level: vec![MeshTier { speed: Decimal::from(speed), price_upgrade: None }],
                fish_type_level: vec![FishTypeTier { rate: Decimal::from(rate) }],
                special_boost: vec![],
                init_reward: Decimal::ZERO,
            };
            let state = state_claimed_at(NOW - since_claim);
            let earlier = compute_accrual(Some(&info), Some(&state), NOW).unwrap();
            let later = compute_accrual(Some(&info), Some(&state), NOW + step).unwrap();
            prop_assert!(later.progress >= earlier.progress);
            prop_assert!(later.claimable >= earlier.claimable);
            prop_assert!(later.time_remaining_ms <= earlier.time_remaining_ms);
            prop_assert!(earlier.progress >= Decimal::ZERO && later.progress <= dec!(100));
            prop_assert!(earlier.claimable >= Decimal::ZERO);
        }
    }
}
