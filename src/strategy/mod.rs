//! Claim strategy
//!
//! - `calculations` - reward accrual, a pure function of game config and account state
//! - `coin_selector` - merge/split staging for token payments
//! - `executor` - dry-run then submit
//! - `claimer` - the per-account claim, upgrade and transfer loop

pub mod calculations;
pub mod claimer;
pub mod coin_selector;
pub mod executor;

pub use calculations::{compute_accrual, Accrual};
pub use claimer::{
    AccountSnapshot, AutoClaimer, AutoTransfer, Balances, ClaimerConfig, CycleReport,
    GameContract, TrackedAccount, TransferAmount,
};
pub use coin_selector::{select_coins, MERGE_BATCH_LIMIT};
pub use executor::{TransactionExecutor, TxOutcome};
