//! Persistence
//!
//! Only the outcome log is written; all game state lives on chain.

pub mod outcome_log;

pub use outcome_log::{OutcomeLog, OutcomeRecord, OutcomeTag};
