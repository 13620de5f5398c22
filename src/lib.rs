pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod signing;
pub mod strategy;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::AppConfig;
pub use error::{Result, TrawlError};
pub use strategy::{compute_accrual, select_coins, AutoClaimer, ClaimerConfig};
