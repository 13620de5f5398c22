//! Append-only, human-readable log of cycle outcomes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeTag {
    WaitingToClaim,
    ReadyToClaim,
    ClaimSucceeded,
    ClaimFailed,
    ClaimErrored,
    UpgradeSucceeded,
    UpgradeFailed,
    UpgradeInsufficientBalance,
    MaxLevelReached,
    TransferSucceeded,
    TransferFailed,
    TransferInsufficientBalance,
}

impl OutcomeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeTag::WaitingToClaim => "WAITING TO CLAIM",
            OutcomeTag::ReadyToClaim => "READY TO CLAIM",
            OutcomeTag::ClaimSucceeded => "SUCCESS TO CLAIM",
            OutcomeTag::ClaimFailed => "FAILED TO CLAIM",
            OutcomeTag::ClaimErrored => "FAILED TO CLAIM - ERROR THROW",
            OutcomeTag::UpgradeSucceeded => "SUCCESS TO UPGRADE",
            OutcomeTag::UpgradeFailed => "FAILED TO UPGRADE",
            OutcomeTag::UpgradeInsufficientBalance => "INSUFFICIENT BALANCE TO UPGRADE",
            OutcomeTag::MaxLevelReached => "MAX LEVEL REACHED",
            OutcomeTag::TransferSucceeded => "SUCCESS TO TRANSFER",
            OutcomeTag::TransferFailed => "FAILED TO TRANSFER",
            OutcomeTag::TransferInsufficientBalance => "INSUFFICIENT BALANCE TO TRANSFER",
        }
    }

    /// Waiting ticks are too frequent to persist
    pub fn is_persisted(&self) -> bool {
        !matches!(self, OutcomeTag::WaitingToClaim)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            OutcomeTag::ClaimFailed
                | OutcomeTag::ClaimErrored
                | OutcomeTag::UpgradeFailed
                | OutcomeTag::UpgradeInsufficientBalance
                | OutcomeTag::TransferFailed
                | OutcomeTag::TransferInsufficientBalance
        )
    }
}

impl fmt::Display for OutcomeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One account's status at the moment an outcome happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub timestamp: DateTime<Utc>,
    pub address: String,
    /// Native balance, whole tokens
    pub sui_balance: Decimal,
    /// Game token balance, whole tokens
    pub token_balance: Decimal,
    pub claimable: Decimal,
    pub progress: Decimal,
    pub tag: OutcomeTag,
    /// Error message or transaction digest
    pub detail: Option<String>,
}

impl OutcomeRecord {
    /// `[Address: ..][S : .. O : ..] Unclaimed Amount: .. ..% - TAG`
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "[Address: {}][S : {} O : {}] Unclaimed Amount: {:.5} {:.2}% - {}",
            self.address,
            self.sui_balance,
            self.token_balance,
            self.claimable,
            self.progress,
            self.tag
        );
        if let Some(detail) = &self.detail {
            line.push(' ');
            line.push_str(detail);
        }
        line
    }

    pub fn log_line(&self) -> String {
        format!("[{}] {}\n", self.timestamp.to_rfc3339(), self.status_line())
    }
}

/// Outcome log file; appends are serialized across accounts
pub struct OutcomeLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl OutcomeLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record` if its tag is persisted. Returns whether a line was written.
    pub async fn append(&self, record: &OutcomeRecord) -> Result<bool> {
        if !record.tag.is_persisted() {
            return Ok(false);
        }

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(record.log_line().as_bytes()).await?;
        file.flush().await?;
        Ok(true)
    }

    /// Like [`append`](Self::append) but never fails the caller
    pub async fn record(&self, record: &OutcomeRecord) {
        if let Err(e) = self.append(record).await {
            warn!("Failed to write outcome log {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(tag: OutcomeTag) -> OutcomeRecord {
        OutcomeRecord {
            timestamp: Utc::now(),
            address: "0xa11ce".to_string(),
            sui_balance: dec!(1.5),
            token_balance: dec!(12.25),
            claimable: dec!(0.8),
            progress: dec!(100),
            tag,
            detail: None,
        }
    }

    #[test]
    fn test_status_line_format() {
        let line = record(OutcomeTag::ReadyToClaim).status_line();
        assert_eq!(
            line,
            "[Address: 0xa11ce][S : 1.5 O : 12.25] Unclaimed Amount: 0.80000 100.00% - READY TO CLAIM"
        );
    }

    #[test]
    fn test_detail_is_appended() {
        let mut r = record(OutcomeTag::ClaimErrored);
        r.detail = Some("RPC error -32000: boom".to_string());
        assert!(r
            .status_line()
            .ends_with("- FAILED TO CLAIM - ERROR THROW RPC error -32000: boom"));
    }

    #[tokio::test]
    async fn test_waiting_is_not_persisted() {
        let path = std::env::temp_dir().join(format!("trawl-outcomes-{}.txt", uuid::Uuid::new_v4()));
        let log = OutcomeLog::new(&path);

        assert!(!log.append(&record(OutcomeTag::WaitingToClaim)).await.unwrap());
        assert!(log.append(&record(OutcomeTag::ClaimSucceeded)).await.unwrap());
        assert!(log.append(&record(OutcomeTag::MaxLevelReached)).await.unwrap());

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.ok();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("SUCCESS TO CLAIM"));
        assert!(lines[1].ends_with("MAX LEVEL REACHED"));
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn test_failure_tags() {
        assert!(OutcomeTag::UpgradeInsufficientBalance.is_failure());
        assert!(!OutcomeTag::MaxLevelReached.is_failure());
        assert!(!OutcomeTag::ClaimSucceeded.is_failure());
    }
}
