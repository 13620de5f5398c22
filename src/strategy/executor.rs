//! Transaction submission
//!
//! Every transaction is signed, dry-run and only then executed. A dry run
//! that does not report `success` never reaches the network.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::adapters::chain::ChainClient;
use crate::domain::TransactionRequest;
use crate::error::Result;
use crate::signing::TransactionSigner;

/// Result of one dry-run-then-submit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Executed with effects status `success`
    Success { digest: String },
    /// Dry run rejected the transaction; nothing was submitted
    SimulationFailed { reason: String },
    /// Submitted, but effects report anything other than `success`
    ExecutionFailed { status: String, digest: String },
}

impl TxOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Success { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            TxOutcome::Success { digest } => format!("success ({})", digest),
            TxOutcome::SimulationFailed { reason } => format!("simulation failed: {}", reason),
            TxOutcome::ExecutionFailed { status, digest } => {
                format!("execution failed: {} ({})", status, digest)
            }
        }
    }
}

/// Signs, simulates and submits transactions for one account
pub struct TransactionExecutor {
    chain: Arc<dyn ChainClient>,
    signer: Arc<dyn TransactionSigner>,
}

impl TransactionExecutor {
    pub fn new(chain: Arc<dyn ChainClient>, signer: Arc<dyn TransactionSigner>) -> Self {
        Self { chain, signer }
    }

    pub fn address(&self) -> &str {
        self.signer.address()
    }

    /// Sign `request`, dry-run it and submit it only if the dry run passed.
    ///
    /// The request is consumed: a retry has to build a new one.
    pub async fn execute(&self, request: TransactionRequest) -> Result<TxOutcome> {
        let start = Instant::now();
        let summary = request.summary();

        let signed = self.signer.sign(&request).await?;

        let simulated = self.chain.dry_run(&signed.tx_bytes).await?;
        if !simulated.is_success() {
            warn!("{} dry run rejected: {}", summary, simulated.describe());
            return Ok(TxOutcome::SimulationFailed {
                reason: simulated.describe(),
            });
        }
        debug!("{} dry run ok", summary);

        let result = self.chain.execute(&signed).await?;
        let outcome = match result.status {
            Some(status) if status.is_success() => TxOutcome::Success {
                digest: result.digest,
            },
            Some(status) => TxOutcome::ExecutionFailed {
                status: status.describe(),
                digest: result.digest,
            },
            None => TxOutcome::ExecutionFailed {
                status: "no effects returned".to_string(),
                digest: result.digest,
            },
        };

        match &outcome {
            TxOutcome::Success { digest } => info!(
                "{} executed: {} ({}ms)",
                summary,
                digest,
                start.elapsed().as_millis()
            ),
            other => warn!("{} {}", summary, other.describe()),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::chain::ExecutionStatus;
    use crate::domain::TransactionBuilder;
    use crate::test_helpers::{EchoSigner, InMemoryChain};

    fn claim_request(sender: &str) -> TransactionRequest {
        let mut tx = TransactionBuilder::new();
        let claim = tx.object("0xclaim");
        let clock = tx.object("0x6");
        tx.move_call("0xpkg::game::claim", vec![claim, clock]);
        tx.build(sender, 10_000_000)
    }

    fn executor(chain: &Arc<InMemoryChain>) -> TransactionExecutor {
        TransactionExecutor::new(chain.clone(), Arc::new(EchoSigner::new("0xa11ce")))
    }

    #[tokio::test]
    async fn test_success_path_submits_once() {
        let chain = Arc::new(InMemoryChain::new());
        let outcome = executor(&chain)
            .execute(claim_request("0xa11ce"))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(chain.submitted_intents(), vec!["claim".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_dry_run_is_never_submitted() {
        let chain = Arc::new(InMemoryChain::new());
        chain.script_dry_run("claim", ExecutionStatus::failure("MoveAbort(1)"));
        let outcome = executor(&chain)
            .execute(claim_request("0xa11ce"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            TxOutcome::SimulationFailed {
                reason: "failure: MoveAbort(1)".to_string()
            }
        );
        assert!(chain.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_is_execution_failure() {
        let chain = Arc::new(InMemoryChain::new());
        chain.script_execution(
            "claim",
            ExecutionStatus {
                status: "Success".to_string(),
                error: None,
            },
        );
        let outcome = executor(&chain)
            .execute(claim_request("0xa11ce"))
            .await
            .unwrap();
        // only the exact lowercase marker counts
        assert!(matches!(outcome, TxOutcome::ExecutionFailed { .. }));
        assert_eq!(chain.submitted().len(), 1);
    }
}
