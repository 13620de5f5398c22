use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-account claim cycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CycleState {
    /// Waiting for the accrual cycle to complete
    Polling,
    /// Accrual reached 100%, claim not yet built
    Ready,
    /// Claim transaction in flight
    Claiming,
    /// Claim executed successfully
    ClaimOk,
    /// Claim rejected by simulation, failed on chain, or errored
    ClaimFailed,
    /// Upgrade transaction in flight
    Upgrading,
    /// Transfer transaction in flight
    Transferring,
}

impl CycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleState::Polling => "POLLING",
            CycleState::Ready => "READY",
            CycleState::Claiming => "CLAIMING",
            CycleState::ClaimOk => "CLAIM_OK",
            CycleState::ClaimFailed => "CLAIM_FAILED",
            CycleState::Upgrading => "UPGRADING",
            CycleState::Transferring => "TRANSFERRING",
        }
    }

    /// Check if this state can transition to another state
    pub fn can_transition_to(&self, target: CycleState) -> bool {
        use CycleState::*;

        match (self, target) {
            // From Polling
            (Polling, Polling) => true, // Not ready yet
            (Polling, Ready) => true,

            (Ready, Claiming) => true,

            // From Claiming
            (Claiming, ClaimOk) => true,
            (Claiming, ClaimFailed) => true,

            // From ClaimOk, upgrade and transfer are both optional
            (ClaimOk, Upgrading) => true,
            (ClaimOk, Transferring) => true,
            (ClaimOk, Polling) => true,

            (Upgrading, Transferring) => true,
            (Upgrading, Polling) => true,

            (Transferring, Polling) => true,

            (ClaimFailed, Polling) => true,

            // All other transitions are invalid
            _ => false,
        }
    }

    /// Get valid next states from current state
    pub fn valid_transitions(&self) -> Vec<CycleState> {
        use CycleState::*;

        match self {
            Polling => vec![Polling, Ready],
            Ready => vec![Claiming],
            Claiming => vec![ClaimOk, ClaimFailed],
            ClaimOk => vec![Upgrading, Transferring, Polling],
            Upgrading => vec![Transferring, Polling],
            Transferring => vec![Polling],
            ClaimFailed => vec![Polling],
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions_match_table() {
        use CycleState::*;
        for state in [
            Polling,
            Ready,
            Claiming,
            ClaimOk,
            ClaimFailed,
            Upgrading,
            Transferring,
        ] {
            for next in state.valid_transitions() {
                assert!(state.can_transition_to(next), "{} -> {}", state, next);
            }
        }
    }

    #[test]
    fn test_claim_cannot_be_skipped() {
        assert!(!CycleState::Ready.can_transition_to(CycleState::ClaimOk));
        assert!(!CycleState::Polling.can_transition_to(CycleState::Claiming));
        assert!(!CycleState::ClaimFailed.can_transition_to(CycleState::Upgrading));
        assert!(!CycleState::Transferring.can_transition_to(CycleState::Upgrading));
    }
}
