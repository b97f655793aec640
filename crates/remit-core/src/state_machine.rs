use std::fmt;

use crate::error::CoreError;

/// Lifecycle status of an escrow entry.
///
/// An entry that has never been funded has no status at all; absence from the
/// ledger is the `NonExistent` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EscrowStatus {
    /// Funded and awaiting a claim or a refund.
    Open,
    /// Paid out to whoever revealed the factors. Final state.
    Claimed,
    /// Returned to the depositor after expiry. Final state.
    Refunded,
}

impl EscrowStatus {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Claimed | Self::Refunded)
    }

    /// Whether value is still held by the escrow for this entry.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Claimed => write!(f, "Claimed"),
            Self::Refunded => write!(f, "Refunded"),
        }
    }
}

/// Actions that settle an open escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowAction {
    /// The factors were revealed.
    Claim,
    /// The depositor reclaimed the funds after expiry.
    Refund,
}

impl fmt::Display for EscrowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claim => write!(f, "claim"),
            Self::Refund => write!(f, "refund"),
        }
    }
}

/// Enforces the escrow lifecycle.
///
/// Valid transitions:
/// - Open → Claimed (Claim)
/// - Open → Refunded (Refund)
///
/// Claimed and Refunded are terminal.
pub struct EscrowStateMachine;

impl EscrowStateMachine {
    /// Attempt a transition. Returns the new status, or an error when the
    /// entry has already been settled.
    pub fn transition(
        current: EscrowStatus,
        action: EscrowAction,
    ) -> Result<EscrowStatus, CoreError> {
        let new_status = match (current, action) {
            (EscrowStatus::Open, EscrowAction::Claim) => EscrowStatus::Claimed,
            (EscrowStatus::Open, EscrowAction::Refund) => EscrowStatus::Refunded,
            _ => {
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    action,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_status,
            action = %action,
            "escrow status transition"
        );

        Ok(new_status)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: EscrowStatus, action: EscrowAction) -> bool {
        Self::transition(current, action).is_ok()
    }
}
