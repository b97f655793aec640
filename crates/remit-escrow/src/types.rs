use chrono::{DateTime, Utc};
use remit_core::{AccountId, Amount, Commitment, EscrowStatus};
use serde::{Deserialize, Serialize};

/// The host ledger's per-call envelope: who is calling, how much value is
/// attached, and the host's notion of "now" (block time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Caller identity as authenticated by the host.
    pub caller: AccountId,
    /// Value attached to the call, already moved into escrow custody by the host.
    pub value: Amount,
    /// Host timestamp for this call.
    pub timestamp: DateTime<Utc>,
}

impl CallContext {
    /// A call with no attached value.
    pub fn new(caller: AccountId, timestamp: DateTime<Utc>) -> Self {
        Self {
            caller,
            value: 0,
            timestamp,
        }
    }

    /// Attach value to the call.
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

/// An escrow entry as stored by the ledger.
///
/// Callers only ever receive clones; the ledger owns the canonical copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowEntry {
    /// Puzzle commitment (primary key).
    pub commitment: Commitment,
    /// Who funded the entry.
    pub depositor: AccountId,
    /// Locked amount, always non-zero.
    pub amount: Amount,
    /// Host time of the deposit.
    pub created_at: DateTime<Utc>,
    /// Earliest time at which the depositor may refund.
    pub expires_at: DateTime<Utc>,
    /// Current status.
    pub status: EscrowStatus,
    /// Who received the funds, once settled.
    pub settled_by: Option<AccountId>,
    /// When the entry was settled.
    pub settled_at: Option<DateTime<Utc>>,
}

impl EscrowEntry {
    /// Whether the refund deadline has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Proof that an entry paid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Settled commitment.
    pub commitment: Commitment,
    /// Who received the value.
    pub payee: AccountId,
    /// Amount paid.
    pub amount: Amount,
    /// Final status (Claimed or Refunded).
    pub status: EscrowStatus,
    /// Host time of settlement.
    pub settled_at: DateTime<Utc>,
}

/// Serializable copy of the ledger's persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Every entry ever created, in commitment order.
    pub entries: Vec<EscrowEntry>,
    /// Contract-held balance at snapshot time.
    pub contract_balance: Amount,
}
