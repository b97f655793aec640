//! Audit events emitted on every escrow state change.
//!
//! Records are appended to an in-memory log that never drops entries, and
//! broadcast to live subscribers. Slow subscribers lag and lose the oldest
//! records; they can always catch up from [`EventLog::since`].

use chrono::{DateTime, Utc};
use remit_core::{AccountId, Amount, Commitment};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;

/// A state change visible to external auditors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowEvent {
    /// Value was locked against a commitment.
    Deposited {
        commitment: Commitment,
        depositor: AccountId,
        amount: Amount,
        expires_at: DateTime<Utc>,
    },
    /// The factors were revealed and the claimant was paid.
    Claimed {
        commitment: Commitment,
        depositor: AccountId,
        claimant: AccountId,
        amount: Amount,
    },
    /// The depositor took the funds back after expiry.
    Refunded {
        commitment: Commitment,
        depositor: AccountId,
        amount: Amount,
    },
    /// New deposits were suspended.
    Paused { operator: AccountId },
    /// New deposits were resumed.
    Unpaused { operator: AccountId },
    /// The refund window for future deposits changed.
    RefundWindowChanged {
        operator: AccountId,
        old_secs: u64,
        new_secs: u64,
    },
}

impl EscrowEvent {
    /// The commitment this event concerns, if any.
    pub fn commitment(&self) -> Option<&Commitment> {
        match self {
            Self::Deposited { commitment, .. }
            | Self::Claimed { commitment, .. }
            | Self::Refunded { commitment, .. } => Some(commitment),
            _ => None,
        }
    }
}

/// A logged event with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique record id (UUID v7, time-ordered).
    pub id: Uuid,
    /// Zero-based position in the log.
    pub sequence: u64,
    /// Host time of the call that produced the event.
    pub recorded_at: DateTime<Utc>,
    pub event: EscrowEvent,
}

/// Append-only event log with a live broadcast feed.
pub struct EventLog {
    records: RwLock<Vec<EventRecord>>,
    sender: broadcast::Sender<EventRecord>,
}

impl EventLog {
    /// Create an empty log whose broadcast channel buffers `capacity` records.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            records: RwLock::new(Vec::new()),
            sender,
        }
    }

    /// Append an event and notify subscribers.
    pub fn emit(&self, event: EscrowEvent, at: DateTime<Utc>) -> EventRecord {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let record = EventRecord {
            id: Uuid::now_v7(),
            sequence: records.len() as u64,
            recorded_at: at,
            event,
        };
        records.push(record.clone());
        drop(records);

        // No subscribers is not an error.
        let _ = self.sender.send(record.clone());
        tracing::trace!(sequence = record.sequence, "escrow event recorded");
        record
    }

    /// Subscribe to records emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Every record with `sequence >= from`.
    pub fn since(&self, from: u64) -> Vec<EventRecord> {
        let records = self
            .records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records
            .iter()
            .skip(from.min(records.len() as u64) as usize)
            .cloned()
            .collect()
    }

    /// Every record concerning `commitment`, oldest first.
    pub fn for_commitment(&self, commitment: &Commitment) -> Vec<EventRecord> {
        let records = self
            .records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records
            .iter()
            .filter(|r| r.event.commitment() == Some(commitment))
            .cloned()
            .collect()
    }

    /// Number of records in the log.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
