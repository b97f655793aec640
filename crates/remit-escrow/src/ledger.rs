use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use remit_core::{AccountId, Amount, Commitment, EscrowAction, EscrowStateMachine, EscrowStatus};
use std::cell::Cell;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::EscrowError;
use crate::events::{EscrowEvent, EventLog};
use crate::traits::ValueTransfer;
use crate::types::{EscrowEntry, LedgerSnapshot, Payout};

thread_local! {
    static IN_TRANSFER: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as executing an outbound transfer.
struct TransferScope;

impl TransferScope {
    fn enter() -> Self {
        IN_TRANSFER.with(|flag| flag.set(true));
        Self
    }
}

impl Drop for TransferScope {
    fn drop(&mut self) {
        IN_TRANSFER.with(|flag| flag.set(false));
    }
}

fn ensure_not_reentrant() -> Result<(), EscrowError> {
    if IN_TRANSFER.with(|flag| flag.get()) {
        return Err(EscrowError::Reentrancy);
    }
    Ok(())
}

/// Holds every escrow entry and the contract balance.
///
/// Each deposit, claim and refund checks and updates its entry under that
/// entry's write guard, so the Open check, the status transition and the
/// balance update form one indivisible step per commitment. The payout runs
/// after the guard is released, once the entry is already terminal.
/// Different commitments proceed in parallel.
///
/// Invariant: `contract_balance() == open_total()` whenever no call is in flight.
pub struct EscrowLedger {
    entries: DashMap<Commitment, EscrowEntry>,
    balance: Mutex<Amount>,
    transfer: Arc<dyn ValueTransfer>,
    events: Arc<EventLog>,
}

impl EscrowLedger {
    /// Create an empty ledger paying out through `transfer`.
    pub fn new(transfer: Arc<dyn ValueTransfer>, events: Arc<EventLog>) -> Self {
        Self {
            entries: DashMap::new(),
            balance: Mutex::new(0),
            transfer,
            events,
        }
    }

    /// Lock `amount` against `commitment` on behalf of `depositor`.
    ///
    /// The entry becomes refundable `refund_window` after `now`.
    pub fn deposit(
        &self,
        commitment: Commitment,
        depositor: AccountId,
        amount: Amount,
        now: DateTime<Utc>,
        refund_window: Duration,
    ) -> Result<EscrowEntry, EscrowError> {
        ensure_not_reentrant()?;

        if amount == 0 {
            return Err(EscrowError::InvalidAmount(
                "deposit amount must be greater than zero".into(),
            ));
        }

        let expires_at = now
            .checked_add_signed(refund_window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        match self.entries.entry(commitment) {
            Entry::Occupied(_) => {
                tracing::debug!(%commitment, "deposit rejected: commitment already funded");
                Err(EscrowError::DuplicateCommitment(commitment))
            }
            Entry::Vacant(slot) => {
                let mut balance = self.lock_balance();
                let new_balance = balance.checked_add(amount).ok_or_else(|| {
                    EscrowError::InvalidAmount("contract balance would overflow".into())
                })?;

                let entry = EscrowEntry {
                    commitment,
                    depositor,
                    amount,
                    created_at: now,
                    expires_at,
                    status: EscrowStatus::Open,
                    settled_by: None,
                    settled_at: None,
                };
                slot.insert(entry.clone());
                *balance = new_balance;
                drop(balance);

                self.events.emit(
                    EscrowEvent::Deposited {
                        commitment,
                        depositor: entry.depositor.clone(),
                        amount,
                        expires_at,
                    },
                    now,
                );
                tracing::info!(
                    %commitment,
                    depositor = %entry.depositor,
                    amount,
                    %expires_at,
                    "escrow deposited"
                );
                Ok(entry)
            }
        }
    }

    /// Pay an open entry to `claimant`.
    ///
    /// The caller has already proven knowledge of the factors by reproducing
    /// `commitment`; the ledger does not look at identities here.
    pub fn claim(
        &self,
        commitment: &Commitment,
        claimant: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Payout, EscrowError> {
        ensure_not_reentrant()?;

        let (amount, depositor) = {
            let mut guard = self
                .entries
                .get_mut(commitment)
                .ok_or(EscrowError::UnknownCommitment(*commitment))?;
            let entry = guard.value_mut();

            let next = EscrowStateMachine::transition(entry.status, EscrowAction::Claim)
                .map_err(|_| EscrowError::AlreadySettled {
                    commitment: *commitment,
                    status: entry.status,
                })?;

            let amount = self.finalize(entry, next, claimant, now)?;
            (amount, entry.depositor.clone())
        };

        let payout = self.pay_out(commitment, claimant, amount, EscrowStatus::Claimed, now)?;
        self.events.emit(
            EscrowEvent::Claimed {
                commitment: *commitment,
                depositor: depositor.clone(),
                claimant: claimant.clone(),
                amount,
            },
            now,
        );
        tracing::info!(
            %commitment,
            depositor = %depositor,
            claimant = %claimant,
            amount,
            "escrow claimed"
        );
        Ok(payout)
    }

    /// Return an expired open entry to its depositor.
    pub fn refund(
        &self,
        commitment: &Commitment,
        caller: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Payout, EscrowError> {
        ensure_not_reentrant()?;

        let (amount, depositor) = {
            let mut guard = self
                .entries
                .get_mut(commitment)
                .ok_or(EscrowError::UnknownCommitment(*commitment))?;
            let entry = guard.value_mut();

            let next = EscrowStateMachine::transition(entry.status, EscrowAction::Refund)
                .map_err(|_| EscrowError::AlreadySettled {
                    commitment: *commitment,
                    status: entry.status,
                })?;

            if entry.depositor != *caller {
                tracing::debug!(%commitment, caller = %caller, "refund rejected: not the depositor");
                return Err(EscrowError::NotAuthorized(caller.clone()));
            }

            if !entry.is_expired(now) {
                return Err(EscrowError::NotExpired {
                    commitment: *commitment,
                    expires_at: entry.expires_at,
                });
            }

            let depositor = entry.depositor.clone();
            let amount = self.finalize(entry, next, &depositor, now)?;
            (amount, depositor)
        };

        let payout = self.pay_out(commitment, &depositor, amount, EscrowStatus::Refunded, now)?;
        self.events.emit(
            EscrowEvent::Refunded {
                commitment: *commitment,
                depositor: depositor.clone(),
                amount,
            },
            now,
        );
        tracing::info!(
            %commitment,
            depositor = %depositor,
            amount,
            "escrow refunded"
        );
        Ok(payout)
    }

    /// Move `entry` to `next` and release its amount from the contract
    /// balance. Runs under the entry's write guard.
    fn finalize(
        &self,
        entry: &mut EscrowEntry,
        next: EscrowStatus,
        payee: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Amount, EscrowError> {
        let amount = entry.amount;
        {
            let mut balance = self.lock_balance();
            *balance = balance.checked_sub(amount).ok_or_else(|| {
                EscrowError::TransferFailed(format!(
                    "contract balance {} is below entry amount {}",
                    *balance, amount
                ))
            })?;
        }

        entry.status = next;
        entry.settled_by = Some(payee.clone());
        entry.settled_at = Some(now);
        Ok(amount)
    }

    /// Pay a finalized entry. Runs with the entry guard released; the entry is
    /// already terminal, so no other call can act on it meanwhile. A failed
    /// payment restores the entry and the balance.
    fn pay_out(
        &self,
        commitment: &Commitment,
        payee: &AccountId,
        amount: Amount,
        status: EscrowStatus,
        now: DateTime<Utc>,
    ) -> Result<Payout, EscrowError> {
        let paid = {
            let _scope = TransferScope::enter();
            self.transfer.pay(payee, amount)
        };

        if let Err(err) = paid {
            self.reopen(commitment, amount);
            tracing::warn!(
                %commitment,
                payee = %payee,
                amount,
                error = %err,
                "payout failed, escrow rolled back"
            );
            return Err(err);
        }

        Ok(Payout {
            commitment: *commitment,
            payee: payee.clone(),
            amount,
            status,
            settled_at: now,
        })
    }

    fn reopen(&self, commitment: &Commitment, amount: Amount) {
        // Entries are never removed, so the lookup only misses on a logic error.
        let Some(mut entry) = self.entries.get_mut(commitment) else {
            tracing::error!(%commitment, "finalized entry vanished before rollback");
            return;
        };
        entry.status = EscrowStatus::Open;
        entry.settled_by = None;
        entry.settled_at = None;

        let mut balance = self.lock_balance();
        *balance = balance.saturating_add(amount);
    }

    /// Handle to the audit log this ledger emits into.
    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// Read-only view of an entry.
    pub fn inspect(&self, commitment: &Commitment) -> Result<EscrowEntry, EscrowError> {
        ensure_not_reentrant()?;
        self.entries
            .get(commitment)
            .map(|entry| entry.clone())
            .ok_or(EscrowError::UnknownCommitment(*commitment))
    }

    /// Status of an entry, or `None` if it was never funded.
    pub fn status(&self, commitment: &Commitment) -> Option<EscrowStatus> {
        self.entries.get(commitment).map(|entry| entry.status)
    }

    /// Value currently held by the escrow.
    pub fn contract_balance(&self) -> Amount {
        *self.lock_balance()
    }

    /// Sum of amounts over all Open entries.
    pub fn open_total(&self) -> Amount {
        self.entries
            .iter()
            .filter(|entry| entry.status.is_open())
            .fold(0, |acc: Amount, entry| acc.saturating_add(entry.amount))
    }

    /// Open entries whose refund deadline has passed at `now`, soonest first.
    pub fn refundable(&self, now: DateTime<Utc>) -> Vec<EscrowEntry> {
        let mut due: Vec<EscrowEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.status.is_open() && entry.is_expired(now))
            .map(|entry| entry.clone())
            .collect();
        due.sort_by_key(|entry| entry.expires_at);
        due
    }

    /// Number of entries ever created.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the persisted state. Take it while no calls are in flight.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut entries: Vec<EscrowEntry> =
            self.entries.iter().map(|entry| entry.clone()).collect();
        entries.sort_by_key(|entry| entry.commitment);
        LedgerSnapshot {
            entries,
            contract_balance: self.contract_balance(),
        }
    }

    /// Rebuild a ledger from a snapshot, rejecting any snapshot that breaks
    /// the ledger's invariants.
    pub fn from_snapshot(
        snapshot: LedgerSnapshot,
        transfer: Arc<dyn ValueTransfer>,
        events: Arc<EventLog>,
    ) -> Result<Self, EscrowError> {
        let mut seen = HashSet::with_capacity(snapshot.entries.len());
        let mut open_total: Amount = 0;

        for entry in &snapshot.entries {
            if !seen.insert(entry.commitment) {
                return Err(EscrowError::InvalidSnapshot(format!(
                    "duplicate entry for commitment {}",
                    entry.commitment
                )));
            }
            if entry.amount == 0 {
                return Err(EscrowError::InvalidSnapshot(format!(
                    "entry {} has zero amount",
                    entry.commitment
                )));
            }
            if entry.expires_at < entry.created_at {
                return Err(EscrowError::InvalidSnapshot(format!(
                    "entry {} expires before it was created",
                    entry.commitment
                )));
            }
            let settled = entry.settled_by.is_some() && entry.settled_at.is_some();
            if entry.status.is_open() == settled {
                return Err(EscrowError::InvalidSnapshot(format!(
                    "entry {} has inconsistent settlement fields for status {}",
                    entry.commitment, entry.status
                )));
            }
            if entry.status.is_open() {
                open_total = open_total.checked_add(entry.amount).ok_or_else(|| {
                    EscrowError::InvalidSnapshot("open total overflows".into())
                })?;
            }
        }

        if open_total != snapshot.contract_balance {
            return Err(EscrowError::InvalidSnapshot(format!(
                "contract balance {} does not match open total {}",
                snapshot.contract_balance, open_total
            )));
        }

        let entries = DashMap::with_capacity(snapshot.entries.len());
        for entry in snapshot.entries {
            entries.insert(entry.commitment, entry);
        }

        tracing::info!(
            entries = entries.len(),
            contract_balance = open_total,
            "escrow ledger restored from snapshot"
        );

        Ok(Self {
            entries,
            balance: Mutex::new(open_total),
            transfer,
            events,
        })
    }

    fn lock_balance(&self) -> MutexGuard<'_, Amount> {
        self.balance
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
