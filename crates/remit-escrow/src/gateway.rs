//! Public entry points of the escrow engine.
//!
//! The gateway validates call envelopes, recomputes commitments from revealed
//! factors and applies access rules, then hands off to the [`EscrowLedger`].
//! It holds no escrow state of its own.

use remit_core::{
    window_from_secs, AccountId, Amount, ClaimPolicy, Commitment, EscrowConfig, Factor, PaymentId,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::access::AccessControl;
use crate::error::EscrowError;
use crate::events::{EscrowEvent, EventLog, EventRecord};
use crate::ledger::EscrowLedger;
use crate::traits::ValueTransfer;
use crate::types::{CallContext, EscrowEntry, Payout};

pub struct SettlementGateway {
    ledger: EscrowLedger,
    access: AccessControl,
    events: Arc<EventLog>,
    claim_policy: ClaimPolicy,
    refund_window_secs: AtomicU64,
}

impl SettlementGateway {
    /// Build an engine administered by `operator` that pays out through `transfer`.
    pub fn new(
        operator: AccountId,
        config: &EscrowConfig,
        transfer: Arc<dyn ValueTransfer>,
    ) -> Result<Self, EscrowError> {
        config.validate()?;
        let events = Arc::new(EventLog::new(config.event_capacity));
        let ledger = EscrowLedger::new(transfer, events);
        Ok(Self::assemble(operator, config, ledger))
    }

    /// Build an engine around an existing ledger, e.g. one restored with
    /// [`EscrowLedger::from_snapshot`]. Admin events go to the ledger's log.
    pub fn with_ledger(
        operator: AccountId,
        config: &EscrowConfig,
        ledger: EscrowLedger,
    ) -> Result<Self, EscrowError> {
        config.validate()?;
        Ok(Self::assemble(operator, config, ledger))
    }

    fn assemble(operator: AccountId, config: &EscrowConfig, ledger: EscrowLedger) -> Self {
        tracing::info!(
            operator = %operator,
            refund_window_secs = config.refund_window_secs,
            claim_policy = ?config.claim_policy,
            "settlement gateway initialized"
        );
        Self {
            events: Arc::clone(ledger.events()),
            ledger,
            access: AccessControl::new(operator),
            claim_policy: config.claim_policy,
            refund_window_secs: AtomicU64::new(config.refund_window_secs),
        }
    }

    /// Lock the value attached to `ctx` against `commitment`.
    ///
    /// `amount` is what the caller intends to lock; it must be non-zero and
    /// match the attached value exactly.
    pub fn deposit(
        &self,
        ctx: &CallContext,
        commitment: Commitment,
        amount: Amount,
    ) -> Result<EscrowEntry, EscrowError> {
        if amount == 0 {
            return Err(EscrowError::InvalidAmount(
                "deposit amount must be greater than zero".into(),
            ));
        }
        if ctx.value != amount {
            tracing::debug!(
                %commitment,
                declared = amount,
                attached = ctx.value,
                "deposit rejected: attached value mismatch"
            );
            return Err(EscrowError::InvalidAmount(format!(
                "attached value {} does not match declared amount {}",
                ctx.value, amount
            )));
        }
        if self.access.is_paused() {
            return Err(EscrowError::Paused);
        }

        let window = window_from_secs(self.refund_window_secs());
        self.ledger
            .deposit(commitment, ctx.caller.clone(), amount, ctx.timestamp, window)
    }

    /// Reveal the factors of a puzzle and collect its funds.
    ///
    /// The payout always goes to the caller.
    pub fn claim(
        &self,
        ctx: &CallContext,
        recipient: &AccountId,
        factors: &[Factor],
        payment_id: &PaymentId,
    ) -> Result<Payout, EscrowError> {
        ensure_no_value(ctx)?;
        if factors.is_empty() {
            return Err(EscrowError::InvalidFactors(
                "at least one factor is required".into(),
            ));
        }

        let commitment = remit_crypto::build_commitment(recipient, factors, payment_id)?;

        if self.claim_policy == ClaimPolicy::RecipientOnly && ctx.caller != *recipient {
            tracing::debug!(
                %commitment,
                caller = %ctx.caller,
                "claim rejected: caller is not the bound recipient"
            );
            return Err(EscrowError::NotAuthorized(ctx.caller.clone()));
        }

        self.ledger.claim(&commitment, &ctx.caller, ctx.timestamp)
    }

    /// Return an expired deposit to its depositor.
    pub fn refund(&self, ctx: &CallContext, commitment: &Commitment) -> Result<Payout, EscrowError> {
        ensure_no_value(ctx)?;
        self.ledger.refund(commitment, &ctx.caller, ctx.timestamp)
    }

    pub fn inspect(&self, commitment: &Commitment) -> Result<EscrowEntry, EscrowError> {
        self.ledger.inspect(commitment)
    }

    /// Compute the commitment a depositor should fund.
    pub fn build_commitment(
        &self,
        recipient: &AccountId,
        factors: &[Factor],
        payment_id: &PaymentId,
    ) -> Result<Commitment, EscrowError> {
        Ok(remit_crypto::build_commitment(recipient, factors, payment_id)?)
    }

    /// Suspend new deposits. Claims and refunds keep working.
    pub fn pause(&self, ctx: &CallContext) -> Result<(), EscrowError> {
        ensure_no_value(ctx)?;
        self.access.ensure_operator(&ctx.caller)?;
        if self.access.set_paused(true) {
            self.events.emit(
                EscrowEvent::Paused {
                    operator: ctx.caller.clone(),
                },
                ctx.timestamp,
            );
            tracing::info!(operator = %ctx.caller, "deposits paused");
        }
        Ok(())
    }

    pub fn unpause(&self, ctx: &CallContext) -> Result<(), EscrowError> {
        ensure_no_value(ctx)?;
        self.access.ensure_operator(&ctx.caller)?;
        if self.access.set_paused(false) {
            self.events.emit(
                EscrowEvent::Unpaused {
                    operator: ctx.caller.clone(),
                },
                ctx.timestamp,
            );
            tracing::info!(operator = %ctx.caller, "deposits resumed");
        }
        Ok(())
    }

    /// Change the refund window applied to future deposits.
    pub fn set_refund_window(&self, ctx: &CallContext, secs: u64) -> Result<(), EscrowError> {
        ensure_no_value(ctx)?;
        self.access.ensure_operator(&ctx.caller)?;
        if secs == 0 {
            return Err(EscrowError::InvalidConfig(
                "refund window must be greater than zero".into(),
            ));
        }

        let old_secs = self.refund_window_secs.swap(secs, Ordering::SeqCst);
        self.events.emit(
            EscrowEvent::RefundWindowChanged {
                operator: ctx.caller.clone(),
                old_secs,
                new_secs: secs,
            },
            ctx.timestamp,
        );
        tracing::info!(operator = %ctx.caller, old_secs, new_secs = secs, "refund window changed");
        Ok(())
    }

    pub fn operator(&self) -> &AccountId {
        self.access.operator()
    }

    pub fn is_paused(&self) -> bool {
        self.access.is_paused()
    }

    pub fn refund_window_secs(&self) -> u64 {
        self.refund_window_secs.load(Ordering::SeqCst)
    }

    pub fn claim_policy(&self) -> ClaimPolicy {
        self.claim_policy
    }

    pub fn contract_balance(&self) -> Amount {
        self.ledger.contract_balance()
    }

    pub fn ledger(&self) -> &EscrowLedger {
        &self.ledger
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Live feed of event records.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }
}

fn ensure_no_value(ctx: &CallContext) -> Result<(), EscrowError> {
    if ctx.value != 0 {
        return Err(EscrowError::InvalidAmount(format!(
            "call does not accept value, {} attached",
            ctx.value
        )));
    }
    Ok(())
}
