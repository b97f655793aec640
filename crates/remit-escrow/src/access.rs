use remit_core::AccountId;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::EscrowError;

/// Operator identity and the deposit pause switch.
///
/// The operator is fixed for the lifetime of the engine.
#[derive(Debug)]
pub struct AccessControl {
    operator: AccountId,
    paused: AtomicBool,
}

impl AccessControl {
    pub fn new(operator: AccountId) -> Self {
        Self {
            operator,
            paused: AtomicBool::new(false),
        }
    }

    /// The privileged operator account.
    pub fn operator(&self) -> &AccountId {
        &self.operator
    }

    /// Fail with `NotAuthorized` unless `caller` is the operator.
    pub fn ensure_operator(&self, caller: &AccountId) -> Result<(), EscrowError> {
        if *caller != self.operator {
            tracing::warn!(caller = %caller, "admin call rejected: caller is not the operator");
            return Err(EscrowError::NotAuthorized(caller.clone()));
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Set the pause flag; returns whether it changed.
    pub(crate) fn set_paused(&self, paused: bool) -> bool {
        self.paused.swap(paused, Ordering::SeqCst) != paused
    }
}
