use remit_core::{AccountId, Amount};

use crate::error::EscrowError;

/// Outbound value movement provided by the host ledger.
///
/// The ledger calls `pay` only after an entry has been moved to its terminal
/// status and its lock released. Implementations may read ledger totals and
/// statuses; mutating entry points and `inspect` fail with
/// [`EscrowError::Reentrancy`].
pub trait ValueTransfer: Send + Sync {
    /// Move `amount` out of escrow custody to `to`.
    ///
    /// An error aborts the surrounding claim or refund, which is rolled back.
    fn pay(&self, to: &AccountId, amount: Amount) -> Result<(), EscrowError>;
}
