//! Remit escrow engine
//!
//! Hash-locked remittance escrow: a depositor locks value against a puzzle
//! commitment, and whoever reveals the factors behind it collects the funds.
//! Unclaimed deposits return to their depositor once the refund window
//! elapses.

pub mod error;
pub mod types;
pub mod traits;
pub mod events;
pub mod ledger;
pub mod access;
pub mod gateway;
pub mod adapters;

pub use access::AccessControl;
pub use adapters::{InMemoryBank, LocalHost};
pub use error::{ErrorKind, EscrowError};
pub use events::{EscrowEvent, EventLog, EventRecord};
pub use gateway::SettlementGateway;
pub use ledger::EscrowLedger;
pub use traits::ValueTransfer;
pub use types::{CallContext, EscrowEntry, LedgerSnapshot, Payout};
