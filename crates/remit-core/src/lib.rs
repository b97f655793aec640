pub mod error;
pub mod types;
pub mod state_machine;
pub mod config;
pub mod telemetry;

pub use config::{window_from_secs, ClaimPolicy, EscrowConfig, LoggingConfig};
pub use error::CoreError;
pub use state_machine::{EscrowAction, EscrowStateMachine, EscrowStatus};
pub use types::{AccountId, Amount, Commitment, Factor, PaymentId};
