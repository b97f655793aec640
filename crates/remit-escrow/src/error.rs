use chrono::{DateTime, Utc};
use remit_core::{AccountId, Amount, Commitment, CoreError, EscrowStatus};
use remit_crypto::CryptoError;

/// Escrow-layer errors.
///
/// Every error is returned synchronously and leaves no partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum EscrowError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("commitment already funded: {0}")]
    DuplicateCommitment(Commitment),

    #[error("unknown commitment: {0}")]
    UnknownCommitment(Commitment),

    #[error("escrow {commitment} already settled (status {status})")]
    AlreadySettled {
        commitment: Commitment,
        status: EscrowStatus,
    },

    #[error("escrow {commitment} cannot be refunded before {expires_at}")]
    NotExpired {
        commitment: Commitment,
        expires_at: DateTime<Utc>,
    },

    #[error("caller not authorized: {0}")]
    NotAuthorized(AccountId),

    #[error("deposits are paused by the operator")]
    Paused,

    #[error("invalid factors: {0}")]
    InvalidFactors(String),

    #[error("reentrant call into the escrow ledger")]
    Reentrancy,

    #[error("value transfer failed: {0}")]
    TransferFailed(String),

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<CryptoError> for EscrowError {
    fn from(err: CryptoError) -> Self {
        Self::InvalidFactors(err.to_string())
    }
}

/// Stable, externally visible classification of an [`EscrowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidAmount,
    DuplicateCommitment,
    UnknownCommitment,
    AlreadySettled,
    NotExpired,
    NotAuthorized,
    Paused,
    InvalidInput,
    Reentrancy,
    TransferFailed,
}

impl EscrowError {
    /// Classify this error for callers outside the engine.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_) => ErrorKind::InvalidAmount,
            Self::DuplicateCommitment(_) => ErrorKind::DuplicateCommitment,
            Self::UnknownCommitment(_) => ErrorKind::UnknownCommitment,
            Self::AlreadySettled { .. } => ErrorKind::AlreadySettled,
            Self::NotExpired { .. } => ErrorKind::NotExpired,
            Self::NotAuthorized(_) => ErrorKind::NotAuthorized,
            Self::Paused => ErrorKind::Paused,
            Self::InvalidFactors(_)
            | Self::InvalidConfig(_)
            | Self::InvalidSnapshot(_)
            | Self::Core(_) => ErrorKind::InvalidInput,
            Self::Reentrancy => ErrorKind::Reentrancy,
            Self::TransferFailed(_) | Self::InsufficientBalance { .. } => {
                ErrorKind::TransferFailed
            }
        }
    }
}
