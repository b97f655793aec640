pub mod error;
pub mod hashing;
pub mod puzzle;

pub use error::CryptoError;
pub use hashing::{hash, Digest};
pub use puzzle::{build_commitment, derive_payment_id, generate_payment_id, MAX_FACTORS};
