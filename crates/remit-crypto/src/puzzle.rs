//! Hash-puzzle construction.
//!
//! A commitment is
//!
//! ```text
//! BLAKE3( "remit.commitment.v1"
//!       || lp(recipient) || recipient
//!       || u32_le(factor_count)
//!       || lp(f_1) || f_1 || ... || lp(f_n) || f_n
//!       || payment_id )
//! ```
//!
//! where `lp(x)` is the 4-byte little-endian length of `x`. Factors are hashed
//! in the order given. Anyone holding every factor can reproduce the value off
//! the engine.

use blake3::Hasher;
use remit_core::{AccountId, Commitment, Factor, PaymentId};

use crate::error::CryptoError;
use crate::hashing::{hash, len_prefix};

/// Upper bound on the number of factors in a single puzzle.
pub const MAX_FACTORS: usize = 16;

const COMMITMENT_DOMAIN: &[u8] = b"remit.commitment.v1";
const PAYMENT_ID_DOMAIN: &[u8] = b"remit.payment-id.v1";

/// Derive the commitment for `recipient`, `factors` and `payment_id`.
///
/// Pure and deterministic. Fails only on an empty or oversized factor list.
pub fn build_commitment(
    recipient: &AccountId,
    factors: &[Factor],
    payment_id: &PaymentId,
) -> Result<Commitment, CryptoError> {
    if factors.is_empty() {
        return Err(CryptoError::NoFactors);
    }
    if factors.len() > MAX_FACTORS {
        return Err(CryptoError::TooManyFactors {
            count: factors.len(),
            max: MAX_FACTORS,
        });
    }

    let mut h = Hasher::new();
    h.update(COMMITMENT_DOMAIN);
    h.update(&len_prefix(recipient.as_bytes().len()));
    h.update(recipient.as_bytes());
    h.update(&(factors.len() as u32).to_le_bytes());
    for factor in factors {
        h.update(&len_prefix(factor.len()));
        h.update(factor.as_bytes());
    }
    h.update(payment_id.as_bytes());

    Ok(Commitment::from_bytes(*h.finalize().as_bytes()))
}

/// A fresh random payment identifier.
pub fn generate_payment_id() -> PaymentId {
    PaymentId::from_bytes(rand::random::<[u8; 32]>())
}

/// Derive a payment identifier from a seed and a nonce (e.g. a block height),
/// so a depositor can reproduce it later without storing it.
pub fn derive_payment_id(seed: &[u8], nonce: u64) -> PaymentId {
    let mut input = Vec::with_capacity(PAYMENT_ID_DOMAIN.len() + 4 + seed.len() + 8);
    input.extend_from_slice(PAYMENT_ID_DOMAIN);
    input.extend_from_slice(&len_prefix(seed.len()));
    input.extend_from_slice(seed);
    input.extend_from_slice(&nonce.to_le_bytes());
    PaymentId::from_bytes(hash(&input))
}
