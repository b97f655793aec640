//! Host-side adapters for running the engine outside a real ledger.

pub mod internal;

pub use internal::{InMemoryBank, LocalHost};
