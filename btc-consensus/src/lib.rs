#![deny(missing_docs)]

//! Bitcoin consensus core.
//!
//! Re-exports the Script interpreter, signature-hash algorithms, and
//! transaction verifier for convenient single-crate usage.

pub use btc_primitives as primitives;
pub use btc_script as script;
pub use btc_transaction as transaction;
