/// Transaction wire model, signature-hash algorithms, and verification.
///
/// Provides the Transaction type with inputs and outputs, binary/hex
/// serialization, legacy and replay-protected signature hashing, the
/// interpreter signature checker, and the whole-transaction verifier.

pub mod checker;
pub mod input;
pub mod output;
pub mod sighash;
pub mod transaction;
pub mod verifier;

mod error;
pub use checker::SignatureChecker;
pub use error::TransactionError;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use transaction::Transaction;
pub use verifier::{OutputLookup, OutputMap, TxVerifier};
