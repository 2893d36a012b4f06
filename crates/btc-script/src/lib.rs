//! Bitcoin script construction, parsing, and execution.
//!
//! Provides the [`Script`] value type, opcode tables, and the script
//! [`interpreter`] used for transaction verification.

pub mod chunk;
pub mod interpreter;
pub mod opcodes;
pub mod script;

mod error;

pub use chunk::ScriptChunk;
pub use error::ScriptError;
pub use script::Script;
