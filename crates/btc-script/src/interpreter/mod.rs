//! Full Bitcoin script interpreter.
//!
//! Executes locking and unlocking scripts to verify transaction inputs,
//! supporting all standard opcodes and verification flags.
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate directly to avoid
//! circular dependencies. Instead, callers provide a [`TxContext`] trait
//! implementation that handles signature hash computation and verification.
//!
//! # Example
//!
//! ```ignore
//! use btc_script::interpreter::{Engine, ScriptFlags};
//!
//! let engine = Engine::new();
//! engine.execute(
//!     &unlocking_script,
//!     &locking_script,
//!     ScriptFlags::BIP16 | ScriptFlags::VERIFY_DER_SIGNATURES,
//!     None, // no tx context needed for simple scripts
//!     0,
//! )?;
//! ```

pub mod config;
pub mod error;
pub mod flags;
pub mod parsed_opcode;
pub mod scriptnum;
pub mod stack;
pub mod thread;

mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;

pub use config::Config;
pub use error::{InterpreterError, InterpreterErrorCode};
pub use flags::ScriptFlags;
pub use parsed_opcode::{ParsedOpcode, ParsedScript};
pub use scriptnum::ScriptNumber;
pub use stack::Stack;

use crate::Script;
use thread::Thread;

/// Transaction context trait - provides signature verification without
/// a circular dependency on the transaction crate.
///
/// Implementors provide the transaction data needed for OP_CHECKSIG,
/// OP_CHECKMULTISIG, OP_CHECKLOCKTIMEVERIFY, and OP_CHECKSEQUENCEVERIFY.
pub trait TxContext {
    /// Verify a signature against a public key for the given input.
    ///
    /// `full_sig` includes the sighash flag byte at the end.
    /// `pub_key` is the public key bytes.
    /// `sub_script` is the relevant portion of the locking script.
    /// `input_idx` is the input being verified.
    /// `sighash_flag` is the sighash type.
    ///
    /// Returns Ok(true) if valid, Ok(false) if invalid, Err on failure.
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        sighash_flag: u32,
    ) -> Result<bool, InterpreterError>;

    /// Get the transaction lock time.
    fn lock_time(&self) -> u32;

    /// Get the transaction version.
    fn tx_version(&self) -> u32;

    /// Get the sequence number of the given input.
    fn input_sequence(&self, input_idx: usize) -> u32;
}

/// The script execution engine.
#[derive(Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }

    /// Execute unlocking + locking scripts.
    ///
    /// # Arguments
    /// * `unlocking_script` - The input's unlocking (signature) script.
    /// * `locking_script` - The output's locking (pubkey) script.
    /// * `flags` - Verification flags.
    /// * `tx_context` - Optional transaction context for checksig operations.
    /// * `input_idx` - The input index being verified.
    pub fn execute(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        let mut thread = Thread::new(
            unlocking_script,
            locking_script,
            flags,
            tx_context,
            input_idx,
        )?;
        thread.execute()
    }
}
