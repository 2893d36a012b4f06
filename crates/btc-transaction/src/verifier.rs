//! Whole-transaction verification.
//!
//! Runs structural checks on a transaction, then executes the script
//! interpreter for every input against the referenced source outputs.

use std::collections::{HashMap, HashSet};

use btc_script::interpreter::{Engine, InterpreterError, ScriptFlags};
use btc_script::Script;

use crate::checker::SignatureChecker;
use crate::output::TransactionOutput;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Maximum number of satoshis that can ever exist (21 million coins).
pub const MAX_MONEY: u64 = 2_100_000_000_000_000;

/// Maximum serialized transaction size accepted by the verifier.
pub const MAX_TX_SIZE: usize = 1_000_000;

/// Source of previous outputs for verification.
pub trait OutputLookup {
    /// Find the output spent by `txid:index`, or `None` if unknown.
    fn find_output(&self, txid: &[u8; 32], index: u32) -> Option<&TransactionOutput>;
}

/// `HashMap`-backed `OutputLookup` implementation.
#[derive(Default)]
pub struct OutputMap {
    outputs: HashMap<([u8; 32], u32), TransactionOutput>,
}

impl OutputMap {
    pub fn new() -> Self {
        OutputMap {
            outputs: HashMap::new(),
        }
    }

    /// Register an output under its outpoint.
    pub fn insert(&mut self, txid: [u8; 32], index: u32, output: TransactionOutput) {
        self.outputs.insert((txid, index), output);
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl OutputLookup for OutputMap {
    fn find_output(&self, txid: &[u8; 32], index: u32) -> Option<&TransactionOutput> {
        self.outputs.get(&(*txid, index))
    }
}

/// Result of checking a single input.
#[derive(Debug, Clone)]
pub enum InputCheck {
    /// The unlocking script satisfied the source locking script.
    Valid,
    /// The input spends the null outpoint and was not script-checked.
    SkippedNull,
    /// The referenced source output was not found in the lookup.
    NoSuchOutput,
    /// Script execution failed.
    ScriptFailure(InterpreterError),
}

/// Per-input verification diagnostic.
#[derive(Debug, Clone)]
pub struct InputDiagnostic {
    pub input_index: usize,
    pub result: InputCheck,
}

/// Outcome of verifying a transaction.
///
/// `diagnostics` holds one entry for every input that was checked, in
/// order, including the failing input when `valid` is false.
#[derive(Debug)]
pub struct VerifyOutcome {
    pub valid: bool,
    pub diagnostics: Vec<InputDiagnostic>,
}

/// Transaction verifier.
#[derive(Default)]
pub struct TxVerifier {
    engine: Engine,
}

impl TxVerifier {
    pub fn new() -> Self {
        TxVerifier {
            engine: Engine::new(),
        }
    }

    /// Verify `tx` against the outputs it spends.
    ///
    /// Structural violations (no inputs, no outputs, duplicate outpoints,
    /// out-of-range values, oversized transaction) are reported as `Err`.
    /// Per-input script results are reported through `VerifyOutcome`,
    /// short-circuiting on the first failing input.
    pub fn verify(
        &self,
        tx: &Transaction,
        lookup: &dyn OutputLookup,
        flags: ScriptFlags,
    ) -> Result<VerifyOutcome, TransactionError> {
        self.check_structure(tx)?;

        let mut diagnostics = Vec::with_capacity(tx.inputs.len());

        // Resolve every source output up front; the checker needs the
        // amount table before the first input executes.
        let mut sources: Vec<Option<TransactionOutput>> = Vec::with_capacity(tx.inputs.len());
        for (i, input) in tx.inputs.iter().enumerate() {
            if input.is_null() {
                sources.push(None);
                continue;
            }
            match lookup.find_output(&input.source_txid, input.source_index) {
                Some(output) => sources.push(Some(output.clone())),
                None => {
                    diagnostics.push(InputDiagnostic {
                        input_index: i,
                        result: InputCheck::NoSuchOutput,
                    });
                    return Ok(VerifyOutcome {
                        valid: false,
                        diagnostics,
                    });
                }
            }
        }

        let amounts: Vec<u64> = sources
            .iter()
            .map(|s| s.as_ref().map_or(0, |o| o.satoshis))
            .collect();
        let checker = SignatureChecker::new(tx, &amounts, flags);

        for (i, input) in tx.inputs.iter().enumerate() {
            let source = match &sources[i] {
                Some(source) => source,
                None => {
                    diagnostics.push(InputDiagnostic {
                        input_index: i,
                        result: InputCheck::SkippedNull,
                    });
                    continue;
                }
            };

            let unlocking = input.unlocking_script.clone().unwrap_or_else(Script::new);
            match self.engine.execute(
                &unlocking,
                &source.locking_script,
                flags,
                Some(&checker),
                i,
            ) {
                Ok(()) => diagnostics.push(InputDiagnostic {
                    input_index: i,
                    result: InputCheck::Valid,
                }),
                Err(err) => {
                    diagnostics.push(InputDiagnostic {
                        input_index: i,
                        result: InputCheck::ScriptFailure(err),
                    });
                    return Ok(VerifyOutcome {
                        valid: false,
                        diagnostics,
                    });
                }
            }
        }

        Ok(VerifyOutcome {
            valid: true,
            diagnostics,
        })
    }

    /// Context-free structural checks.
    fn check_structure(&self, tx: &Transaction) -> Result<(), TransactionError> {
        if tx.inputs.is_empty() {
            return Err(TransactionError::InvalidTransaction(
                "transaction has no inputs".to_string(),
            ));
        }
        if tx.outputs.is_empty() {
            return Err(TransactionError::InvalidTransaction(
                "transaction has no outputs".to_string(),
            ));
        }

        let size = tx.size();
        if size > MAX_TX_SIZE {
            return Err(TransactionError::InvalidTransaction(format!(
                "transaction size {} exceeds maximum {}",
                size, MAX_TX_SIZE
            )));
        }

        let mut total: u64 = 0;
        for (i, output) in tx.outputs.iter().enumerate() {
            if output.satoshis > MAX_MONEY {
                return Err(TransactionError::InvalidTransaction(format!(
                    "output {} value {} exceeds maximum {}",
                    i, output.satoshis, MAX_MONEY
                )));
            }
            total = total.checked_add(output.satoshis).ok_or_else(|| {
                TransactionError::InvalidTransaction(
                    "total output value overflows".to_string(),
                )
            })?;
            if total > MAX_MONEY {
                return Err(TransactionError::InvalidTransaction(format!(
                    "total output value {} exceeds maximum {}",
                    total, MAX_MONEY
                )));
            }
        }

        let mut seen = HashSet::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            if !seen.insert((input.source_txid, input.source_index)) {
                return Err(TransactionError::InvalidTransaction(format!(
                    "duplicate outpoint {}:{}",
                    hex::encode(input.source_txid),
                    input.source_index
                )));
            }
        }

        Ok(())
    }
}
