//! Signature checker bridging the script interpreter to transaction data.
//!
//! Implements the interpreter's `TxContext` trait: computes the signature
//! digest for the input being verified, parses the DER signature and SEC1
//! public key, and verifies with ECDSA over secp256k1.

use btc_primitives::ec::{PrivateKey, PublicKey, Signature};
use btc_script::interpreter::{InterpreterError, InterpreterErrorCode, ScriptFlags, TxContext};
use btc_script::Script;

use crate::input::DEFAULT_SEQUENCE_NUMBER;
use crate::sighash;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Transaction context for signature verification.
///
/// Holds the transaction being verified and the satoshi amounts of the
/// outputs being spent, one per input.  Amounts are committed only by the
/// replay-protected digest; the legacy digest ignores them.
pub struct SignatureChecker<'a> {
    tx: &'a Transaction,
    input_amounts: &'a [u64],
    flags: ScriptFlags,
}

impl<'a> SignatureChecker<'a> {
    /// Create a checker for `tx`.
    ///
    /// `input_amounts[i]` must hold the satoshi value of the output spent
    /// by input `i`.
    pub fn new(tx: &'a Transaction, input_amounts: &'a [u64], flags: ScriptFlags) -> Self {
        SignatureChecker {
            tx,
            input_amounts,
            flags,
        }
    }
}

impl TxContext for SignatureChecker<'_> {
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        sighash_flag: u32,
    ) -> Result<bool, InterpreterError> {
        if input_idx >= self.tx.inputs.len() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidIndex,
                format!(
                    "input index {} out of range (tx has {} inputs)",
                    input_idx,
                    self.tx.inputs.len()
                ),
            ));
        }
        let amount = self.input_amounts.get(input_idx).copied().ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidIndex,
                format!("no source amount for input {}", input_idx),
            )
        })?;

        if full_sig.is_empty() {
            return Ok(false);
        }
        let der = &full_sig[..full_sig.len() - 1];

        let digest = sighash::signature_hash(
            self.tx,
            input_idx,
            sub_script,
            sighash_flag,
            amount,
            self.flags,
        )
        .map_err(|e| {
            InterpreterError::new(InterpreterErrorCode::Internal, format!("sighash: {}", e))
        })?;

        let sig = match Signature::from_der(der) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        let public_key = match PublicKey::from_bytes(pub_key) {
            Ok(pk) => pk,
            Err(_) => return Ok(false),
        };

        Ok(sig.verify(&digest, &public_key))
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time
    }

    fn tx_version(&self) -> u32 {
        self.tx.version
    }

    fn input_sequence(&self, input_idx: usize) -> u32 {
        self.tx
            .inputs
            .get(input_idx)
            .map_or(DEFAULT_SEQUENCE_NUMBER, |i| i.sequence_number)
    }
}

/// Produce a script signature `<DER sig || sighash byte>` for an input.
///
/// Computes the digest with the same algorithm selection as verification,
/// signs it with `priv_key`, and appends the low byte of `sighash_type`.
pub fn sign_input(
    tx: &Transaction,
    input_index: usize,
    sub_script: &Script,
    sighash_type: u32,
    satoshis: u64,
    flags: ScriptFlags,
    priv_key: &PrivateKey,
) -> Result<Vec<u8>, TransactionError> {
    let digest = sighash::signature_hash(tx, input_index, sub_script, sighash_type, satoshis, flags)?;
    let sig = priv_key.sign(&digest)?;
    let mut full_sig = sig.to_der();
    full_sig.push(sighash_type as u8);
    Ok(full_sig)
}
