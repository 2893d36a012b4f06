//! Signature hash computation for transaction signing.
//!
//! Computes the digest that is signed by ECDSA to authorize spending a
//! transaction input.  Two algorithms are supported:
//!
//! - the original (legacy) algorithm, which serializes a cleared copy of
//!   the transaction with the subscript substituted at the signed input;
//! - the replay-protected BIP-143-shape algorithm selected by the FORKID
//!   bit, which commits to the value being spent.
//!
//! Both produce a double-SHA256 digest returned in byte-reversed
//! (display) order.  Neither mutates the live transaction.

use btc_primitives::hash::sha256d;
use btc_primitives::util::{ByteWriter, VarInt};
use btc_script::interpreter::ScriptFlags;
use btc_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: only sign the current input, allowing other
/// inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Replay-protection flag selecting the BIP-143-shape algorithm.
pub const SIGHASH_FORKID: u32 = 0x40;

/// The standard replay-protected sighash type: ALL | FORKID.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

// -----------------------------------------------------------------------
// Algorithm selection
// -----------------------------------------------------------------------

/// Compute the signature hash for a given input.
///
/// Selects the algorithm from the sighash type and the verification
/// flags: the replay-protected digest is used only when the FORKID bit
/// is present in `sighash_type` *and* `ENABLE_SIGHASH_FORKID` is set in
/// `flags`; otherwise the legacy digest is used.
///
/// # Arguments
/// * `tx`           - The transaction being signed.
/// * `input_index`  - Index of the input being signed.
/// * `sub_script`   - The subscript (scriptCode) of the output being spent.
/// * `sighash_type` - The combined sighash flags.
/// * `satoshis`     - The satoshi value of the output being spent
///   (committed only by the replay-protected algorithm).
/// * `flags`        - The verification flags in force.
///
/// # Returns
/// A 32-byte double-SHA256 digest in byte-reversed order.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    sub_script: &Script,
    sighash_type: u32,
    satoshis: u64,
    flags: ScriptFlags,
) -> Result<[u8; 32], TransactionError> {
    if sighash_type & SIGHASH_FORKID != 0 && flags.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID) {
        forkid_signature_hash(tx, input_index, sub_script, sighash_type, satoshis)
    } else {
        legacy_signature_hash(tx, input_index, sub_script, sighash_type)
    }
}

// -----------------------------------------------------------------------
// Legacy signature hash
// -----------------------------------------------------------------------

/// Compute the legacy signature hash for a given input.
///
/// Serializes a cleared copy of the transaction: the subscript (with
/// code separators removed) is substituted at the signed input and all
/// other input scripts are blanked.  NONE drops the outputs and zeroes
/// the other sequences; SINGLE truncates the outputs to the signed index,
/// blanking earlier ones with value `0xFFFFFFFFFFFFFFFF` and an empty
/// script; ANYONECANPAY serializes only the signed input.  The 4-byte LE
/// sighash type is appended, the result double-SHA256 hashed and
/// byte-reversed.
///
/// Historical quirk, preserved: when the base type is SINGLE and the
/// input index is not covered by an output, the digest is the literal
/// constant one (31 zero bytes then `0x01` in reversed order) rather
/// than an error.
pub fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    sub_script: &Script,
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    let base_type = sighash_type & SIGHASH_MASK;

    if base_type == SIGHASH_SINGLE && input_index >= tx.outputs.len() {
        let mut one = [0u8; 32];
        one[31] = 0x01;
        return Ok(one);
    }

    let sub_script = sub_script.remove_code_separators();
    let sub_bytes = sub_script.to_bytes();
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;
    let zero_other_sequences = base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE;

    let mut writer = ByteWriter::with_capacity(256);
    writer.write_u32_le(tx.version);

    // Inputs, with the subscript at the signed position.
    if anyone_can_pay {
        writer.write_varint(VarInt::from(1u64));
        writer.write_bytes(&tx.inputs[input_index].to_bytes_cleared(Some(sub_bytes)));
    } else {
        writer.write_varint(VarInt::from(tx.inputs.len()));
        for (i, input) in tx.inputs.iter().enumerate() {
            if i == input_index {
                writer.write_bytes(&input.to_bytes_cleared(Some(sub_bytes)));
            } else if zero_other_sequences {
                let mut cleared = input.clone();
                cleared.sequence_number = 0;
                writer.write_bytes(&cleared.to_bytes_cleared(None));
            } else {
                writer.write_bytes(&input.to_bytes_cleared(None));
            }
        }
    }

    // Outputs, per the base type.
    match base_type {
        SIGHASH_NONE => {
            writer.write_varint(VarInt::from(0u64));
        }
        SIGHASH_SINGLE => {
            writer.write_varint(VarInt::from(input_index + 1));
            // Earlier outputs are blanked: max value, empty script.
            for _ in 0..input_index {
                writer.write_u64_le(0xFFFF_FFFF_FFFF_FFFF);
                writer.write_varint(VarInt::from(0u64));
            }
            writer.write_bytes(&tx.outputs[input_index].bytes_for_sig_hash());
        }
        _ => {
            writer.write_varint(VarInt::from(tx.outputs.len()));
            for output in &tx.outputs {
                writer.write_bytes(&output.bytes_for_sig_hash());
            }
        }
    }

    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    let mut digest = sha256d(writer.as_bytes());
    digest.reverse();
    Ok(digest)
}

// -----------------------------------------------------------------------
// Replay-protected (FORKID) signature hash
// -----------------------------------------------------------------------

/// Compute the replay-protected signature hash for a given input.
///
/// This is the BIP-143-shape algorithm selected by the FORKID bit.  It
/// commits to the value being spent and uses a different serialization
/// order than the legacy algorithm.
pub fn forkid_signature_hash(
    tx: &Transaction,
    input_index: usize,
    sub_script: &Script,
    sighash_type: u32,
    satoshis: u64,
) -> Result<[u8; 32], TransactionError> {
    let preimage = calc_forkid_preimage(tx, input_index, sub_script, sighash_type, satoshis)?;
    let mut digest = sha256d(&preimage);
    digest.reverse();
    Ok(digest)
}

/// Compute the pre-image bytes for the replay-protected sighash before
/// double-hashing.
///
/// The preimage consists of:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes) - sha256d of all outpoints unless ANYONECANPAY
/// 3. hashSequence (32 bytes) - sha256d of all sequences unless ANYONECANPAY/SINGLE/NONE
/// 4. outpoint (32+4 bytes) - txid + vout of the input being signed
/// 5. scriptCode (varint + script) - the subscript being satisfied
/// 6. value (8 bytes LE) - satoshis of the output being spent
/// 7. nSequence (4 bytes LE) - sequence of the input being signed
/// 8. hashOutputs (32 bytes) - sha256d of all outputs or one output
/// 9. nLocktime (4 bytes LE)
/// 10. sighashType (4 bytes LE)
pub fn calc_forkid_preimage(
    tx: &Transaction,
    input_index: usize,
    sub_script: &Script,
    sighash_type: u32,
    satoshis: u64,
) -> Result<Vec<u8>, TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    let input = &tx.inputs[input_index];
    let base_type = sighash_type & SIGHASH_MASK;
    let sub_bytes = sub_script.to_bytes();

    let hash_prevouts = if sighash_type & SIGHASH_ANYONECANPAY == 0 {
        source_out_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_sequence = if sighash_type & SIGHASH_ANYONECANPAY == 0
        && base_type != SIGHASH_SINGLE
        && base_type != SIGHASH_NONE
    {
        sequence_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        outputs_hash(tx, -1)
    } else if base_type == SIGHASH_SINGLE && input_index < tx.outputs.len() {
        outputs_hash(tx, input_index as i32)
    } else {
        [0u8; 32]
    };

    let mut writer = ByteWriter::with_capacity(256);

    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);

    // Outpoint (txid + vout)
    writer.write_bytes(&input.source_txid);
    writer.write_u32_le(input.source_index);

    // scriptCode
    writer.write_varint(VarInt::from(sub_bytes.len()));
    writer.write_bytes(sub_bytes);

    // Value of the output being spent
    writer.write_u64_le(satoshis);

    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(writer.into_bytes())
}

// -----------------------------------------------------------------------
// Internal helper functions
// -----------------------------------------------------------------------

/// Double-SHA256 of all input outpoints concatenated.
///
/// Each outpoint is txid (32 bytes) + vout (4 bytes LE).
fn source_out_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write_bytes(&input.source_txid);
        writer.write_u32_le(input.source_index);
    }
    sha256d(writer.as_bytes())
}

/// Double-SHA256 of all input sequence numbers concatenated, 4 bytes LE each.
fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence_number);
    }
    sha256d(writer.as_bytes())
}

/// Double-SHA256 of serialized outputs.
///
/// If `n` is -1, all outputs are included.  If `n >= 0`, only the output
/// at that index is included (used for SIGHASH_SINGLE).
fn outputs_hash(tx: &Transaction, n: i32) -> [u8; 32] {
    let mut writer = ByteWriter::new();
    if n == -1 {
        for output in &tx.outputs {
            writer.write_bytes(&output.bytes_for_sig_hash());
        }
    } else {
        writer.write_bytes(&tx.outputs[n as usize].bytes_for_sig_hash());
    }
    sha256d(writer.as_bytes())
}
