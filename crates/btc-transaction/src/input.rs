//! Transaction input referencing a previous output.
//!
//! Contains the source transaction ID, output index, unlocking script,
//! and sequence number.  Provides binary serialization/deserialization
//! following the Bitcoin wire format.

use btc_primitives::util::{ByteReader, ByteWriter, VarInt};
use btc_script::Script;

use crate::TransactionError;

/// Default sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// A single input in a transaction.
///
/// Each input references an output from a previous transaction by its
/// transaction ID (`source_txid`) and output index (`source_index`).
/// The `unlocking_script` (scriptSig) supplies the data required to satisfy
/// the referenced output's locking script.
///
/// # Wire format
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | source_txid        | 32 bytes (LE)    |
/// | source_index       | 4 bytes (LE)     |
/// | script length      | VarInt           |
/// | unlocking_script   | variable         |
/// | sequence_number    | 4 bytes (LE)     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// The 32-byte transaction ID of the output being spent, in internal
    /// (little-endian) byte order.
    pub source_txid: [u8; 32],

    /// Index of the output within the source transaction.
    pub source_index: u32,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence_number: u32,

    /// The unlocking script (scriptSig) that proves authorization.
    /// `None` when the input has not yet been signed.
    pub unlocking_script: Option<Script>,
}

impl TransactionInput {
    /// Create a new `TransactionInput` with default values.
    ///
    /// The source txid is zeroed, output index is 0, sequence is finalized,
    /// and no unlocking script is set.
    pub fn new() -> Self {
        TransactionInput {
            source_txid: [0u8; 32],
            source_index: 0,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: None,
        }
    }

    /// Deserialize a `TransactionInput` from a `ByteReader`.
    ///
    /// Reads the standard wire format: 32-byte txid, 4-byte output index,
    /// varint-prefixed unlocking script, and 4-byte sequence number.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;
        let mut source_txid = [0u8; 32];
        source_txid.copy_from_slice(txid_bytes);

        let source_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        let unlocking_script = if script_bytes.is_empty() {
            None
        } else {
            Some(Script::from_bytes(script_bytes))
        };

        Ok(TransactionInput {
            source_txid,
            source_index,
            sequence_number,
            unlocking_script,
        })
    }

    /// Serialize this `TransactionInput` into a `ByteWriter`.
    ///
    /// Writes the standard wire format: txid, output index, varint script
    /// length, script bytes, and sequence number.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_index);

        match &self.unlocking_script {
            Some(script) => {
                let script_bytes = script.to_bytes();
                writer.write_varint(VarInt::from(script_bytes.len()));
                writer.write_bytes(script_bytes);
            }
            None => {
                writer.write_varint(VarInt::from(0u64));
            }
        }

        writer.write_u32_le(self.sequence_number);
    }

    /// Serialize this input to a byte vector, optionally replacing its
    /// unlocking script.
    ///
    /// If `script_override` is `Some`, those bytes are written in place of
    /// the stored unlocking script.  If it is `None`, a zero-length script
    /// is written.  This is used when constructing legacy signature
    /// preimages, where the signed input carries the subscript and every
    /// other input carries an empty script.
    pub fn to_bytes_cleared(&self, script_override: Option<&[u8]>) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_index);

        match script_override {
            Some(bytes) => {
                writer.write_varint(VarInt::from(bytes.len()));
                writer.write_bytes(bytes);
            }
            None => writer.write_varint(VarInt::from(0u64)),
        }

        writer.write_u32_le(self.sequence_number);
        writer.into_bytes()
    }

    /// Whether this input is the null outpoint used by coinbase
    /// transactions: an all-zero txid with output index `0xFFFFFFFF`.
    pub fn is_null(&self) -> bool {
        self.source_txid == [0u8; 32] && self.source_index == 0xFFFF_FFFF
    }
}

impl Default for TransactionInput {
    fn default() -> Self {
        Self::new()
    }
}
