//! Script chunk parsing and encoding.
//!
//! A script chunk is either an opcode or a data push with its associated bytes.
//! This module handles decoding raw script bytes into structured chunks and
//! encoding push data with the correct OP_PUSHDATA prefix.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a Bitcoin script.
///
/// Each chunk is either a standalone opcode (like OP_DUP) or a data push
/// that carries the opcode byte and the pushed data bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes), this is the length.
    pub op: u8,
    /// The data payload, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Convert this chunk to its ASM string representation.
    ///
    /// Data push chunks are rendered as hex strings; non-push opcodes use
    /// their canonical OP_xxx name.
    pub fn to_asm_string(&self) -> String {
        if self.op > OP_0 && self.op <= OP_PUSHDATA4 {
            if let Some(ref data) = self.data {
                return hex::encode(data);
            }
        }
        opcode_to_string(self.op).to_string()
    }

    /// Serialize this chunk back to raw script bytes.
    ///
    /// Push chunks re-emit the exact opcode they were parsed with, so a
    /// non-minimal encoding survives a decode/encode round trip.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.op];
        if let Some(ref data) = self.data {
            match self.op {
                OP_PUSHDATA1 => out.push(data.len() as u8),
                OP_PUSHDATA2 => out.extend_from_slice(&(data.len() as u16).to_le_bytes()),
                OP_PUSHDATA4 => out.extend_from_slice(&(data.len() as u32).to_le_bytes()),
                _ => {}
            }
            out.extend_from_slice(data);
        }
        out
    }
}

/// Decode raw script bytes into a vector of `ScriptChunk` values.
///
/// Handles OP_DATA_1..OP_DATA_75 (direct push) and OP_PUSHDATA1/2/4
/// (extended push). All other bytes decode as standalone opcodes.
///
/// # Returns
/// A vector of parsed chunks, or a `ScriptError` if the data is truncated.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];

        match op {
            OP_PUSHDATA1 => {
                if bytes.len() < pos + 2 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = bytes[pos + 1] as usize;
                pos += 2;
                if bytes.len() < pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = bytes[pos..pos + length].to_vec();
                chunks.push(ScriptChunk { op, data: Some(data) });
                pos += length;
            }
            OP_PUSHDATA2 => {
                if bytes.len() < pos + 3 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = u16::from_le_bytes([bytes[pos + 1], bytes[pos + 2]]) as usize;
                pos += 3;
                if bytes.len() < pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = bytes[pos..pos + length].to_vec();
                chunks.push(ScriptChunk { op, data: Some(data) });
                pos += length;
            }
            OP_PUSHDATA4 => {
                if bytes.len() < pos + 5 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = u32::from_le_bytes([
                    bytes[pos + 1],
                    bytes[pos + 2],
                    bytes[pos + 3],
                    bytes[pos + 4],
                ]) as usize;
                pos += 5;
                if bytes.len() < pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = bytes[pos..pos + length].to_vec();
                chunks.push(ScriptChunk { op, data: Some(data) });
                pos += length;
            }
            0x01..=0x4b => {
                // Direct push: op byte is the number of bytes to push.
                let length = op as usize;
                if bytes.len() < pos + 1 + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = bytes[pos + 1..pos + 1 + length].to_vec();
                chunks.push(ScriptChunk { op, data: Some(data) });
                pos += 1 + length;
            }
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                pos += 1;
            }
        }
    }

    Ok(chunks)
}

/// Compute the OP_PUSHDATA prefix bytes for a data payload of the given length.
///
/// Returns the prefix that should be prepended to the data when encoding
/// a push operation into raw script bytes.
///
/// # Returns
/// A byte vector containing the minimal prefix, or an error if the data
/// is too large for the protocol.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= 75 {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFFFFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

/// Encode multiple data payloads into a single byte vector with push prefixes.
///
/// Each element in `parts` gets its own OP_PUSHDATA prefix based on length.
pub fn encode_push_datas(parts: &[&[u8]]) -> Result<Vec<u8>, ScriptError> {
    let mut result = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let prefix = push_data_prefix(part.len())
            .map_err(|_| ScriptError::PartTooBig(i))?;
        result.extend_from_slice(&prefix);
        result.extend_from_slice(part);
    }
    Ok(result)
}

/// Check whether `data` pushed with opcode `op` uses the shortest legal
/// encoding.
///
/// The minimal forms are: OP_0 for empty data, OP_1..OP_16 for single
/// bytes 1..16, OP_1NEGATE for 0x81, a direct push for 1-75 bytes,
/// OP_PUSHDATA1 for 76-255, and OP_PUSHDATA2 for 256-65535.
pub fn check_minimal_push(data: &[u8], op: u8) -> bool {
    if data.is_empty() {
        return op == OP_0;
    }
    if data.len() == 1 && (1..=16).contains(&data[0]) {
        return op == OP_1 + data[0] - 1;
    }
    if data.len() == 1 && data[0] == 0x81 {
        return op == OP_1NEGATE;
    }
    if data.len() <= 75 {
        return op as usize == data.len();
    }
    if data.len() <= 255 {
        return op == OP_PUSHDATA1;
    }
    if data.len() <= 65535 {
        return op == OP_PUSHDATA2;
    }
    op == OP_PUSHDATA4
}

#[cfg(test)]
mod tests {
    //! Tests for script chunk decoding and push data encoding.
    //!
    //! Covers decode_script with simple, complex, and malformed inputs,
    //! push_data_prefix boundary sizes, encode_push_datas roundtrips,
    //! and OP_PUSHDATA1/2/4 error cases.

    use super::*;

    // -----------------------------------------------------------------------
    // decode_script - basic cases
    // -----------------------------------------------------------------------

    /// Decode a script with three simple push chunks and verify count.
    #[test]
    fn test_decode_script_simple() {
        let script_hex = "05000102030401FF02ABCD";
        let bytes = hex::decode(script_hex).expect("valid hex");
        let parts = decode_script(&bytes).expect("should decode");
        assert_eq!(parts.len(), 3);
    }

    /// Decode and re-encode a simple script to verify roundtrip fidelity.
    #[test]
    fn test_decode_and_encode_roundtrip() {
        let script_hex = "05000102030401FF02ABCD";
        let bytes = hex::decode(script_hex).expect("valid hex");
        let parts = decode_script(&bytes).expect("should decode");
        assert_eq!(parts.len(), 3);

        let reencoded: Vec<u8> = parts.iter().flat_map(|p| p.to_bytes()).collect();
        assert_eq!(hex::encode(&reencoded), script_hex.to_lowercase());
    }

    /// Decode an empty byte slice returns an empty chunk vector.
    #[test]
    fn test_decode_script_empty() {
        let parts = decode_script(&[]).expect("should decode");
        assert!(parts.is_empty());
    }

    /// OP_RETURN decodes as a standalone opcode; trailing bytes continue
    /// to decode as chunks.
    #[test]
    fn test_decode_script_op_return() {
        let bytes = [OP_RETURN, 0x02, 0xaa, 0xbb];
        let parts = decode_script(&bytes).expect("should decode");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].op, OP_RETURN);
        assert_eq!(parts[0].data, None);
        assert_eq!(parts[1].data.as_deref(), Some(&[0xaa, 0xbb][..]));
    }

    /// Decode a complex multisig-like script with OP_PUSHDATA1 chunks.
    #[test]
    fn test_decode_script_complex() {
        let script_hex = "524c53ff0488b21e000000000000000000362f7a9030543db8751401c387d6a71e870f1895b3a62569d455e8ee5f5f5e5f03036624c6df96984db6b4e625b6707c017eb0e0d137cd13a0c989bfa77a4473fd000000004c53ff0488b21e0000000000000000008b20425398995f3c866ea6ce5c1828a516b007379cf97b136bffbdc86f75df14036454bad23b019eae34f10aff8b8d6d8deb18cb31354e5a169ee09d8a4560e8250000000052ae";
        let bytes = hex::decode(script_hex).expect("valid hex");
        let parts = decode_script(&bytes).expect("should decode");
        assert_eq!(parts.len(), 5);
    }

    // -----------------------------------------------------------------------
    // decode_script - error / truncation cases
    // -----------------------------------------------------------------------

    /// Verify that a truncated direct-push script returns DataTooSmall.
    #[test]
    fn test_decode_script_bad_parts() {
        // 0x05 says "push 5 bytes" but only 3 bytes follow
        let bytes = hex::decode("05000000").expect("valid hex");
        assert!(decode_script(&bytes).is_err());
    }

    /// Verify that a truncated OP_PUSHDATA1 script returns DataTooSmall.
    #[test]
    fn test_decode_script_invalid_pushdata1() {
        // OP_PUSHDATA1 = 0x4c, claims 5 bytes but only 4 follow
        let bytes = hex::decode("4c05000000").expect("valid hex");
        assert!(decode_script(&bytes).is_err());
    }

    /// Verify OP_PUSHDATA1 with a valid data payload decodes correctly.
    #[test]
    fn test_decode_script_pushdata1_valid() {
        let data = b"testing";
        let mut script_bytes = vec![OP_PUSHDATA1, data.len() as u8];
        script_bytes.extend_from_slice(data);
        let parts = decode_script(&script_bytes).expect("should decode");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].op, OP_PUSHDATA1);
        assert_eq!(parts[0].data.as_ref().unwrap(), data);
    }

    /// Verify OP_PUSHDATA1 alone (no length byte) returns an error.
    #[test]
    fn test_decode_script_pushdata1_missing_payload() {
        assert!(decode_script(&[OP_PUSHDATA1]).is_err());
    }

    /// Verify OP_PUSHDATA2 alone returns an error.
    #[test]
    fn test_decode_script_pushdata2_missing_payload() {
        assert!(decode_script(&[OP_PUSHDATA2]).is_err());
    }

    /// Verify OP_PUSHDATA4 alone returns an error.
    #[test]
    fn test_decode_script_pushdata4_missing_payload() {
        assert!(decode_script(&[OP_PUSHDATA4]).is_err());
    }

    // -----------------------------------------------------------------------
    // push_data_prefix boundary tests
    // -----------------------------------------------------------------------

    /// Verify push_data_prefix returns a 1-byte prefix for data <= 75 bytes.
    #[test]
    fn test_push_data_prefix_small() {
        assert_eq!(push_data_prefix(20).expect("should succeed"), vec![20u8]);
        assert_eq!(push_data_prefix(75).expect("should succeed"), vec![75u8]);
    }

    /// Verify push_data_prefix returns OP_PUSHDATA1 prefix for 76..=255 bytes.
    #[test]
    fn test_push_data_prefix_pushdata1() {
        assert_eq!(push_data_prefix(76).expect("ok"), vec![OP_PUSHDATA1, 76]);
        assert_eq!(push_data_prefix(255).expect("ok"), vec![OP_PUSHDATA1, 255]);
    }

    /// Verify push_data_prefix returns OP_PUSHDATA2 prefix for 256..=65535 bytes.
    #[test]
    fn test_push_data_prefix_pushdata2() {
        assert_eq!(
            push_data_prefix(256).expect("ok"),
            vec![OP_PUSHDATA2, 0x00, 0x01]
        );
        assert_eq!(
            push_data_prefix(65535).expect("ok"),
            vec![OP_PUSHDATA2, 0xFF, 0xFF]
        );
    }

    /// Verify push_data_prefix returns OP_PUSHDATA4 prefix for 65536+ bytes.
    #[test]
    fn test_push_data_prefix_pushdata4() {
        assert_eq!(
            push_data_prefix(65536).expect("ok"),
            vec![OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]
        );
    }

    // -----------------------------------------------------------------------
    // encode_push_datas
    // -----------------------------------------------------------------------

    /// Verify encode_push_datas concatenates multiple pushes correctly.
    #[test]
    fn test_encode_push_datas_multiple() {
        let parts: Vec<&[u8]> = vec![b"hello", b"world"];
        let encoded = encode_push_datas(&parts).expect("should encode");
        let expected = hex::decode("0568656c6c6f05776f726c64").expect("valid hex");
        assert_eq!(encoded, expected);
    }

    /// Verify encode_push_datas with an empty parts list returns empty bytes.
    #[test]
    fn test_encode_push_datas_empty() {
        let parts: Vec<&[u8]> = vec![];
        let encoded = encode_push_datas(&parts).expect("should encode");
        assert!(encoded.is_empty());
    }

    // -----------------------------------------------------------------------
    // check_minimal_push
    // -----------------------------------------------------------------------

    #[test]
    fn test_check_minimal_push() {
        assert!(check_minimal_push(&[], OP_0));
        assert!(!check_minimal_push(&[], 0x01));
        assert!(check_minimal_push(&[5], OP_5));
        assert!(!check_minimal_push(&[5], 0x01));
        assert!(check_minimal_push(&[0x81], OP_1NEGATE));
        assert!(check_minimal_push(&[0xAA; 20], 0x14));
        assert!(!check_minimal_push(&[0xAA; 20], OP_PUSHDATA1));
        assert!(check_minimal_push(&[0xAA; 80], OP_PUSHDATA1));
        assert!(check_minimal_push(&[0xAA; 300], OP_PUSHDATA2));
    }

    // -----------------------------------------------------------------------
    // ScriptChunk::to_asm_string
    // -----------------------------------------------------------------------

    /// Verify that a data-push chunk renders as hex in ASM output.
    #[test]
    fn test_chunk_to_asm_string_data() {
        let chunk = ScriptChunk {
            op: OP_DATA_20,
            data: Some(vec![0xAB; 20]),
        };
        assert_eq!(chunk.to_asm_string(), "ab".repeat(20));
    }

    /// Verify that a non-push opcode chunk renders as its OP_xxx name.
    #[test]
    fn test_chunk_to_asm_string_opcode() {
        let chunk = ScriptChunk { op: OP_DUP, data: None };
        assert_eq!(chunk.to_asm_string(), "OP_DUP");
    }

    /// A PUSHDATA1-encoded chunk re-serializes with the same opcode even
    /// when a shorter form exists.
    #[test]
    fn test_chunk_to_bytes_preserves_encoding() {
        let chunk = ScriptChunk {
            op: OP_PUSHDATA1,
            data: Some(vec![0x01, 0x02]),
        };
        assert_eq!(chunk.to_bytes(), vec![OP_PUSHDATA1, 0x02, 0x01, 0x02]);
    }
}
