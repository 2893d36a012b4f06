/// Bitcoin Script type - a sequence of opcodes and data pushes.
///
/// Scripts are used in transaction inputs (unlocking) and outputs (locking)
/// to define spending conditions. The Script wraps a `Vec<u8>` and provides
/// methods for construction, classification, serialization, and ASM output.

use std::fmt;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// A Bitcoin script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from a Bitcoin ASM string.
    ///
    /// Parses space-separated tokens where known opcodes (e.g. "OP_DUP") are
    /// emitted directly and hex strings are treated as push data.
    ///
    /// # Returns
    /// A `Script`, or an error if any token is invalid.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        if asm.is_empty() {
            return Ok(script);
        }
        for section in asm.split(' ') {
            if let Some(opcode) = string_to_opcode(section) {
                script.append_opcodes(&[opcode])?;
            } else {
                script.append_push_data_hex(section)?;
            }
        }
        Ok(script)
    }

    /// Create a script from the test-fixture notation used by the
    /// reference script test vectors.
    ///
    /// Tokens are whitespace separated:
    /// - `0x..` splices the raw hex bytes verbatim (no push prefix),
    /// - `'...'` pushes the quoted bytes with a minimal prefix,
    /// - decimal literals (including negative) push the minimally
    ///   encoded script number,
    /// - anything else is an opcode name, with or without the `OP_` prefix.
    pub fn from_test_notation(notation: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for token in notation.split_whitespace() {
            if let Some(hex_str) = token.strip_prefix("0x") {
                let bytes = hex::decode(hex_str)
                    .map_err(|_| ScriptError::InvalidToken(token.to_string()))?;
                script.0.extend_from_slice(&bytes);
            } else if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
                let literal = &token[1..token.len() - 1];
                script.append_push_data(literal.as_bytes())?;
            } else if let Ok(num) = token.parse::<i64>() {
                script.append_push_number(num)?;
            } else if let Some(opcode) = string_to_opcode(token) {
                script.0.push(opcode);
            } else if let Some(opcode) = string_to_opcode(&format!("OP_{}", token)) {
                script.0.push(opcode);
            } else {
                return Err(ScriptError::InvalidToken(token.to_string()));
            }
        }
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Convert the script to its ASM (human-readable assembly) representation.
    ///
    /// Each opcode or data push is represented as a space-separated token.
    /// Data pushes appear as their hex encoding; opcodes appear by name.
    /// Returns an empty string for empty or malformed scripts.
    pub fn to_asm(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let chunks = match self.chunks() {
            Ok(c) => c,
            Err(_) => return String::new(),
        };
        let parts: Vec<String> = chunks.iter().map(|c| c.to_asm_string()).collect();
        parts.join(" ")
    }

    /// Return a reference to the underlying bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty (zero bytes).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // -----------------------------------------------------------------------
    // Script classification
    // -----------------------------------------------------------------------

    /// Check if this is a Pay-to-Public-Key-Hash (P2PKH) output script.
    ///
    /// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    pub fn is_p2pkh_out(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check if this is a Pay-to-Public-Key (P2PK) output script.
    ///
    /// Pattern: <pubkey> OP_CHECKSIG (pubkey is 33 or 65 bytes with valid prefix).
    pub fn is_p2pk(&self) -> bool {
        let parts = match self.chunks() {
            Ok(p) => p,
            Err(_) => return false,
        };
        if parts.len() == 2 && parts[1].op == OP_CHECKSIG {
            if let Some(ref pubkey) = parts[0].data {
                if !pubkey.is_empty() {
                    let version = pubkey[0];
                    if (version == 0x04 || version == 0x06 || version == 0x07) && pubkey.len() == 65 {
                        return true;
                    } else if (version == 0x03 || version == 0x02) && pubkey.len() == 33 {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Check if this is a Pay-to-Script-Hash (P2SH) output script.
    ///
    /// Pattern: OP_HASH160 <20 bytes> OP_EQUAL
    pub fn is_p2sh_out(&self) -> bool {
        let b = &self.0;
        b.len() == 23
            && b[0] == OP_HASH160
            && b[1] == OP_DATA_20
            && b[22] == OP_EQUAL
    }

    /// Check if this looks like a P2PKH input (unlocking) script.
    ///
    /// Pattern: <signature> <pubkey>, where the signature is a DER
    /// signature with a trailing sighash byte and the pubkey is a 33- or
    /// 65-byte SEC1 encoding.
    pub fn is_p2pkh_in(&self) -> bool {
        let parts = match self.chunks() {
            Ok(p) => p,
            Err(_) => return false,
        };
        if parts.len() != 2 {
            return false;
        }
        let sig = match &parts[0].data {
            Some(d) => d,
            None => return false,
        };
        let pubkey = match &parts[1].data {
            Some(d) => d,
            None => return false,
        };
        if sig.len() < 9 || sig.len() > 73 || sig[0] != 0x30 {
            return false;
        }
        match pubkey.first() {
            Some(0x02) | Some(0x03) => pubkey.len() == 33,
            Some(0x04) | Some(0x06) | Some(0x07) => pubkey.len() == 65,
            _ => false,
        }
    }

    /// Check if this looks like a P2SH input (unlocking) script.
    ///
    /// Pattern: a push-only script whose final push is the serialized
    /// redeem script.
    pub fn is_p2sh_in(&self) -> bool {
        let parts = match self.chunks() {
            Ok(p) => p,
            Err(_) => return false,
        };
        if parts.is_empty() || !self.is_push_only() {
            return false;
        }
        matches!(parts.last().and_then(|c| c.data.as_ref()), Some(d) if !d.is_empty())
    }

    /// Check if this is a data carrier script (OP_RETURN or OP_FALSE OP_RETURN).
    pub fn is_op_return(&self) -> bool {
        let b = &self.0;
        (!b.is_empty() && b[0] == OP_RETURN)
            || (b.len() > 1 && b[0] == OP_FALSE && b[1] == OP_RETURN)
    }

    /// Check if this is a multisig output script.
    ///
    /// Pattern: OP_M <pubkey1> <pubkey2> ... OP_N OP_CHECKMULTISIG
    pub fn is_multisig_out(&self) -> bool {
        let parts = match self.chunks() {
            Ok(p) => p,
            Err(_) => return false,
        };
        if parts.len() < 3 {
            return false;
        }
        if !is_small_int_op(parts[0].op) {
            return false;
        }
        for chunk in &parts[1..parts.len() - 2] {
            match &chunk.data {
                Some(d) if !d.is_empty() => {}
                _ => return false,
            }
        }
        let second_last = &parts[parts.len() - 2];
        let last = &parts[parts.len() - 1];
        is_small_int_op(second_last.op) && last.op == OP_CHECKMULTISIG
    }

    /// Check if the script contains only data push opcodes (<= OP_16).
    pub fn is_push_only(&self) -> bool {
        match self.chunks() {
            Ok(parts) => parts.iter().all(|c| c.op <= OP_16),
            Err(_) => false,
        }
    }

    // -----------------------------------------------------------------------
    // Data extraction
    // -----------------------------------------------------------------------

    /// Extract the public key hash from a P2PKH output script.
    ///
    /// Returns the 20-byte hash160 if the script starts with OP_DUP OP_HASH160.
    pub fn public_key_hash(&self) -> Result<Vec<u8>, ScriptError> {
        if self.0.is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        if self.0.len() <= 2 || self.0[0] != OP_DUP || self.0[1] != OP_HASH160 {
            return Err(ScriptError::NotP2PKH);
        }
        let tail = &self.0[2..];
        let parts = decode_script(tail)?;
        match parts.first() {
            Some(chunk) => match &chunk.data {
                Some(data) => Ok(data.clone()),
                None => Err(ScriptError::NotP2PKH),
            },
            None => Err(ScriptError::NotP2PKH),
        }
    }

    /// Parse the script into a vector of decoded chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    // -----------------------------------------------------------------------
    // Mutation / building
    // -----------------------------------------------------------------------

    /// Append data bytes to the script with the proper PUSHDATA prefix.
    ///
    /// Chooses the minimal encoding: direct push for 1-75 bytes,
    /// OP_PUSHDATA1 for 76-255, OP_PUSHDATA2 for 256-65535, etc.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append hex-encoded data to the script with proper PUSHDATA prefix.
    pub fn append_push_data_hex(&mut self, hex_str: &str) -> Result<(), ScriptError> {
        let data = hex::decode(hex_str)
            .map_err(|_| ScriptError::InvalidOpcodeData)?;
        self.append_push_data(&data)
    }

    /// Append a number as a minimal script-number push.
    ///
    /// 0 becomes OP_0, 1..16 become OP_1..OP_16, -1 becomes OP_1NEGATE,
    /// and everything else is pushed as little-endian sign-magnitude bytes.
    pub fn append_push_number(&mut self, num: i64) -> Result<(), ScriptError> {
        match num {
            0 => self.0.push(OP_0),
            1..=16 => self.0.push(OP_1 + (num as u8) - 1),
            -1 => self.0.push(OP_1NEGATE),
            _ => self.append_push_data(&script_number_bytes(num))?,
        }
        Ok(())
    }

    /// Append raw opcodes to the script.
    ///
    /// Rejects push data opcodes (OP_DATA_1..OP_PUSHDATA4) to prevent misuse.
    /// Use `append_push_data` for those.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        for &op in opcodes {
            if op >= OP_DATA_1 && op <= OP_PUSHDATA4 {
                return Err(ScriptError::InvalidOpcodeType(
                    opcode_to_string(op).to_string(),
                ));
            }
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Append the raw bytes of another script.
    pub fn append_script(&mut self, other: &Script) {
        self.0.extend_from_slice(&other.0);
    }

    // -----------------------------------------------------------------------
    // Sighash preprocessing
    // -----------------------------------------------------------------------

    /// Remove every chunk whose serialization is byte-identical to `target`.
    ///
    /// This is the historical findAndDelete operation used by the legacy
    /// signature hash: matching is on exact serialized bytes, so a
    /// non-minimal re-encoding of the same payload is NOT removed. A
    /// malformed script is returned unchanged.
    pub fn find_and_delete(&self, target: &[u8]) -> Script {
        if target.is_empty() {
            return self.clone();
        }
        let chunks = match self.chunks() {
            Ok(c) => c,
            Err(_) => return self.clone(),
        };
        let mut out = Vec::with_capacity(self.0.len());
        for chunk in &chunks {
            let serialized = chunk.to_bytes();
            if serialized != target {
                out.extend_from_slice(&serialized);
            }
        }
        Script(out)
    }

    /// Remove all OP_CODESEPARATOR opcodes from the script.
    ///
    /// A malformed script is returned unchanged.
    pub fn remove_code_separators(&self) -> Script {
        let chunks = match self.chunks() {
            Ok(c) => c,
            Err(_) => return self.clone(),
        };
        let mut out = Vec::with_capacity(self.0.len());
        for chunk in &chunks {
            if chunk.op != OP_CODESEPARATOR {
                out.extend_from_slice(&chunk.to_bytes());
            }
        }
        Script(out)
    }

    /// Check if this script is byte-equal to another script.
    pub fn equals(&self, other: &Script) -> bool {
        self.0 == other.0
    }
}

/// Encode an i64 as little-endian sign-magnitude script number bytes.
fn script_number_bytes(num: i64) -> Vec<u8> {
    if num == 0 {
        return vec![];
    }
    let negative = num < 0;
    let mut abs = num.unsigned_abs();
    let mut out = Vec::new();
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    if out[out.len() - 1] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        let last = out.len() - 1;
        out[last] |= 0x80;
    }
    out
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Script {
    /// Display the script in its ASM form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_asm())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    //! Tests for the Script type.
    //!
    //! Covers construction from hex/ASM/test notation, serialization
    //! roundtrips, script classification, public key hash extraction,
    //! push data operations, findAndDelete, and equality checks.

    use super::*;
    use crate::opcodes::*;

    // -----------------------------------------------------------------------
    // Construction & roundtrip tests
    // -----------------------------------------------------------------------

    /// Verify that from_hex correctly decodes a P2PKH script and to_hex
    /// produces the same lowercase hex string.
    #[test]
    fn test_from_hex_roundtrip() {
        let hex_str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";
        let script = Script::from_hex(hex_str).expect("valid hex should parse");
        assert_eq!(script.to_hex(), hex_str);
    }

    /// Verify that from_hex with an empty string produces an empty script.
    #[test]
    fn test_from_hex_empty() {
        let script = Script::from_hex("").expect("empty hex should parse");
        assert!(script.is_empty());
        assert_eq!(script.to_hex(), "");
    }

    /// Verify that from_hex rejects invalid hex characters.
    #[test]
    fn test_from_hex_invalid() {
        assert!(Script::from_hex("ZZZZ").is_err());
    }

    /// Verify that to_asm produces the expected ASM string for a P2PKH script.
    #[test]
    fn test_to_asm_p2pkh() {
        let hex_str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";
        let script = Script::from_hex(hex_str).expect("valid hex should parse");
        assert_eq!(
            script.to_asm(),
            "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG"
        );
    }

    /// Verify that from_asm correctly parses a P2PKH ASM string and produces
    /// the expected hex output.
    #[test]
    fn test_from_asm_p2pkh() {
        let asm = "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG";
        let script = Script::from_asm(asm).expect("valid ASM should parse");
        assert_eq!(
            script.to_hex(),
            "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac"
        );
    }

    /// Verify that hex -> ASM -> hex roundtrip preserves the script.
    #[test]
    fn test_hex_asm_roundtrip() {
        let hex_str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";
        let script = Script::from_hex(hex_str).expect("valid hex should parse");
        let asm = script.to_asm();
        let script2 = Script::from_asm(&asm).expect("roundtrip ASM should parse");
        assert_eq!(script.to_hex(), script2.to_hex());
    }

    // -----------------------------------------------------------------------
    // Test notation parsing
    // -----------------------------------------------------------------------

    /// Bare names parse with or without the OP_ prefix.
    #[test]
    fn test_from_test_notation_opcodes() {
        let script = Script::from_test_notation("DUP HASH160 OP_EQUALVERIFY CHECKSIG")
            .expect("should parse");
        assert_eq!(
            script.to_bytes(),
            &[OP_DUP, OP_HASH160, OP_EQUALVERIFY, OP_CHECKSIG]
        );
    }

    /// Decimal literals become minimal script-number pushes.
    #[test]
    fn test_from_test_notation_numbers() {
        let script = Script::from_test_notation("0 1 16 -1 17 127 128 -127")
            .expect("should parse");
        assert_eq!(script.to_hex(), "0051604f0111017f02800001ff");
    }

    /// 0x tokens are spliced verbatim, even when non-minimal.
    #[test]
    fn test_from_test_notation_raw_hex() {
        let script = Script::from_test_notation("0x4c0101 EQUAL").expect("should parse");
        assert_eq!(script.to_hex(), "4c010187");
    }

    /// Quoted strings push their bytes.
    #[test]
    fn test_from_test_notation_quoted() {
        let script = Script::from_test_notation("'abc' EQUAL").expect("should parse");
        assert_eq!(script.to_hex(), "0361626387");
    }

    /// Unknown tokens are rejected.
    #[test]
    fn test_from_test_notation_bad_token() {
        assert!(Script::from_test_notation("NOT_AN_OPCODE").is_err());
        assert!(Script::from_test_notation("0xzz").is_err());
    }

    /// Empty notation yields an empty script.
    #[test]
    fn test_from_test_notation_empty() {
        let script = Script::from_test_notation("").expect("should parse");
        assert!(script.is_empty());
    }

    // -----------------------------------------------------------------------
    // Script classification tests
    // -----------------------------------------------------------------------

    /// Verify is_p2pkh_out returns true for a standard P2PKH script.
    #[test]
    fn test_is_p2pkh_out() {
        let script = Script::from_hex("76a91403ececf2d12a7f614aef4c82ecf13c303bd9975d88ac")
            .expect("valid hex");
        assert!(script.is_p2pkh_out());
    }

    /// Verify is_p2pkh_out returns false for a P2SH script.
    #[test]
    fn test_is_p2pkh_out_false_for_p2sh() {
        let script = Script::from_hex("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87")
            .expect("valid hex");
        assert!(!script.is_p2pkh_out());
    }

    /// Verify is_p2pk returns true for a compressed-key P2PK script.
    #[test]
    fn test_is_p2pk() {
        let script = Script::from_hex(
            "2102f0d97c290e79bf2a8660c406aa56b6f189ff79f2245cc5aff82808b58131b4d5ac",
        )
        .expect("valid hex");
        assert!(script.is_p2pk());
    }

    /// Verify is_p2pk returns false for a P2PKH script.
    #[test]
    fn test_is_p2pk_false_for_p2pkh() {
        let script = Script::from_hex("76a91403ececf2d12a7f614aef4c82ecf13c303bd9975d88ac")
            .expect("valid hex");
        assert!(!script.is_p2pk());
    }

    /// Verify is_p2sh_out returns true for a standard P2SH script.
    #[test]
    fn test_is_p2sh_out() {
        let script = Script::from_hex("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87")
            .expect("valid hex");
        assert!(script.is_p2sh_out());
    }

    /// A P2PKH input script is <sig> <pubkey>.
    #[test]
    fn test_is_p2pkh_in() {
        let mut script = Script::new();
        // DER signature with sighash byte appended.
        let mut sig = hex::decode(
            "304402203a2613ae8f35381c5f662e28b01cb5a3156d381e5f4af66d57711b7e39060b210220387533df6b389cbed50c74fae1db7d36ba01e2b19f7cb9d7b9dc2cd27e8f8a3f",
        )
        .expect("valid hex");
        sig.push(0x41);
        script.append_push_data(&sig).expect("push sig");
        script
            .append_push_data_hex(
                "02f0d97c290e79bf2a8660c406aa56b6f189ff79f2245cc5aff82808b58131b4d5",
            )
            .expect("push pubkey");
        assert!(script.is_p2pkh_in());
        assert!(!script.is_p2pkh_out());
    }

    /// A push-only script ending in a data push classifies as P2SH input.
    #[test]
    fn test_is_p2sh_in() {
        let mut script = Script::new();
        script.append_opcodes(&[OP_0]).expect("append");
        script.append_push_data(&[0x51]).expect("push redeem");
        assert!(script.is_p2sh_in());

        // Non-push-only input is not P2SH spend shape.
        let script = Script::from_bytes(&[OP_DUP, 0x01, 0x51]);
        assert!(!script.is_p2sh_in());
    }

    /// Verify is_op_return for both data carrier shapes.
    #[test]
    fn test_is_op_return() {
        let script = Script::from_bytes(&[OP_RETURN, 0x04, 0x01, 0x02, 0x03, 0x04]);
        assert!(script.is_op_return());

        let script = Script::from_bytes(&[OP_FALSE, OP_RETURN, 0x01, 0xaa]);
        assert!(script.is_op_return());

        let script = Script::from_hex("76a91403ececf2d12a7f614aef4c82ecf13c303bd9975d88ac")
            .expect("valid hex");
        assert!(!script.is_op_return());
    }

    /// Verify is_multisig_out returns true for a valid multisig script.
    #[test]
    fn test_is_multisig_out() {
        // OP_2 <data> <data> <data> OP_3 OP_CHECKMULTISIG
        let script = Script::from_hex("5201110122013353ae").expect("valid hex");
        assert!(script.is_multisig_out());
    }

    /// Verify is_multisig_out returns false for a non-multisig script.
    #[test]
    fn test_is_multisig_out_false_for_p2pkh() {
        let script = Script::from_hex("76a91403ececf2d12a7f614aef4c82ecf13c303bd9975d88ac")
            .expect("valid hex");
        assert!(!script.is_multisig_out());
    }

    /// Verify is_push_only.
    #[test]
    fn test_is_push_only() {
        let script = Script::from_hex("5201110122013353").expect("valid hex");
        assert!(script.is_push_only());
        let script = Script::from_hex("5201110122013353ae").expect("valid hex");
        assert!(!script.is_push_only());
    }

    // -----------------------------------------------------------------------
    // Public key hash extraction
    // -----------------------------------------------------------------------

    /// Verify public_key_hash extracts the correct 20-byte hash from P2PKH.
    #[test]
    fn test_public_key_hash() {
        let script = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac")
            .expect("valid hex");
        let pkh = script.public_key_hash().expect("should extract PKH");
        assert_eq!(hex::encode(&pkh), "04d03f746652cfcb6cb55119ab473a045137d265");
    }

    /// Verify public_key_hash returns an error for an empty script.
    #[test]
    fn test_public_key_hash_empty() {
        assert!(Script::new().public_key_hash().is_err());
    }

    /// Verify public_key_hash returns an error for a non-P2PKH script.
    #[test]
    fn test_public_key_hash_nonstandard() {
        let script = Script::from_hex("76").expect("valid hex");
        assert!(script.public_key_hash().is_err());
    }

    // -----------------------------------------------------------------------
    // Append operations
    // -----------------------------------------------------------------------

    /// Verify append_push_data correctly pushes small data (<=75 bytes).
    #[test]
    fn test_append_push_data_small() {
        let mut script = Script::new();
        script
            .append_push_data(&[0x01, 0x02, 0x03, 0x04, 0x05])
            .expect("push should succeed");
        assert_eq!(script.to_hex(), "050102030405");
    }

    /// Verify append_push_data uses OP_PUSHDATA1 for data in 76..=255 range.
    #[test]
    fn test_append_push_data_medium() {
        let mut script = Script::new();
        let data = vec![0xAA; 80];
        script.append_push_data(&data).expect("push should succeed");
        let hex_str = script.to_hex();
        assert_eq!(&hex_str[..4], "4c50");
        assert_eq!(hex_str.len(), 4 + 80 * 2);
    }

    /// Verify append_push_number small-int and multi-byte forms.
    #[test]
    fn test_append_push_number() {
        let mut script = Script::new();
        script.append_push_number(0).expect("ok");
        script.append_push_number(16).expect("ok");
        script.append_push_number(-1).expect("ok");
        script.append_push_number(17).expect("ok");
        script.append_push_number(-2).expect("ok");
        assert_eq!(script.to_hex(), "00604f01110182");
    }

    /// Verify append_opcodes appends valid opcodes and rejects push data
    /// opcodes.
    #[test]
    fn test_append_opcodes() {
        let mut script = Script::from_asm("OP_2 OP_2 OP_ADD").expect("valid ASM");
        script
            .append_opcodes(&[OP_EQUALVERIFY])
            .expect("should succeed");
        assert_eq!(script.to_asm(), "OP_2 OP_2 OP_ADD OP_EQUALVERIFY");
        assert!(script.append_opcodes(&[OP_PUSHDATA1]).is_err());
    }

    /// Verify append_script concatenates raw bytes.
    #[test]
    fn test_append_script() {
        let mut script = Script::from_asm("OP_2 OP_2").expect("valid ASM");
        let tail = Script::from_asm("OP_ADD").expect("valid ASM");
        script.append_script(&tail);
        assert_eq!(script.to_asm(), "OP_2 OP_2 OP_ADD");
    }

    // -----------------------------------------------------------------------
    // findAndDelete / code separator removal
    // -----------------------------------------------------------------------

    /// A matching push chunk is removed, byte-for-byte.
    #[test]
    fn test_find_and_delete_removes_exact_chunk() {
        let script = Script::from_hex("0302ff03").expect("valid hex");
        let target = hex::decode("0302ff03").expect("valid hex");
        let result = script.find_and_delete(&target);
        assert!(result.is_empty());
    }

    /// Repeated occurrences are all removed.
    #[test]
    fn test_find_and_delete_repeated() {
        let script = Script::from_hex("0302ff030302ff03").expect("valid hex");
        let target = hex::decode("0302ff03").expect("valid hex");
        assert!(script.find_and_delete(&target).is_empty());
    }

    /// Matching is on serialized bytes: a PUSHDATA1 encoding of the same
    /// payload is not removed when the target used a direct push.
    #[test]
    fn test_find_and_delete_is_byte_exact() {
        let script = Script::from_hex("4c030201ff").expect("valid hex");
        let target = hex::decode("030201ff").expect("valid hex");
        let result = script.find_and_delete(&target);
        assert_eq!(result.to_hex(), "4c030201ff");
    }

    /// A partial byte overlap inside a larger push is not a match.
    #[test]
    fn test_find_and_delete_no_substring_match() {
        let script = Script::from_hex("0504030201ff").expect("valid hex");
        let target = hex::decode("030201ff").expect("valid hex");
        assert_eq!(script.find_and_delete(&target).to_hex(), "0504030201ff");
    }

    /// An empty target deletes nothing.
    #[test]
    fn test_find_and_delete_empty_target() {
        let script = Script::from_hex("0302ff03").expect("valid hex");
        assert_eq!(script.find_and_delete(&[]).to_hex(), "0302ff03");
    }

    /// Code separators are stripped, everything else kept.
    #[test]
    fn test_remove_code_separators() {
        let script = Script::from_bytes(&[OP_1, OP_CODESEPARATOR, OP_2, OP_CODESEPARATOR, OP_ADD]);
        let result = script.remove_code_separators();
        assert_eq!(result.to_bytes(), &[OP_1, OP_2, OP_ADD]);
    }

    // -----------------------------------------------------------------------
    // Equality
    // -----------------------------------------------------------------------

    /// Verify two scripts built from the same hex are equal.
    #[test]
    fn test_equals_same_hex() {
        let s1 = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac")
            .expect("valid hex");
        let s2 = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac")
            .expect("valid hex");
        assert!(s1.equals(&s2));
        assert_eq!(s1, s2);
    }

    /// Verify two scripts with different bytes are not equal.
    #[test]
    fn test_not_equals_different_hex() {
        let s1 = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26566ac")
            .expect("valid hex");
        let s2 = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac")
            .expect("valid hex");
        assert!(!s1.equals(&s2));
    }

    // -----------------------------------------------------------------------
    // Serialization (JSON)
    // -----------------------------------------------------------------------

    /// Verify Script serializes to a hex JSON string.
    #[test]
    fn test_serde_serialize() {
        let script = Script::from_asm("OP_2 OP_2 OP_ADD OP_4 OP_EQUALVERIFY")
            .expect("valid ASM");
        let json_str = serde_json::to_string(&script).expect("should serialize");
        assert_eq!(json_str, r#""5252935488""#);
    }

    /// Verify Script deserializes from a hex JSON string.
    #[test]
    fn test_serde_deserialize() {
        let script: Script = serde_json::from_str(r#""5252935488""#).expect("should deserialize");
        assert_eq!(script.to_hex(), "5252935488");
    }

    // -----------------------------------------------------------------------
    // Display / Debug
    // -----------------------------------------------------------------------

    /// Verify Display trait outputs the ASM string.
    #[test]
    fn test_display() {
        let script = Script::from_hex("76a914e2a623699e81b291c0327f408fea765d534baa2a88ac")
            .expect("valid hex");
        assert_eq!(
            format!("{}", script),
            "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG"
        );
    }

    /// Verify Debug trait outputs the Script(...) format.
    #[test]
    fn test_debug() {
        let script = Script::from_hex("76a914e2a6").expect("valid hex");
        assert_eq!(format!("{:?}", script), "Script(76a914e2a6)");
    }

    /// Verify Default produces an empty script.
    #[test]
    fn test_default() {
        let script = Script::default();
        assert!(script.is_empty());
        assert_eq!(script.len(), 0);
    }
}
