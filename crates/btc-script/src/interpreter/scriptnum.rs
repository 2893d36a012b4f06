//! Script number arithmetic with Bitcoin consensus rules.
//!
//! All numbers on the Bitcoin script stack are encoded as little-endian
//! byte arrays with a sign bit in the most significant bit of the last byte.
//! Numeric opcodes operate on 4-byte integers in [-2^31+1, 2^31-1] but
//! results may overflow and remain valid as long as they are not reinterpreted
//! as numbers.

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::error::{InterpreterError, InterpreterErrorCode};

/// A script number using big integer arithmetic for overflow safety.
#[derive(Debug, Clone)]
pub struct ScriptNumber {
    /// The numeric value stored as a big integer.
    pub val: BigInt,
}

impl ScriptNumber {
    /// Create a new ScriptNumber from an i64 value.
    pub fn new(val: i64) -> Self {
        ScriptNumber {
            val: BigInt::from(val),
        }
    }

    /// Parse a byte array into a ScriptNumber.
    ///
    /// `script_num_len` is the max allowed byte length.
    /// `require_minimal` enforces minimal encoding.
    pub fn from_bytes(
        bb: &[u8],
        script_num_len: usize,
        require_minimal: bool,
    ) -> Result<Self, InterpreterError> {
        if bb.len() > script_num_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "numeric value encoded as {:02x?} is {} bytes which exceeds the max allowed of {}",
                    bb, bb.len(), script_num_len
                ),
            ));
        }

        if require_minimal {
            check_minimal_data_encoding(bb)?;
        }

        if bb.is_empty() {
            return Ok(ScriptNumber { val: BigInt::zero() });
        }

        // Decode from little endian with sign bit
        let mut v = BigInt::zero();
        for (i, &b) in bb.iter().enumerate() {
            v |= BigInt::from(b) << (8 * i);
        }

        // If the most significant byte has the sign bit set, the number is negative
        if bb[bb.len() - 1] & 0x80 != 0 {
            // Remove the sign bit and negate
            let mask = !(BigInt::from(0x80_i64) << (8 * (bb.len() - 1)));
            v &= mask;
            v = -v;
        }

        Ok(ScriptNumber { val: v })
    }

    /// Serialize the number to bytes in little-endian with sign bit.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.val.is_zero() {
            return vec![];
        }

        let is_negative = self.val.is_negative();
        let abs_val = if is_negative {
            -self.val.clone()
        } else {
            self.val.clone()
        };

        // Convert absolute value to little-endian bytes
        let mut result: Vec<u8> = Vec::new();
        let mut cpy = abs_val;
        while cpy > BigInt::zero() {
            result.push((&cpy & BigInt::from(0xff_u8)).to_u8().unwrap_or(0));
            cpy >>= 8;
        }

        if result.is_empty() {
            return vec![];
        }

        // Handle sign bit
        if result[result.len() - 1] & 0x80 != 0 {
            // Need an extra byte for the sign
            result.push(if is_negative { 0x80 } else { 0x00 });
        } else if is_negative {
            let last = result.len() - 1;
            result[last] |= 0x80;
        }

        result
    }

    // Arithmetic operations (mutating, return self for chaining)

    /// Add another script number to this one and return self for chaining.
    pub fn add(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val + &other.val;
        self
    }

    /// Subtract another script number from this one and return self for chaining.
    pub fn sub(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val - &other.val;
        self
    }

    /// Multiply this script number by another and return self for chaining.
    pub fn mul(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val * &other.val;
        self
    }

    /// Divide this script number by another (truncated toward zero) and return self for chaining.
    pub fn div(&mut self, other: &ScriptNumber) -> &mut Self {
        use num_integer::Integer;
        // Truncated division toward zero.
        let (q, _) = self.val.div_rem(&other.val);
        self.val = q;
        self
    }

    /// Compute the truncated remainder of dividing by another and return self for chaining.
    pub fn modulo(&mut self, other: &ScriptNumber) -> &mut Self {
        use num_integer::Integer;
        let (_, r) = self.val.div_rem(&other.val);
        self.val = r;
        self
    }

    /// Increment this number by one and return self for chaining.
    pub fn incr(&mut self) -> &mut Self {
        self.val = &self.val + BigInt::one();
        self
    }

    /// Decrement this number by one and return self for chaining.
    pub fn decr(&mut self) -> &mut Self {
        self.val = &self.val - BigInt::one();
        self
    }

    /// Negate this number and return self for chaining.
    pub fn neg(&mut self) -> &mut Self {
        self.val = -self.val.clone();
        self
    }

    /// Replace this number with its absolute value and return self for chaining.
    pub fn abs(&mut self) -> &mut Self {
        if self.val.is_negative() {
            self.val = -self.val.clone();
        }
        self
    }

    /// Set this number to the given i64 value and return self for chaining.
    pub fn set(&mut self, i: i64) -> &mut Self {
        self.val = BigInt::from(i);
        self
    }

    // Comparison operations

    /// Return true if this number is zero.
    pub fn is_zero(&self) -> bool {
        self.val.is_zero()
    }

    /// Return true if this number is less than `other`.
    pub fn less_than(&self, other: &ScriptNumber) -> bool {
        self.val < other.val
    }

    /// Return true if this number is less than the given i64 value.
    pub fn less_than_int(&self, i: i64) -> bool {
        self.val < BigInt::from(i)
    }

    /// Return true if this number is less than or equal to `other`.
    pub fn less_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.val <= other.val
    }

    /// Return true if this number is greater than `other`.
    pub fn greater_than(&self, other: &ScriptNumber) -> bool {
        self.val > other.val
    }

    /// Return true if this number is greater than the given i64 value.
    pub fn greater_than_int(&self, i: i64) -> bool {
        self.val > BigInt::from(i)
    }

    /// Return true if this number is greater than or equal to `other`.
    pub fn greater_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.val >= other.val
    }

    /// Return true if this number is equal to `other`.
    pub fn equal(&self, other: &ScriptNumber) -> bool {
        self.val == other.val
    }

    /// Return true if this number is equal to the given i64 value.
    pub fn equal_int(&self, i: i64) -> bool {
        self.val == BigInt::from(i)
    }

    // Conversion

    /// Convert to i32, clamping to [i32::MIN, i32::MAX] on overflow.
    pub fn to_i32(&self) -> i32 {
        match self.val.to_i64() {
            Some(v) => {
                if v > i32::MAX as i64 {
                    i32::MAX
                } else if v < i32::MIN as i64 {
                    i32::MIN
                } else {
                    v as i32
                }
            }
            None => {
                if self.val.is_positive() {
                    i32::MAX
                } else {
                    i32::MIN
                }
            }
        }
    }

    /// Convert to i64, clamping to [i64::MIN, i64::MAX] on overflow.
    pub fn to_i64(&self) -> i64 {
        if self.greater_than_int(i64::MAX) {
            return i64::MAX;
        }
        if self.less_than_int(i64::MIN) {
            return i64::MIN;
        }
        self.val.to_i64().unwrap_or(0)
    }

    /// Convert to i64, returning 0 if the value does not fit.
    pub fn to_int(&self) -> i64 {
        self.val.to_i64().unwrap_or(0)
    }
}

/// Minimally encode a byte array (used by OP_BIN2NUM).
pub fn minimally_encode(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return vec![];
    }

    let mut data = data.to_vec();
    let last = data[data.len() - 1];

    if last & 0x7f != 0 {
        return data;
    }

    if data.len() == 1 {
        return vec![];
    }

    if data[data.len() - 2] & 0x80 != 0 {
        return data;
    }

    let mut i = data.len() - 1;
    while i > 0 {
        if data[i - 1] != 0 {
            if data[i - 1] & 0x80 != 0 {
                data[i] = last;
                return data[..=i].to_vec();
            } else {
                data[i - 1] |= last;
                return data[..i].to_vec();
            }
        }
        i -= 1;
    }

    vec![]
}

/// Check that a byte array uses minimal data encoding.
pub fn check_minimal_data_encoding(v: &[u8]) -> Result<(), InterpreterError> {
    if v.is_empty() {
        return Ok(());
    }

    if v[v.len() - 1] & 0x7f == 0 {
        if v.len() == 1 || v[v.len() - 2] & 0x80 == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::MinimalData,
                format!(
                    "numeric value encoded as {:02x?} is not minimally encoded",
                    v
                ),
            ));
        }
    }

    Ok(())
}
