//! Cryptographic and wire-format primitives for the consensus core.
//!
//! This crate provides the narrow collaborator interfaces the Script
//! interpreter and transaction verifier consume:
//! - Hash functions (SHA-1, SHA-256, SHA-256d, RIPEMD-160, Hash160)
//! - secp256k1 keys and ECDSA signatures (DER codec, low-S, prehash verify)
//! - VarInt encoding and little-endian cursor readers/writers

pub mod ec;
pub mod hash;
pub mod util;

mod error;
pub use error::PrimitivesError;
