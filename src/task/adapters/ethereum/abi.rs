//! Minimal ABI encoding for the escrow contract's call surface.
//!
//! Selectors are derived at runtime from canonical signature strings, so
//! the encoding stays correct by construction. Only the parameter shapes
//! the contract actually uses are supported: static words plus an optional
//! trailing string.

use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Errors raised while encoding or decoding ABI data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    /// An address operand was not 20 bytes of hex.
    #[error("invalid address operand: {0}")]
    InvalidAddress(String),

    /// A call result was not a 32-byte hex word.
    #[error("invalid result word: {0}")]
    InvalidWord(String),

    /// A decoded value does not fit the requested integer width.
    #[error("result out of range: {0}")]
    OutOfRange(String),
}

/// Computes the 4-byte function selector for a canonical signature.
#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0_u8; 4];
    out.copy_from_slice(&digest.as_slice()[..4]);
    out
}

/// Encodes an unsigned integer as a 32-byte big-endian word.
#[must_use]
pub fn encode_u256(value: u128) -> [u8; 32] {
    let mut word = [0_u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encodes a boolean as a 32-byte word.
#[must_use]
pub fn encode_bool(value: bool) -> [u8; 32] {
    encode_u256(u128::from(value))
}

/// Encodes a `0x`-prefixed address as a right-aligned 32-byte word.
///
/// # Errors
///
/// Returns [`AbiError::InvalidAddress`] when the operand is not 20 bytes
/// of hex.
pub fn encode_address(address: &str) -> Result<[u8; 32], AbiError> {
    let body = address
        .strip_prefix("0x")
        .ok_or_else(|| AbiError::InvalidAddress(address.to_owned()))?;
    let bytes =
        hex::decode(body).map_err(|_| AbiError::InvalidAddress(address.to_owned()))?;
    if bytes.len() != 20 {
        return Err(AbiError::InvalidAddress(address.to_owned()));
    }
    let mut word = [0_u8; 32];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

/// Builds `0x`-prefixed calldata from a selector and static words.
#[must_use]
pub fn call_data(selector_bytes: [u8; 4], words: &[[u8; 32]]) -> String {
    let mut data = Vec::with_capacity(4 + words.len() * 32);
    data.extend_from_slice(&selector_bytes);
    for word in words {
        data.extend_from_slice(word);
    }
    format!("0x{}", hex::encode(data))
}

/// Builds calldata for static words followed by one dynamic string.
///
/// The string's offset word points past the static head; its tail is the
/// length word plus the UTF-8 bytes padded to a 32-byte boundary.
#[must_use]
pub fn call_data_with_string(
    selector_bytes: [u8; 4],
    words: &[[u8; 32]],
    tail_string: &str,
) -> String {
    let head_words = words.len() + 1;
    let offset = (head_words * 32) as u128;

    let mut data = Vec::new();
    data.extend_from_slice(&selector_bytes);
    for word in words {
        data.extend_from_slice(word);
    }
    data.extend_from_slice(&encode_u256(offset));

    let bytes = tail_string.as_bytes();
    data.extend_from_slice(&encode_u256(bytes.len() as u128));
    data.extend_from_slice(bytes);
    let padding = (32 - bytes.len() % 32) % 32;
    data.extend(std::iter::repeat_n(0_u8, padding));

    format!("0x{}", hex::encode(data))
}

/// Decodes a single 32-byte result word into a `u128`.
///
/// # Errors
///
/// Returns [`AbiError::InvalidWord`] on malformed results and
/// [`AbiError::OutOfRange`] when the high 16 bytes are non-zero.
pub fn decode_u256(result: &str) -> Result<u128, AbiError> {
    let body = result
        .strip_prefix("0x")
        .ok_or_else(|| AbiError::InvalidWord(result.to_owned()))?;
    let bytes = hex::decode(body).map_err(|_| AbiError::InvalidWord(result.to_owned()))?;
    if bytes.len() != 32 {
        return Err(AbiError::InvalidWord(result.to_owned()));
    }
    let (high, low) = bytes.split_at(16);
    if high.iter().any(|byte| *byte != 0) {
        return Err(AbiError::OutOfRange(result.to_owned()));
    }
    let mut buf = [0_u8; 16];
    buf.copy_from_slice(low);
    Ok(u128::from_be_bytes(buf))
}
