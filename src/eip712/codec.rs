//! Signature Codec
//!
//! Converts raw signature components into the calldata layout a permit
//! verifying contract expects: `r` and `s` as 32-byte `0x` hex words and
//! `v` in the Ethereum `27`/`28` convention.

use super::encoder::{encode_uint, parse_uint_str};
use super::types::RawSignature;
use crate::error::{PermitError, PermitResult};
use ethers_core::types::U256;
use serde::{Deserialize, Serialize};

/// Offset added to the recovery id to form Ethereum's `v`
pub const V_OFFSET: u8 = 27;

/// Signature formatted for submission: `(r, s, v)` in that order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSignature {
    /// r component, `0x` + 64 hex chars
    pub r: String,
    /// s component, `0x` + 64 hex chars
    pub s: String,
    /// 27 or 28
    pub v: u8,
}

impl PermitSignature {
    /// 65-byte `r || s || v` form
    pub fn to_bytes(&self) -> PermitResult<[u8; 65]> {
        let raw = decode_signature(self)?;
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&raw.compact());
        bytes[64] = self.v;
        Ok(bytes)
    }

    /// Create from 65-byte signature (r || s || v)
    pub fn from_bytes(bytes: &[u8]) -> PermitResult<Self> {
        if bytes.len() != 65 {
            return Err(PermitError::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }

        let recovery_id = v_to_recovery_id(bytes[64])?;
        Ok(Self {
            r: word_to_hex(&bytes[0..32])?,
            s: word_to_hex(&bytes[32..64])?,
            v: recovery_id + V_OFFSET,
        })
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> PermitResult<String> {
        Ok(format!("0x{}", hex::encode(self.to_bytes()?)))
    }

    /// Parse a `0x`-prefixed 65-byte hex signature
    pub fn from_hex(s: &str) -> PermitResult<Self> {
        let s = s.trim();
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| PermitError::InvalidSignature(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

/// Format a big-endian magnitude as a 32-byte, zero-padded `0x` hex word
///
/// Leading zero bytes do not count towards the width. A value needing more
/// than 32 bytes is a `ValueEncodingError`; it is never truncated.
pub fn word_to_hex(bytes: &[u8]) -> PermitResult<String> {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];

    if significant.len() > 32 {
        return Err(PermitError::ValueEncodingError(format!(
            "value needs {} bytes, the field holds 32",
            significant.len()
        )));
    }

    let mut word = [0u8; 32];
    word[32 - significant.len()..].copy_from_slice(significant);
    Ok(format!("0x{}", hex::encode(word)))
}

/// Format a 256-bit unsigned integer as a 32-byte `0x` hex word
pub fn uint_to_hex32(value: U256) -> String {
    format!("0x{}", hex::encode(encode_uint(value)))
}

/// Parse a decimal or `0x` hex integer and format it as a 32-byte hex word
pub fn uint_str_to_hex32(value: &str) -> PermitResult<String> {
    Ok(uint_to_hex32(parse_uint_str("uint256", value)?))
}

/// Parse a 32-byte `0x` hex word back into its bytes
pub fn hex32_to_word(s: &str) -> PermitResult<[u8; 32]> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| PermitError::invalid_value("bytes32", s))?;

    if digits.len() != 64 {
        return Err(PermitError::invalid_value(
            "bytes32",
            format!("expected 64 hex chars, got {}", digits.len()),
        ));
    }

    let mut word = [0u8; 32];
    hex::decode_to_slice(digits, &mut word)
        .map_err(|e| PermitError::invalid_value("bytes32", e))?;
    Ok(word)
}

/// Parse a 32-byte `0x` hex word back into an integer
pub fn hex32_to_uint(s: &str) -> PermitResult<U256> {
    Ok(U256::from_big_endian(&hex32_to_word(s)?))
}

/// Map a recovery id (0 or 1) to Ethereum's `v`
pub fn recovery_id_to_v(recovery_id: u8) -> PermitResult<u8> {
    match recovery_id {
        0 | 1 => Ok(recovery_id + V_OFFSET),
        other => Err(PermitError::InvalidSignature(format!(
            "recovery id must be 0 or 1, got {}",
            other
        ))),
    }
}

/// Map `v` back to a recovery id; accepts both 27/28 and raw 0/1
pub fn v_to_recovery_id(v: u8) -> PermitResult<u8> {
    match v {
        27 | 28 => Ok(v - V_OFFSET),
        0 | 1 => Ok(v),
        other => Err(PermitError::InvalidSignature(format!("invalid v value {}", other))),
    }
}

/// Format raw signature components as `(r, s, v)`
pub fn encode_signature(raw: &RawSignature) -> PermitResult<PermitSignature> {
    Ok(PermitSignature {
        r: word_to_hex(&raw.r)?,
        s: word_to_hex(&raw.s)?,
        v: recovery_id_to_v(raw.recovery_id)?,
    })
}

/// Parse formatted components back into a raw signature
pub fn decode_signature(signature: &PermitSignature) -> PermitResult<RawSignature> {
    let r = hex32_to_word(&signature.r)
        .map_err(|e| PermitError::InvalidSignature(format!("r: {}", e)))?;
    let s = hex32_to_word(&signature.s)
        .map_err(|e| PermitError::InvalidSignature(format!("s: {}", e)))?;

    Ok(RawSignature::new(r, s, v_to_recovery_id(signature.v)?))
}
