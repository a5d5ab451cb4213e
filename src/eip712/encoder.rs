//! EIP-712 Type Encoding
//!
//! Implements the encoding rules for EIP-712 typed data.

use super::types::*;
use crate::error::{PermitError, PermitResult};
use ethers_core::types::{Address, U256};
use std::collections::BTreeSet;
use tiny_keccak::{Hasher, Keccak};

/// Encode a type string for a struct type
/// Format: "TypeName(type1 name1,type2 name2,...)"
///
/// Referenced struct types are appended after the primary type, sorted by name.
pub fn encode_type(type_name: &str, types: &Types) -> PermitResult<String> {
    let fields = types
        .get(type_name)
        .ok_or_else(|| PermitError::InvalidType(type_name.to_string()))?;

    let mut result = format_type_string(type_name, fields);

    // BTreeSet iterates in alphabetical order
    let dependencies = find_type_dependencies(type_name, types);
    for dep in dependencies.iter().filter(|dep| dep.as_str() != type_name) {
        if let Some(dep_fields) = types.get(dep) {
            result.push_str(&format_type_string(dep, dep_fields));
        }
    }

    Ok(result)
}

/// Format a single type string
fn format_type_string(type_name: &str, fields: &[TypedDataField]) -> String {
    let field_strs: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.type_name, f.name))
        .collect();

    format!("{}({})", type_name, field_strs.join(","))
}

/// Find all type dependencies (including nested structs)
pub fn find_type_dependencies(type_name: &str, types: &Types) -> BTreeSet<String> {
    let mut dependencies = BTreeSet::new();
    let mut to_visit = vec![type_name.to_string()];

    while let Some(current) = to_visit.pop() {
        if dependencies.contains(&current) {
            continue;
        }

        if let Some(fields) = types.get(&current) {
            dependencies.insert(current.clone());

            for field in fields {
                let base_type = get_base_type(&field.type_name);
                if types.contains_key(base_type) && !dependencies.contains(base_type) {
                    to_visit.push(base_type.to_string());
                }
            }
        }
    }

    dependencies
}

/// Get the base type from a potentially array type
/// e.g., "Person[]" -> "Person", "uint256[10]" -> "uint256"
pub fn get_base_type(type_name: &str) -> &str {
    if let Some(bracket_pos) = type_name.find('[') {
        &type_name[..bracket_pos]
    } else {
        type_name
    }
}

/// Split off the outermost array dimension
/// e.g., "uint256[2][]" -> ("uint256[2]", None), "Person[3]" -> ("Person", Some(3))
fn split_array_type(type_name: &str) -> PermitResult<Option<(&str, Option<usize>)>> {
    if !type_name.ends_with(']') {
        return Ok(None);
    }
    let open = type_name
        .rfind('[')
        .ok_or_else(|| PermitError::InvalidType(type_name.to_string()))?;
    let len = &type_name[open + 1..type_name.len() - 1];
    let fixed = if len.is_empty() {
        None
    } else {
        Some(
            len.parse::<usize>()
                .map_err(|_| PermitError::InvalidType(type_name.to_string()))?,
        )
    };
    Ok(Some((&type_name[..open], fixed)))
}

/// Calculate the type hash for a struct type
/// typeHash = keccak256(encodeType(typeOf(s)))
pub fn type_hash(type_name: &str, types: &Types) -> PermitResult<[u8; 32]> {
    let encoded = encode_type(type_name, types)?;
    Ok(keccak256(encoded.as_bytes()))
}

/// Encode a struct value: typeHash || enc(field_1) || ... || enc(field_n)
///
/// Fields are encoded in the order of the type definition, never in the
/// order they happen to appear in `value`.
pub fn encode_data(
    type_name: &str,
    value: &serde_json::Value,
    types: &Types,
) -> PermitResult<Vec<u8>> {
    let obj = value
        .as_object()
        .ok_or_else(|| PermitError::invalid_value(type_name, value))?;

    let fields = types
        .get(type_name)
        .ok_or_else(|| PermitError::InvalidType(type_name.to_string()))?;

    let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
    encoded.extend_from_slice(&type_hash(type_name, types)?);

    for field in fields {
        let field_value = obj
            .get(&field.name)
            .ok_or_else(|| PermitError::MissingField(format!("{}.{}", type_name, field.name)))?;

        encoded.extend_from_slice(&encode_field(&field.type_name, field_value, types)?);
    }

    Ok(encoded)
}

/// Encode a single member value as its 32-byte word
///
/// Dynamic values, arrays and nested structs contribute their hash.
pub fn encode_field(
    type_name: &str,
    value: &serde_json::Value,
    types: &Types,
) -> PermitResult<[u8; 32]> {
    if let Some((element_type, fixed_len)) = split_array_type(type_name)? {
        return encode_array(type_name, element_type, fixed_len, value, types);
    }

    match type_name {
        "string" => {
            let s = value
                .as_str()
                .ok_or_else(|| PermitError::invalid_value(type_name, value))?;
            Ok(keccak256(s.as_bytes()))
        }
        "bytes" => {
            let s = value
                .as_str()
                .ok_or_else(|| PermitError::invalid_value(type_name, value))?;
            Ok(keccak256(&parse_hex(type_name, s)?))
        }
        _ if types.contains_key(type_name) => {
            Ok(keccak256(&encode_data(type_name, value, types)?))
        }
        _ => encode_atomic(type_name, value),
    }
}

/// Encode an array value as keccak256 of its concatenated element words
fn encode_array(
    type_name: &str,
    element_type: &str,
    fixed_len: Option<usize>,
    value: &serde_json::Value,
    types: &Types,
) -> PermitResult<[u8; 32]> {
    let arr = value
        .as_array()
        .ok_or_else(|| PermitError::invalid_value(type_name, value))?;

    if let Some(expected) = fixed_len {
        if arr.len() != expected {
            return Err(PermitError::invalid_value(
                type_name,
                format!("expected {} elements, got {}", expected, arr.len()),
            ));
        }
    }

    let mut encoded = Vec::with_capacity(32 * arr.len());
    for item in arr {
        encoded.extend_from_slice(&encode_field(element_type, item, types)?);
    }

    Ok(keccak256(&encoded))
}

/// Encode an atomic (fixed-size) value
fn encode_atomic(type_name: &str, value: &serde_json::Value) -> PermitResult<[u8; 32]> {
    let mut result = [0u8; 32];

    // address - 20 bytes, left-padded to 32
    if type_name == "address" {
        let addr = value
            .as_str()
            .ok_or_else(|| PermitError::InvalidAddress(value.to_string()))?;
        return Ok(encode_address(&parse_address(addr)?));
    }

    if type_name == "bool" {
        let b = value
            .as_bool()
            .ok_or_else(|| PermitError::invalid_value(type_name, value))?;
        result[31] = u8::from(b);
        return Ok(result);
    }

    if let Some((bits, signed)) = integer_bits(type_name) {
        let word = if signed {
            parse_int(type_name, bits, value)?
        } else {
            parse_uint(type_name, bits, value)?
        };
        return Ok(encode_uint(word));
    }

    // bytesN (fixed-size bytes, right-padded)
    if let Some(size) = fixed_bytes_len(type_name) {
        let hex_str = value
            .as_str()
            .ok_or_else(|| PermitError::invalid_value(type_name, value))?;

        let bytes = parse_hex(type_name, hex_str)?;
        if bytes.len() > size {
            return Err(PermitError::invalid_value(
                type_name,
                format!("bytes too long: {} > {}", bytes.len(), size),
            ));
        }

        result[..bytes.len()].copy_from_slice(&bytes);
        return Ok(result);
    }

    Err(PermitError::InvalidType(type_name.to_string()))
}

/// Left-pad an address to a 32-byte word
pub fn encode_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// 32-byte big-endian word of an unsigned integer
pub fn encode_uint(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

/// Parse an Ethereum address
///
/// Accepts upper, lower or EIP-55 mixed case, with or without `0x`.
/// Anything that is not exactly 20 bytes of hex is rejected.
pub fn parse_address(addr: &str) -> PermitResult<Address> {
    let trimmed = addr.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex_part.len() != 40 {
        return Err(PermitError::InvalidAddress(format!(
            "invalid length: expected 40 hex chars, got {}",
            hex_part.len()
        )));
    }

    let bytes = hex::decode(hex_part)
        .map_err(|e| PermitError::InvalidAddress(format!("invalid hex: {}", e)))?;

    Ok(Address::from_slice(&bytes))
}

/// Parse an unsigned integer from a JSON number, decimal string or `0x` hex string
///
/// Values that do not fit in `bits` bits are `IntegerOutOfRange`.
pub fn parse_uint(type_name: &str, bits: usize, value: &serde_json::Value) -> PermitResult<U256> {
    let parsed = match value {
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(u) => U256::from(u),
            None if n.as_i64().is_some() => {
                return Err(PermitError::out_of_range(type_name, n));
            }
            None => return Err(PermitError::invalid_value(type_name, n)),
        },
        serde_json::Value::String(s) => parse_uint_str(type_name, s)?,
        _ => return Err(PermitError::invalid_value(type_name, value)),
    };

    if parsed.bits() > bits {
        return Err(PermitError::out_of_range(type_name, value));
    }

    Ok(parsed)
}

/// Parse a decimal or `0x` hex string into a 256-bit unsigned integer
pub fn parse_uint_str(type_name: &str, s: &str) -> PermitResult<U256> {
    let s = s.trim();

    if let Some(hex_digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex_digits.is_empty() || !hex_digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PermitError::invalid_value(type_name, s));
        }
        let significant = hex_digits.trim_start_matches('0');
        if significant.len() > 64 {
            return Err(PermitError::out_of_range(type_name, s));
        }
        let padded = format!("{:0>64}", significant);
        let bytes = hex::decode(padded).map_err(|_| PermitError::invalid_value(type_name, s))?;
        return Ok(U256::from_big_endian(&bytes));
    }

    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(PermitError::invalid_value(type_name, s));
    }

    U256::from_dec_str(s).map_err(|_| PermitError::out_of_range(type_name, s))
}

/// Parse a signed integer into its two's-complement 256-bit word
fn parse_int(type_name: &str, bits: usize, value: &serde_json::Value) -> PermitResult<U256> {
    let (negative, magnitude) = match value {
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                (false, U256::from(u))
            } else if let Some(i) = n.as_i64() {
                (i < 0, U256::from(i.unsigned_abs()))
            } else {
                return Err(PermitError::invalid_value(type_name, n));
            }
        }
        serde_json::Value::String(s) => match s.trim().strip_prefix('-') {
            Some(rest) => (true, parse_uint_str(type_name, rest)?),
            None => (false, parse_uint_str(type_name, s)?),
        },
        _ => return Err(PermitError::invalid_value(type_name, value)),
    };

    // Representable range is [-2^(bits-1), 2^(bits-1) - 1]
    let limit = U256::one() << (bits - 1);
    if (!negative && magnitude >= limit) || (negative && magnitude > limit) {
        return Err(PermitError::out_of_range(type_name, value));
    }

    if negative && !magnitude.is_zero() {
        Ok((!magnitude).overflowing_add(U256::one()).0)
    } else {
        Ok(magnitude)
    }
}

/// Parse a hex string (with or without 0x prefix)
fn parse_hex(type_name: &str, s: &str) -> PermitResult<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = s.strip_prefix("0X").unwrap_or(s);

    hex::decode(s).map_err(|e| PermitError::invalid_value(type_name, format!("invalid hex: {}", e)))
}

/// Compute keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}
