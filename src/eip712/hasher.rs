//! EIP-712 Hashing
//!
//! Implements domain separator and struct hashing for EIP-712.

use super::encoder::{encode_data, keccak256};
use super::types::*;
use crate::error::PermitResult;

/// Magic prefix for EIP-712 encoding
pub const EIP712_PREFIX: &[u8; 2] = b"\x19\x01";

/// Types map holding only the `EIP712Domain` definition
pub fn domain_types() -> Types {
    let mut types = Types::new();
    types.insert(EIP712_DOMAIN_TYPE.to_string(), Eip712Domain::type_fields());
    types
}

/// Calculate the domain separator hash
///
/// domainSeparator = hashStruct(eip712Domain)
pub fn domain_separator(domain: &Eip712Domain) -> PermitResult<[u8; 32]> {
    hash_struct(EIP712_DOMAIN_TYPE, &domain.to_value(), &domain_types())
}

/// Hash a struct according to EIP-712
///
/// hashStruct(s) = keccak256(typeHash || encodeData(s))
pub fn hash_struct(
    type_name: &str,
    data: &serde_json::Value,
    types: &Types,
) -> PermitResult<[u8; 32]> {
    let encoded = encode_data(type_name, data, types)?;
    Ok(keccak256(&encoded))
}

/// Combine a domain separator and struct hash into the signing digest
///
/// digest = keccak256("\x19\x01" || domainSeparator || hashStruct(message))
pub fn signing_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut data = [0u8; 2 + 32 + 32];
    data[..2].copy_from_slice(EIP712_PREFIX);
    data[2..34].copy_from_slice(domain_separator);
    data[34..].copy_from_slice(struct_hash);
    keccak256(&data)
}

/// Calculate the final EIP-712 hash for a message of `primary_type`
pub fn digest(
    domain: &Eip712Domain,
    primary_type: &str,
    message: &serde_json::Value,
    types: &Types,
) -> PermitResult<[u8; 32]> {
    Ok(pre_image_parts(domain, primary_type, message, types)?.final_hash)
}

/// Calculate the final EIP-712 hash for signing
pub fn hash_typed_data(typed_data: &TypedData) -> PermitResult<[u8; 32]> {
    Ok(get_pre_image(typed_data)?.final_hash)
}

/// Get the pre-image components (for external signing)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eip712PreImage {
    pub domain_separator: [u8; 32],
    pub struct_hash: [u8; 32],
    pub final_hash: [u8; 32],
}

/// Calculate the pre-image components for EIP-712
pub fn get_pre_image(typed_data: &TypedData) -> PermitResult<Eip712PreImage> {
    typed_data.validate()?;

    pre_image_parts(
        &typed_data.domain,
        &typed_data.primary_type,
        &typed_data.message,
        &typed_data.types,
    )
}

fn pre_image_parts(
    domain: &Eip712Domain,
    primary_type: &str,
    message: &serde_json::Value,
    types: &Types,
) -> PermitResult<Eip712PreImage> {
    let domain_separator = domain_separator(domain)?;
    let struct_hash = hash_struct(primary_type, message, types)?;
    let final_hash = signing_digest(&domain_separator, &struct_hash);

    Ok(Eip712PreImage {
        domain_separator,
        struct_hash,
        final_hash,
    })
}
