//! EIP-712 Type Definitions
//!
//! Core data structures for EIP-712 typed data signing.

use crate::error::{PermitError, PermitResult};
use ethers_core::types::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Name of the reserved domain struct type
pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

/// A field in a struct type definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypedDataField {
    /// The name of the field
    pub name: String,
    /// The type of the field (e.g., "address", "uint256", "bytes32")
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedDataField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Struct type name -> ordered field list
///
/// Field order inside each definition is significant: it fixes both the
/// type string and the order in which values are encoded.
pub type Types = BTreeMap<String, Vec<TypedDataField>>;

/// The EIP-712 domain separator data
///
/// All four fields are always present; this is the domain shape permit
/// verifying contracts hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    /// The human-readable name of the signing domain
    pub name: String,

    /// The current major version of the signing domain
    pub version: String,

    /// The EIP-155 chain ID
    #[serde(deserialize_with = "deserialize_chain_id")]
    pub chain_id: u64,

    /// The address of the contract that will verify the signature
    #[serde(
        serialize_with = "serialize_address",
        deserialize_with = "deserialize_address"
    )]
    pub verifying_contract: Address,
}

impl Eip712Domain {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// The `EIP712Domain` type definition, in canonical field order
    pub fn type_fields() -> Vec<TypedDataField> {
        vec![
            TypedDataField::new("name", "string"),
            TypedDataField::new("version", "string"),
            TypedDataField::new("chainId", "uint256"),
            TypedDataField::new("verifyingContract", "address"),
        ]
    }

    /// The domain as a message value for the generic struct encoder
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "version": self.version,
            "chainId": self.chain_id,
            "verifyingContract": format!("{:#x}", self.verifying_contract),
        })
    }
}

fn serialize_address<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&super::signer::checksum_address(address))
}

fn deserialize_address<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
    let raw = String::deserialize(deserializer)?;
    super::encoder::parse_address(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_chain_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => {
            // Handle hex string like "0x1"
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                u64::from_str_radix(hex, 16).ok()
            } else {
                s.parse().ok()
            }
        }
        _ => None,
    };
    parsed.ok_or_else(|| serde::de::Error::custom(format!("invalid chainId: {}", value)))
}

/// Complete EIP-712 typed data structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    /// Type definitions (struct name -> fields)
    pub types: Types,

    /// The name of the primary type being signed
    pub primary_type: String,

    /// The EIP-712 domain
    pub domain: Eip712Domain,

    /// The actual message data to sign
    pub message: serde_json::Value,
}

impl TypedData {
    /// Parse typed data from a JSON string
    pub fn from_json(json: &str) -> PermitResult<Self> {
        serde_json::from_str(json).map_err(|e| PermitError::InvalidJson(e.to_string()))
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> PermitResult<String> {
        serde_json::to_string(self).map_err(|e| PermitError::InvalidJson(e.to_string()))
    }

    /// Validate the typed data structure
    pub fn validate(&self) -> PermitResult<()> {
        if !self.types.contains_key(&self.primary_type) {
            return Err(PermitError::InvalidPrimaryType(self.primary_type.clone()));
        }

        // A declared domain type must be the shape we actually hash
        if let Some(declared) = self.types.get(EIP712_DOMAIN_TYPE) {
            if *declared != Eip712Domain::type_fields() {
                return Err(PermitError::InvalidType(format!(
                    "{} must be (string name,string version,uint256 chainId,address verifyingContract)",
                    EIP712_DOMAIN_TYPE
                )));
            }
        }

        for fields in self.types.values() {
            for field in fields {
                self.validate_type(&field.type_name)?;
            }
        }

        Ok(())
    }

    /// Check if a type is valid (either a built-in type or defined in types)
    fn validate_type(&self, type_name: &str) -> PermitResult<()> {
        let base_type = super::encoder::get_base_type(type_name);

        if is_atomic_type(base_type) || is_dynamic_type(base_type) {
            return Ok(());
        }
        if self.types.contains_key(base_type) {
            return Ok(());
        }

        Err(PermitError::InvalidType(type_name.to_string()))
    }
}

/// Raw ECDSA signature components as produced by the signer
///
/// `r` and `s` are fixed 32-byte big-endian scalars, so they always fit the
/// on-chain word size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignature {
    /// r component (32 bytes)
    pub r: [u8; 32],
    /// s component (32 bytes)
    pub s: [u8; 32],
    /// Recovery id, 0 or 1
    pub recovery_id: u8,
}

impl RawSignature {
    pub fn new(r: [u8; 32], s: [u8; 32], recovery_id: u8) -> Self {
        Self { r, s, recovery_id }
    }

    /// Compact 64-byte `r || s` form
    pub fn compact(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&self.s);
        bytes
    }
}

/// Check if a type is an atomic (fixed-size) type
pub fn is_atomic_type(type_name: &str) -> bool {
    if type_name == "address" || type_name == "bool" {
        return true;
    }
    integer_bits(type_name).is_some() || fixed_bytes_len(type_name).is_some()
}

/// Check if a type is a dynamic type
pub fn is_dynamic_type(type_name: &str) -> bool {
    type_name == "bytes" || type_name == "string"
}

/// Bit width of a `uintN`/`intN` type, with its signedness
pub(crate) fn integer_bits(type_name: &str) -> Option<(usize, bool)> {
    let (bits, signed) = if let Some(bits) = type_name.strip_prefix("uint") {
        (bits, false)
    } else if let Some(bits) = type_name.strip_prefix("int") {
        (bits, true)
    } else {
        return None;
    };

    let n: usize = bits.parse().ok()?;
    (n > 0 && n <= 256 && n % 8 == 0).then_some((n, signed))
}

/// Length of a fixed-size `bytesN` type
pub(crate) fn fixed_bytes_len(type_name: &str) -> Option<usize> {
    let size = type_name.strip_prefix("bytes")?;
    let n: usize = size.parse().ok()?;
    (n > 0 && n <= 32).then_some(n)
}

#[cfg(test)]
mod type_tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_atomic_types() {
        assert!(is_atomic_type("address"));
        assert!(is_atomic_type("bool"));
        assert!(is_atomic_type("uint256"));
        assert!(is_atomic_type("uint8"));
        assert!(is_atomic_type("int256"));
        assert!(is_atomic_type("bytes32"));
        assert!(is_atomic_type("bytes1"));

        assert!(!is_atomic_type("string"));
        assert!(!is_atomic_type("bytes"));
        assert!(!is_atomic_type("uint"));
        assert!(!is_atomic_type("uint257"));
        assert!(!is_atomic_type("uint7"));
        assert!(!is_atomic_type("bytes33"));
    }

    #[test]
    fn test_dynamic_types() {
        assert!(is_dynamic_type("bytes"));
        assert!(is_dynamic_type("string"));

        assert!(!is_dynamic_type("bytes32"));
        assert!(!is_dynamic_type("address"));
    }

    #[test]
    fn test_domain_json_accepts_hex_chain_id() {
        let json = r#"{
            "name": "Stablecoin",
            "version": "1",
            "chainId": "0x63",
            "verifyingContract": "0x11ee1eef5d446d07cf26941c7f2b4b1dfb9d030b"
        }"#;
        let domain: Eip712Domain = serde_json::from_str(json).unwrap();
        assert_eq!(domain.chain_id, 99);
        assert_eq!(
            domain.verifying_contract,
            Address::from_str("0x11Ee1eeF5D446D07Cf26941C7F2B4B1Dfb9D030B").unwrap()
        );
    }

    #[test]
    fn test_domain_json_rejects_short_contract() {
        let json = r#"{
            "name": "Stablecoin",
            "version": "1",
            "chainId": 99,
            "verifyingContract": "0x11ee1eef5d446d07cf26941c7f2b4b1dfb9d03"
        }"#;
        assert!(serde_json::from_str::<Eip712Domain>(json).is_err());
    }

    #[test]
    fn test_domain_serializes_checksummed() {
        let domain = Eip712Domain::new(
            "Stablecoin",
            "1",
            99,
            Address::from_str("0x11ee1eef5d446d07cf26941c7f2b4b1dfb9d030b").unwrap(),
        );
        let json = serde_json::to_string(&domain).unwrap();
        assert!(json.contains("0x11Ee1eeF5D446D07Cf26941C7F2B4B1Dfb9D030B"));
        assert!(json.contains("\"chainId\":99"));
    }

    #[test]
    fn test_raw_signature_compact() {
        let sig = RawSignature::new([1u8; 32], [2u8; 32], 1);
        let compact = sig.compact();
        assert_eq!(&compact[..32], &[1u8; 32]);
        assert_eq!(&compact[32..], &[2u8; 32]);
    }
}
