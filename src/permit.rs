//! Permit Signatures
//!
//! Typed API for the `Permit` message that lets a holder approve a spender
//! off-chain:
//!
//! `Permit(address holder,address spender,uint256 nonce,uint256 expiry,bool allowed)`
//!
//! Every call takes the key explicitly; nothing here holds key material
//! between calls.

use crate::config::DeploymentConfig;
use crate::eip712::{
    checksum_address, decode_signature, digest, encode_signature, get_pre_image, is_low_s,
    parse_address, parse_uint_str, recover_address, sign_hash, Eip712Domain, Eip712PreImage,
    PermitSignature, PrivateKey, TypedData, TypedDataField, Types, EIP712_DOMAIN_TYPE,
};
use crate::error::{PermitError, PermitResult};
use crate::{log_debug, log_warn};
use ethers_core::types::{Address, U256};

/// Primary type name of the permit message
pub const PERMIT_TYPE: &str = "Permit";

/// The `Permit` type definition, in encoding order
pub fn permit_fields() -> Vec<TypedDataField> {
    vec![
        TypedDataField::new("holder", "address"),
        TypedDataField::new("spender", "address"),
        TypedDataField::new("nonce", "uint256"),
        TypedDataField::new("expiry", "uint256"),
        TypedDataField::new("allowed", "bool"),
    ]
}

/// Types map for permit messages
pub fn permit_types() -> Types {
    let mut types = Types::new();
    types.insert(PERMIT_TYPE.to_string(), permit_fields());
    types
}

/// A single authorization to be signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitMessage {
    pub holder: Address,
    pub spender: Address,
    pub nonce: U256,
    pub expiry: U256,
    pub allowed: bool,
}

impl PermitMessage {
    pub fn new(holder: Address, spender: Address, nonce: U256, expiry: U256, allowed: bool) -> Self {
        Self {
            holder,
            spender,
            nonce,
            expiry,
            allowed,
        }
    }

    /// Build a message whose holder is the address of `key`
    pub fn for_key(
        key: &PrivateKey,
        spender: Address,
        nonce: U256,
        expiry: U256,
        allowed: bool,
    ) -> Self {
        Self::new(key.address(), spender, nonce, expiry, allowed)
    }

    /// Message value for the generic struct encoder
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "holder": format!("{:#x}", self.holder),
            "spender": format!("{:#x}", self.spender),
            "nonce": self.nonce.to_string(),
            "expiry": self.expiry.to_string(),
            "allowed": self.allowed,
        })
    }

    /// Full `eth_signTypedData_v4` document for this message
    pub fn typed_data(&self, domain: &Eip712Domain) -> TypedData {
        let mut types = permit_types();
        types.insert(EIP712_DOMAIN_TYPE.to_string(), Eip712Domain::type_fields());

        TypedData {
            types,
            primary_type: PERMIT_TYPE.to_string(),
            domain: domain.clone(),
            message: self.to_value(),
        }
    }
}

/// Signing digest for a permit under `domain`
pub fn permit_digest(domain: &Eip712Domain, message: &PermitMessage) -> PermitResult<[u8; 32]> {
    digest(domain, PERMIT_TYPE, &message.to_value(), &permit_types())
}

/// Separator, struct hash and digest of a permit
pub fn permit_pre_image(
    domain: &Eip712Domain,
    message: &PermitMessage,
) -> PermitResult<Eip712PreImage> {
    get_pre_image(&message.typed_data(domain))
}

/// Sign a permit and format it as `(r, s, v)`
///
/// The message holder must be the address of `key`; a contract would
/// otherwise recover a different signer and reject the permit.
pub fn generate_permit_signature(
    key: &PrivateKey,
    domain: &Eip712Domain,
    message: &PermitMessage,
) -> PermitResult<PermitSignature> {
    if message.holder != key.address() {
        return Err(PermitError::HolderMismatch {
            holder: checksum_address(&message.holder),
            signer: checksum_address(&key.address()),
        });
    }

    let digest = permit_digest(domain, message)?;
    log_debug!(
        "permit",
        "signing permit",
        chain_id = domain.chain_id,
        contract = checksum_address(&domain.verifying_contract),
        holder = checksum_address(&message.holder),
        spender = checksum_address(&message.spender),
        digest = format!("0x{}", hex::encode(digest)),
    );

    let raw = sign_hash(&digest, key)?;
    encode_signature(&raw)
}

/// String-boundary form of [`generate_permit_signature`]
///
/// Addresses may be checksummed or not. `nonce` and `expiry` are decimal or
/// `0x` hex strings. The holder is derived from the key.
pub fn generate_permit_signature_from_parts(
    private_key_hex: &str,
    domain: &Eip712Domain,
    spender: &str,
    nonce: &str,
    expiry: &str,
    allowed: bool,
) -> PermitResult<PermitSignature> {
    let key = PrivateKey::from_hex(private_key_hex)?;
    let message = PermitMessage::for_key(
        &key,
        parse_address(spender)?,
        parse_uint_str("uint256", nonce)?,
        parse_uint_str("uint256", expiry)?,
        allowed,
    );
    generate_permit_signature(&key, domain, &message)
}

/// Recover the address that signed a permit
pub fn recover_permit_signer(
    domain: &Eip712Domain,
    message: &PermitMessage,
    signature: &PermitSignature,
) -> PermitResult<Address> {
    let digest = permit_digest(domain, message)?;
    recover_address(&digest, &decode_signature(signature)?)
}

/// Check a permit signature the way the deployment's contract would
///
/// A high-s signature is refused when the deployment expects low-s.
pub fn verify_permit_signature(
    config: &DeploymentConfig,
    message: &PermitMessage,
    signature: &PermitSignature,
) -> PermitResult<bool> {
    let raw = decode_signature(signature)?;
    if config.expect_low_s && !is_low_s(&raw.s) {
        log_warn!("permit", "rejecting high-s signature", holder = checksum_address(&message.holder));
        return Ok(false);
    }

    Ok(recover_permit_signer(&config.domain, message, signature)? == message.holder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eip712::{hash_typed_data, type_hash, uint_to_hex32};

    const TEST_KEY: &str = "0xb43b11ebe0523b0c7dc1ef3ef37cc1ce1924fbdbd3bbfcd615dbef5d52ab6fb7";
    const SPENDER: &str = "0xdd2d5D3f7f1b35b7A0601D6A00DbB7D44Af58479";

    fn stablecoin_domain() -> Eip712Domain {
        Eip712Domain::new(
            "Stablecoin",
            "1",
            99,
            parse_address("0x11Ee1eeF5D446D07Cf26941C7F2B4B1Dfb9D030B").unwrap(),
        )
    }

    fn message(key: &PrivateKey, expiry: u64) -> PermitMessage {
        PermitMessage::for_key(
            key,
            parse_address(SPENDER).unwrap(),
            U256::zero(),
            U256::from(expiry),
            true,
        )
    }

    #[test]
    fn test_permit_type_hash() {
        let hash = type_hash(PERMIT_TYPE, &permit_types()).unwrap();
        assert_eq!(
            hex::encode(hash),
            "ea2aa0a1be11a07ed86d755c93467f4f82362b452371d1ba94d1715123511acb"
        );
    }

    #[test]
    fn test_golden_vector_expiry_zero() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let sig = generate_permit_signature(&key, &stablecoin_domain(), &message(&key, 0)).unwrap();

        assert_eq!(
            sig.r,
            "0xce91806c03aa47358277c5d1d074f5edd1ca38e1559b66bafb1a02d7c667810a"
        );
        assert_eq!(
            sig.s,
            "0x0d62ea0cde1c891742ade73cd1412fe1a46c23ba28fd788712a864a7ae953a92"
        );
        assert_eq!(sig.v, 27);
    }

    #[test]
    fn test_golden_vector_with_expiry() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let sig =
            generate_permit_signature(&key, &stablecoin_domain(), &message(&key, 604414800)).unwrap();

        assert_eq!(
            sig.r,
            "0x39e8b7b648bc42ade928ac85d65650d697bfaa05097a25f5477cc0bba997bbd1"
        );
        assert_eq!(
            sig.s,
            "0x3d587b25a7104b7e3f2640e871cba282f4cec27a4e1a6dccbab6ec3b2e858568"
        );
        assert_eq!(sig.v, 27);
    }

    #[test]
    fn test_from_parts_matches_typed_api() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let typed =
            generate_permit_signature(&key, &stablecoin_domain(), &message(&key, 604414800)).unwrap();

        // Lower-case spender and hex expiry normalize to the same message
        let parts = generate_permit_signature_from_parts(
            TEST_KEY,
            &stablecoin_domain(),
            &SPENDER.to_lowercase(),
            "0",
            "0x2406a350",
            true,
        )
        .unwrap();

        assert_eq!(typed, parts);
    }

    #[test]
    fn test_from_parts_rejects_bad_input() {
        let domain = stablecoin_domain();
        assert!(matches!(
            generate_permit_signature_from_parts(TEST_KEY, &domain, "0xdd2d", "0", "0", true),
            Err(PermitError::InvalidAddress(_))
        ));
        assert!(matches!(
            generate_permit_signature_from_parts(
                TEST_KEY,
                &domain,
                SPENDER,
                "0",
                "115792089237316195423570985008687907853269984665640564039457584007913129639936",
                true
            ),
            Err(PermitError::IntegerOutOfRange { .. })
        ));
        assert!(matches!(
            generate_permit_signature_from_parts("0x00", &domain, SPENDER, "0", "0", true),
            Err(PermitError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_holder_mismatch() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let mut msg = message(&key, 0);
        msg.holder = parse_address(SPENDER).unwrap();

        assert!(matches!(
            generate_permit_signature(&key, &stablecoin_domain(), &msg),
            Err(PermitError::HolderMismatch { .. })
        ));
    }

    #[test]
    fn test_digest_matches_typed_data_document() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let msg = message(&key, 0);
        let domain = stablecoin_domain();

        let typed = msg.typed_data(&domain);
        typed.validate().unwrap();
        assert_eq!(
            hash_typed_data(&typed).unwrap(),
            permit_digest(&domain, &msg).unwrap()
        );

        let pre_image = permit_pre_image(&domain, &msg).unwrap();
        assert_eq!(
            hex::encode(pre_image.domain_separator),
            "bd4ece82614f4d80e75c217327b20269bb88dee38dd5b02cd4cc75074a07017e"
        );
        assert_eq!(
            hex::encode(pre_image.final_hash),
            "57069127306f9c8c2fd7491500dfeb93bb0a63f0adb5d66db7776f8337698563"
        );
    }

    #[test]
    fn test_domain_is_bound_into_digest() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let msg = message(&key, 0);
        let base = permit_digest(&stablecoin_domain(), &msg).unwrap();

        let mut other_chain = stablecoin_domain();
        other_chain.chain_id = 1;
        assert_ne!(base, permit_digest(&other_chain, &msg).unwrap());

        let mut other_version = stablecoin_domain();
        other_version.version = "2".to_string();
        assert_ne!(base, permit_digest(&other_version, &msg).unwrap());
    }

    #[test]
    fn test_verify_and_recover() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let msg = message(&key, 0);
        let config = DeploymentConfig::new(stablecoin_domain());
        let sig = generate_permit_signature(&key, &config.domain, &msg).unwrap();

        assert_eq!(
            recover_permit_signer(&config.domain, &msg, &sig).unwrap(),
            key.address()
        );
        assert!(verify_permit_signature(&config, &msg, &sig).unwrap());

        let mut revoked = msg.clone();
        revoked.allowed = false;
        assert!(!verify_permit_signature(&config, &revoked, &sig).unwrap());
    }

    #[test]
    fn test_high_s_policy() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let msg = message(&key, 0);
        let mut config = DeploymentConfig::new(stablecoin_domain());
        let sig = generate_permit_signature(&key, &config.domain, &msg).unwrap();

        // Malleate: s' = n - s with the recovery id flipped recovers the same key
        let order = U256::from_big_endian(
            &hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141").unwrap(),
        );
        let s = crate::eip712::hex32_to_uint(&sig.s).unwrap();
        let malleated = PermitSignature {
            r: sig.r.clone(),
            s: uint_to_hex32(order - s),
            v: if sig.v == 27 { 28 } else { 27 },
        };

        assert!(!verify_permit_signature(&config, &msg, &malleated).unwrap());

        config.expect_low_s = false;
        assert!(verify_permit_signature(&config, &msg, &malleated).unwrap());
    }
}
