//! EIP-712 Signing
//!
//! ECDSA signing and recovery over secp256k1 for EIP-712 digests.
//!
//! Nonces come from libsecp256k1's default RFC 6979 derivation, so signing
//! the same digest with the same key always yields the same `(r, s, v)`.
//! libsecp256k1 also emits canonical low-s signatures only.

use super::encoder::keccak256;
use super::hasher::hash_typed_data;
use super::types::{RawSignature, TypedData};
use crate::error::{PermitError, PermitResult};
use ethers_core::types::Address;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;
use zeroize::Zeroizing;

/// secp256k1 group order n, halved (floor). A canonical s is <= this.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// A secp256k1 signing key
///
/// The scalar is validated on construction and zeroed when dropped. The
/// derived address is cached so callers never need the raw bytes.
#[derive(Clone)]
pub struct PrivateKey {
    bytes: Zeroizing<[u8; 32]>,
    address: Address,
}

impl PrivateKey {
    /// Build a key from 32 raw bytes
    ///
    /// Fails if the length is wrong or the scalar is not in `[1, n-1]`.
    pub fn from_bytes(bytes: &[u8]) -> PermitResult<Self> {
        if bytes.len() != 32 {
            return Err(PermitError::InvalidPrivateKey(format!(
                "invalid private key length: expected 32, got {}",
                bytes.len()
            )));
        }

        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(bytes);

        let secp = Secp256k1::signing_only();
        let mut secret_key = SecretKey::from_slice(key.as_ref())
            .map_err(|_| PermitError::InvalidPrivateKey("scalar is zero or not below the curve order".to_string()))?;
        let address = public_key_to_address(&PublicKey::from_secret_key(&secp, &secret_key));
        secret_key.non_secure_erase();

        Ok(Self { bytes: key, address })
    }

    /// Build a key from a hex string, with or without `0x`
    pub fn from_hex(hex_key: &str) -> PermitResult<Self> {
        let trimmed = hex_key.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let decoded = Zeroizing::new(
            hex::decode(hex_part)
                .map_err(|e| PermitError::InvalidPrivateKey(format!("invalid hex: {}", e)))?,
        );
        Self::from_bytes(&decoded)
    }

    /// The Ethereum address controlled by this key
    pub fn address(&self) -> Address {
        self.address
    }

    fn secret_key(&self) -> PermitResult<SecretKey> {
        SecretKey::from_slice(self.bytes.as_ref())
            .map_err(|e| PermitError::InvalidPrivateKey(e.to_string()))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("address", &checksum_address(&self.address))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Sign EIP-712 typed data
pub fn sign_typed_data(typed_data: &TypedData, private_key: &PrivateKey) -> PermitResult<RawSignature> {
    let hash = hash_typed_data(typed_data)?;
    sign_hash(&hash, private_key)
}

/// Sign a pre-computed 32-byte digest
pub fn sign_hash(digest: &[u8], private_key: &PrivateKey) -> PermitResult<RawSignature> {
    if digest.len() != 32 {
        return Err(PermitError::InvalidDigest(format!(
            "expected 32 bytes, got {}",
            digest.len()
        )));
    }

    let secp = Secp256k1::signing_only();
    let mut secret_key = private_key.secret_key()?;

    let message = Message::from_digest_slice(digest)
        .map_err(|e| PermitError::InvalidDigest(e.to_string()))?;

    let (recovery_id, signature) = secp
        .sign_ecdsa_recoverable(&message, &secret_key)
        .serialize_compact();
    secret_key.non_secure_erase();

    // Ids 2 and 3 need r >= n, which a real signer never produces
    let recovery_id = u8::try_from(recovery_id.to_i32())
        .ok()
        .filter(|id| *id <= 1)
        .ok_or_else(|| {
            PermitError::SigningError(format!("unexpected recovery id {}", recovery_id.to_i32()))
        })?;

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&signature[0..32]);
    s.copy_from_slice(&signature[32..64]);

    Ok(RawSignature::new(r, s, recovery_id))
}

/// Recover the signer's address from a digest and raw signature
pub fn recover_address(digest: &[u8; 32], signature: &RawSignature) -> PermitResult<Address> {
    let secp = Secp256k1::verification_only();

    let recovery_id = RecoveryId::from_i32(i32::from(signature.recovery_id))
        .map_err(|e| PermitError::InvalidSignature(e.to_string()))?;

    let recoverable_sig = RecoverableSignature::from_compact(&signature.compact(), recovery_id)
        .map_err(|e| PermitError::InvalidSignature(e.to_string()))?;

    let message = Message::from_digest(*digest);

    let public_key = secp
        .recover_ecdsa(&message, &recoverable_sig)
        .map_err(|e| PermitError::InvalidSignature(e.to_string()))?;

    Ok(public_key_to_address(&public_key))
}

/// Check whether a signature recovers to `expected_address`
pub fn verify_signature(
    digest: &[u8; 32],
    signature: &RawSignature,
    expected_address: &Address,
) -> PermitResult<bool> {
    Ok(recover_address(digest, signature)? == *expected_address)
}

/// Whether `s` lies in the lower half of the curve order
pub fn is_low_s(s: &[u8; 32]) -> bool {
    // Big-endian arrays of equal length compare numerically
    *s <= SECP256K1_HALF_ORDER
}

/// Convert a secp256k1 public key to an Ethereum address
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    // Get the uncompressed public key (65 bytes, starting with 0x04)
    let pubkey_bytes = public_key.serialize_uncompressed();
    let hash = keccak256(&pubkey_bytes[1..]);

    Address::from_slice(&hash[12..32])
}

/// Compute the EIP-55 checksum address
pub fn checksum_address(address: &Address) -> String {
    let lower = hex::encode(address.as_bytes());
    let hash = keccak256(lower.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    checksummed
}

#[cfg(test)]
mod signer_tests {
    use super::*;
    use crate::eip712::encoder::parse_address;

    const TEST_KEY: &str = "0xb43b11ebe0523b0c7dc1ef3ef37cc1ce1924fbdbd3bbfcd615dbef5d52ab6fb7";

    #[test]
    fn test_address_derivation() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        assert_eq!(
            checksum_address(&key.address()),
            "0xf055561573121ACBb6B0F78D69A1766Cd996AA56"
        );

        // Private key 1 maps to the generator point
        let mut one = [0u8; 32];
        one[31] = 1;
        let key = PrivateKey::from_bytes(&one).unwrap();
        assert_eq!(
            key.address(),
            parse_address("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf").unwrap()
        );
    }

    #[test]
    fn test_invalid_private_keys() {
        assert!(matches!(
            PrivateKey::from_bytes(&[0u8; 32]),
            Err(PermitError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            PrivateKey::from_bytes(&[0xffu8; 32]),
            Err(PermitError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            PrivateKey::from_bytes(&[1u8; 31]),
            Err(PermitError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            PrivateKey::from_hex("0xnothex"),
            Err(PermitError::InvalidPrivateKey(_))
        ));

        // The curve order itself is out of range
        let order = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";
        assert!(matches!(
            PrivateKey::from_hex(order),
            Err(PermitError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("b43b11eb"));
    }

    #[test]
    fn test_sign_rejects_bad_digest_length() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        assert!(matches!(
            sign_hash(&[0u8; 31], &key),
            Err(PermitError::InvalidDigest(_))
        ));
        assert!(matches!(
            sign_hash(&[0u8; 33], &key),
            Err(PermitError::InvalidDigest(_))
        ));
    }

    #[test]
    fn test_rfc6979_reference_vector() {
        // Widely published secp256k1 vector: key = 1, digest = sha256("Satoshi Nakamoto")
        let mut one = [0u8; 32];
        one[31] = 1;
        let key = PrivateKey::from_bytes(&one).unwrap();
        let digest = hex::decode("a0dc65ffca799873cbea0ac274015b9526505daaaed385155425f7337704883e")
            .unwrap();

        let sig = sign_hash(&digest, &key).unwrap();
        assert_eq!(
            hex::encode(sig.r),
            "934b1ea10a4b3c1757e2b0c017d0b6143ce3c9a7e6a4a49860d7a6ab210ee3d8"
        );
        assert_eq!(
            hex::encode(sig.s),
            "2442ce9d2b916064108014783e923ec36b49743e2ffa1c4496f01a512aafd9e5"
        );
    }

    #[test]
    fn test_sign_and_recover() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let digest = keccak256(b"permit");

        let sig = sign_hash(&digest, &key).unwrap();
        assert!(sig.recovery_id <= 1);
        assert!(is_low_s(&sig.s));
        assert_eq!(recover_address(&digest, &sig).unwrap(), key.address());
        assert!(verify_signature(&digest, &sig, &key.address()).unwrap());

        let other = keccak256(b"other");
        assert!(!verify_signature(&other, &sig, &key.address()).unwrap_or(false));
    }

    #[test]
    fn test_is_low_s_boundary() {
        assert!(is_low_s(&SECP256K1_HALF_ORDER));

        let mut above = SECP256K1_HALF_ORDER;
        above[31] += 1;
        assert!(!is_low_s(&above));
        assert!(!is_low_s(&[0xff; 32]));
    }

    #[test]
    fn test_checksum_address() {
        let addr = parse_address("cd2a3d9f938e13cd947ec05abc7fe734df8dd826").unwrap();
        assert_eq!(
            checksum_address(&addr),
            "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"
        );
    }
}
