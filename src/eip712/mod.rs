//! EIP-712 Typed Data Signing
//!
//! Implementation of EIP-712 typed structured data hashing and signing.
//! The pipeline is one-way: domain + message -> digest ([`hasher`]) ->
//! raw signature ([`signer`]) -> formatted `(r, s, v)` ([`codec`]).
//!
//! # Reference
//! - <https://eips.ethereum.org/EIPS/eip-712>
//!
//! # Example
//! ```rust,ignore
//! use permit_signer::eip712::{TypedData, PrivateKey, hash_typed_data, sign_hash, encode_signature};
//!
//! let typed_data = TypedData::from_json(json_string)?;
//! let hash = hash_typed_data(&typed_data)?;
//! let signature = encode_signature(&sign_hash(&hash, &private_key)?)?;
//! ```

pub mod types;
pub mod encoder;
pub mod hasher;
pub mod signer;
pub mod codec;

pub use types::*;
pub use encoder::*;
pub use hasher::*;
pub use signer::*;
pub use codec::*;
