//! Permit Signer Library
//!
//! Off-chain EIP-712 signatures for `Permit` approvals, where a token holder
//! authorizes a spender without sending a transaction.
//!
//! # Architecture
//!
//! This crate provides:
//! - **eip712**: Generic typed-data encoding, hashing, signing and `(r, s, v)` formatting
//! - **permit**: The typed `Permit` message and its signing entry points
//! - **config**: Deployment domain loaded from JSON or `PERMIT_*` environment variables
//! - **utils**: Redacting stderr logger
//!
//! # Security
//!
//! Private key bytes live in `zeroize::Zeroizing` buffers and are wiped on drop.
//! The key is passed into every signing call; nothing in the crate stores one.
//!
//! # Example
//!
//! ```rust,ignore
//! use permit_signer::{generate_permit_signature, DeploymentConfig, PermitMessage, PrivateKey};
//!
//! let config = DeploymentConfig::from_file("config/stablecoin.json")?;
//! let key = PrivateKey::from_hex(&key_hex)?;
//! let message = PermitMessage::for_key(&key, spender, 0.into(), 0.into(), true);
//! let sig = generate_permit_signature(&key, config.domain(), &message)?;
//! println!("{} {} {}", sig.r, sig.s, sig.v);
//! ```

pub mod config;
pub mod eip712;
pub mod error;
pub mod permit;
pub mod utils;

pub use config::DeploymentConfig;
pub use error::{ErrorCode, ErrorReport, PermitError, PermitResult};

pub use eip712::{
    checksum_address, keccak256, parse_address, parse_uint_str, Eip712Domain, PermitSignature,
    PrivateKey, TypedData,
};

pub use permit::{
    generate_permit_signature, generate_permit_signature_from_parts, permit_digest,
    recover_permit_signer, verify_permit_signature, PermitMessage, PERMIT_TYPE,
};
