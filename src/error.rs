//! Unified error types for the permit signer
//!
//! Every fallible operation returns [`PermitError`]. Each variant maps to a
//! stable [`ErrorCode`] so the CLI can report failures as JSON.

use serde::{Deserialize, Serialize};

/// Main error type for all permit signing operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermitError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Integer out of range for {type_name}: {value}")]
    IntegerOutOfRange { type_name: String, value: String },

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Value encoding error: {0}")]
    ValueEncodingError(String),

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Invalid primary type: {0}")]
    InvalidPrimaryType(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid value for type {type_name}: {value}")]
    InvalidValue { type_name: String, value: String },

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Holder {holder} does not match signing key address {signer}")]
    HolderMismatch { holder: String, signer: String },

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PermitError {
    pub fn out_of_range(type_name: impl Into<String>, value: impl ToString) -> Self {
        Self::IntegerOutOfRange {
            type_name: type_name.into(),
            value: value.to_string(),
        }
    }

    pub fn invalid_value(type_name: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidValue {
            type_name: type_name.into(),
            value: value.to_string(),
        }
    }

    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            PermitError::InvalidAddress(_) => ErrorCode::InvalidAddress,
            PermitError::IntegerOutOfRange { .. } => ErrorCode::IntegerOutOfRange,
            PermitError::InvalidPrivateKey(_) => ErrorCode::InvalidPrivateKey,
            PermitError::ValueEncodingError(_) => ErrorCode::ValueEncodingError,
            PermitError::InvalidDigest(_) => ErrorCode::InvalidDigest,
            PermitError::InvalidType(_) | PermitError::InvalidPrimaryType(_) => {
                ErrorCode::InvalidType
            }
            PermitError::MissingField(_) | PermitError::InvalidValue { .. } => {
                ErrorCode::InvalidInput
            }
            PermitError::InvalidJson(_) => ErrorCode::JsonError,
            PermitError::InvalidSignature(_) => ErrorCode::InvalidSignature,
            PermitError::HolderMismatch { .. } => ErrorCode::HolderMismatch,
            PermitError::SigningError(_) => ErrorCode::SigningFailed,
            PermitError::Config(_) => ErrorCode::ConfigError,
        }
    }
}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors
    InvalidInput,
    InvalidAddress,
    InvalidPrivateKey,
    InvalidType,
    IntegerOutOfRange,

    // Crypto errors
    InvalidDigest,
    InvalidSignature,
    SigningFailed,
    HolderMismatch,

    // Encoding errors
    ValueEncodingError,
    JsonError,

    ConfigError,
}

/// Serializable error report, used for `--json` CLI output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&PermitError> for ErrorReport {
    fn from(e: &PermitError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

/// Result type alias for permit operations
pub type PermitResult<T> = Result<T, PermitError>;

// Conversions from common error types

impl From<serde_json::Error> for PermitError {
    fn from(e: serde_json::Error) -> Self {
        PermitError::InvalidJson(e.to_string())
    }
}

impl From<std::io::Error> for PermitError {
    fn from(e: std::io::Error) -> Self {
        PermitError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_report_serialization() {
        let err = PermitError::out_of_range("uint256", "2^256");
        let report = ErrorReport::from(&err);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("integer_out_of_range"));
        assert!(json.contains("uint256"));
    }

    #[test]
    fn test_codes_are_distinct_for_spec_kinds() {
        assert_eq!(
            PermitError::InvalidAddress("x".into()).code(),
            ErrorCode::InvalidAddress
        );
        assert_eq!(
            PermitError::ValueEncodingError("x".into()).code(),
            ErrorCode::ValueEncodingError
        );
        assert_eq!(
            PermitError::InvalidPrivateKey("x".into()).code(),
            ErrorCode::InvalidPrivateKey
        );
    }
}
