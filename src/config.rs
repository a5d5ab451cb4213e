//! Deployment Configuration
//!
//! The signing domain is deployment data, not protocol: the same signer
//! serves any verifying contract on any chain. A deployment is described by
//! a small JSON document or by `PERMIT_*` environment variables.

use crate::eip712::{parse_address, Eip712Domain};
use crate::error::{PermitError, PermitResult};
use ethers_core::types::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable names read by [`DeploymentConfig::from_env`]
pub const ENV_DOMAIN_NAME: &str = "PERMIT_DOMAIN_NAME";
pub const ENV_DOMAIN_VERSION: &str = "PERMIT_DOMAIN_VERSION";
pub const ENV_CHAIN_ID: &str = "PERMIT_CHAIN_ID";
pub const ENV_VERIFYING_CONTRACT: &str = "PERMIT_VERIFYING_CONTRACT";

/// Settings for one verifying contract deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    /// Signing domain of the verifying contract
    pub domain: Eip712Domain,

    /// Whether the verifying contract rejects high-s signatures
    #[serde(default = "default_expect_low_s")]
    pub expect_low_s: bool,
}

fn default_expect_low_s() -> bool {
    true
}

impl DeploymentConfig {
    pub fn new(domain: Eip712Domain) -> Self {
        Self {
            domain,
            expect_low_s: true,
        }
    }

    /// Parse a configuration document
    pub fn from_json(json: &str) -> PermitResult<Self> {
        serde_json::from_str(json).map_err(|e| PermitError::Config(e.to_string()))
    }

    /// Load a configuration document from disk
    pub fn from_file(path: impl AsRef<Path>) -> PermitResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PermitError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&contents)
    }

    /// Build a configuration from `PERMIT_*` environment variables
    pub fn from_env() -> PermitResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> PermitResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PermitError::Config(format!("{} is not set", key)))
        };

        let chain_id_raw = required(ENV_CHAIN_ID)?;
        let chain_id = chain_id_raw
            .trim()
            .parse::<u64>()
            .map_err(|_| PermitError::Config(format!("{} is not a chain id: {}", ENV_CHAIN_ID, chain_id_raw)))?;

        let verifying_contract: Address = parse_address(&required(ENV_VERIFYING_CONTRACT)?)?;

        Ok(Self::new(Eip712Domain::new(
            required(ENV_DOMAIN_NAME)?,
            required(ENV_DOMAIN_VERSION)?,
            chain_id,
            verifying_contract,
        )))
    }

    /// Validate settings, returning a list of problems
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.domain.name.trim().is_empty() {
            issues.push("domain name is empty".to_string());
        }
        if self.domain.version.trim().is_empty() {
            issues.push("domain version is empty".to_string());
        }
        if self.domain.chain_id == 0 {
            issues.push("chain id 0 is not a valid EIP-155 chain".to_string());
        }
        if self.domain.verifying_contract.is_zero() {
            issues.push("verifying contract is the zero address".to_string());
        }

        issues
    }

    /// Validate and turn any problems into an error
    pub fn ensure_valid(&self) -> PermitResult<()> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(PermitError::Config(issues.join("; ")))
        }
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }
}
