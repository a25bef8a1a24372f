//! Error types for the charter components.
//!
//! One enum per component. Data errors carry the offending hash or version so
//! callers can self-correct; compliance errors are scoped to a single rule and
//! surface on the first failing rule.

use crate::types::{PrincipalId, Rule, RuleSetHash, Version};
use thiserror::Error;

/// Storage backend failures, independent of which store trait raised them.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("failed to encode record: {0}")]
    Encode(String),

    #[error("failed to decode record: {0}")]
    Decode(String),
}

impl From<sled::Error> for StorageError {
    fn from(e: sled::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}

/// Failures raised by the rule-set version registry.
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("rule set is empty")]
    EmptyRuleSet,

    #[error("rule set {} is already registered as version {}", hex::encode(.hash), .version)]
    DuplicateRuleSet { hash: RuleSetHash, version: Version },

    #[error("caller {0} is not authorized to register rule-set versions")]
    Unauthorized(PrincipalId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures raised by a per-agent compliance oracle.
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("rule {0} is already added")]
    RuleAlreadyAdded(Rule),

    #[error("rule {0} not found")]
    RuleNotFound(Rule),

    #[error("agent has not agreed to rule {0}")]
    RuleNotAgreed(Rule),

    #[error("agent agreed to rule {0} but compliance is not attested")]
    RuleNotCompliant(Rule),

    #[error("caller {0} is not the oracle controller")]
    Unauthorized(PrincipalId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures raised by the membership registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("principal {0} is already registered")]
    AlreadyRegistered(PrincipalId),

    #[error("principal {0} is not registered")]
    NotRegistered(PrincipalId),

    #[error("unknown rule set {}", hex::encode(.0))]
    UnknownRuleSet(RuleSetHash),

    #[error("rule set resolves to version {claimed} but principal is registered under version {registered}")]
    VersionMismatch { claimed: Version, registered: Version },

    #[error("system is paused")]
    SystemPaused,

    #[error("agent registration requires a compliance oracle")]
    MissingOracle,

    #[error("caller {0} is not authorized for this operation")]
    Unauthorized(PrincipalId),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Compliance(#[from] ComplianceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
