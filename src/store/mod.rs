//! Storage ports for charter state.
//!
//! No registry owns global statics; every mapping lives behind one of these
//! traits so the backing store (in-memory or sled) is swappable per
//! deployment and mockable in tests.

pub mod memory;
pub mod persistence;

use crate::error::StorageError;
use crate::types::{PrincipalId, PrincipalKind, Rule, RuleSetHash, Version};
use serde::{Deserialize, Serialize};

/// Membership record for one principal.
///
/// `Default` is the unregistered zero state a record resets to on departure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub registered: bool,
    pub kind: PrincipalKind,
    pub version: Version,
}

/// Per-rule agreement entry for one agent.
///
/// A rule is in one of three states: absent (never agreed), agreed, or
/// explicitly revoked (present with `agreed == false`). The attestation flag
/// is the separately-set compliance status used in attested mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementEntry {
    pub agreed: bool,
    pub attested: bool,
}

/// Version registry storage: hash to version, version to rules, counter.
pub trait VersionStore: Send + Sync {
    fn version_of(&self, hash: &RuleSetHash) -> Result<Option<Version>, StorageError>;

    fn rules_of(&self, version: Version) -> Result<Option<Vec<Rule>>, StorageError>;

    /// Highest version assigned so far; 0 before the first registration.
    fn current_version(&self) -> Result<Version, StorageError>;

    /// Persist a new version. Both mappings and the counter must land
    /// atomically; a failed insert leaves no partial keys behind.
    fn insert_version(
        &self,
        hash: RuleSetHash,
        version: Version,
        rules: &[Rule],
    ) -> Result<(), StorageError>;
}

/// Agreement storage behind a single agent's oracle.
pub trait AgreementStore: Send + Sync {
    fn get(&self, rule: &Rule) -> Result<Option<AgreementEntry>, StorageError>;

    fn put(&self, rule: &Rule, entry: AgreementEntry) -> Result<(), StorageError>;
}

/// Membership record storage.
pub trait MembershipStore: Send + Sync {
    fn get(&self, principal: &PrincipalId) -> Result<Option<MemberRecord>, StorageError>;

    fn put(&self, principal: &PrincipalId, record: &MemberRecord) -> Result<(), StorageError>;

    /// Drop the record entirely; a removed principal is indistinguishable
    /// from one that never registered.
    fn remove(&self, principal: &PrincipalId) -> Result<(), StorageError>;

    fn list(&self) -> Result<Vec<(PrincipalId, MemberRecord)>, StorageError>;
}
