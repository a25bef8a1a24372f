//! In-memory store adapters.

use super::{AgreementEntry, AgreementStore, MemberRecord, MembershipStore, VersionStore};
use crate::error::StorageError;
use crate::types::{PrincipalId, Rule, RuleSetHash, Version};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct VersionMaps {
    by_hash: HashMap<RuleSetHash, Version>,
    by_version: HashMap<Version, Vec<Rule>>,
    current: Version,
}

/// Version store backed by process memory.
#[derive(Default)]
pub struct MemoryVersionStore {
    inner: RwLock<VersionMaps>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionStore for MemoryVersionStore {
    fn version_of(&self, hash: &RuleSetHash) -> Result<Option<Version>, StorageError> {
        Ok(self.inner.read().by_hash.get(hash).copied())
    }

    fn rules_of(&self, version: Version) -> Result<Option<Vec<Rule>>, StorageError> {
        Ok(self.inner.read().by_version.get(&version).cloned())
    }

    fn current_version(&self) -> Result<Version, StorageError> {
        Ok(self.inner.read().current)
    }

    fn insert_version(
        &self,
        hash: RuleSetHash,
        version: Version,
        rules: &[Rule],
    ) -> Result<(), StorageError> {
        let mut maps = self.inner.write();
        maps.by_hash.insert(hash, version);
        maps.by_version.insert(version, rules.to_vec());
        maps.current = version;
        Ok(())
    }
}

/// Agreement store backed by process memory.
#[derive(Default)]
pub struct MemoryAgreementStore {
    inner: RwLock<HashMap<Rule, AgreementEntry>>,
}

impl MemoryAgreementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AgreementStore for MemoryAgreementStore {
    fn get(&self, rule: &Rule) -> Result<Option<AgreementEntry>, StorageError> {
        Ok(self.inner.read().get(rule).copied())
    }

    fn put(&self, rule: &Rule, entry: AgreementEntry) -> Result<(), StorageError> {
        self.inner.write().insert(rule.clone(), entry);
        Ok(())
    }
}

/// Membership store backed by process memory.
#[derive(Default)]
pub struct MemoryMembershipStore {
    inner: RwLock<HashMap<PrincipalId, MemberRecord>>,
}

impl MemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MembershipStore for MemoryMembershipStore {
    fn get(&self, principal: &PrincipalId) -> Result<Option<MemberRecord>, StorageError> {
        Ok(self.inner.read().get(principal).cloned())
    }

    fn put(&self, principal: &PrincipalId, record: &MemberRecord) -> Result<(), StorageError> {
        self.inner.write().insert(principal.clone(), record.clone());
        Ok(())
    }

    fn remove(&self, principal: &PrincipalId) -> Result<(), StorageError> {
        self.inner.write().remove(principal);
        Ok(())
    }

    fn list(&self) -> Result<Vec<(PrincipalId, MemberRecord)>, StorageError> {
        let mut entries: Vec<_> = self
            .inner
            .read()
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.0.cmp(&b.0));
        Ok(entries)
    }
}
