//! Rule-set version registry.
//!
//! Stores immutable, content-addressed versions of rule sets and assigns each
//! distinct rule set a monotonically increasing version number. Versions are
//! append-only: an existing hash can never be re-versioned or overwritten.

use crate::access::{AccessControl, Action};
use crate::error::{StorageError, VersionError};
use crate::events::{Event, EventSink};
use crate::hash::hash_rule_set;
use crate::store::VersionStore;
use crate::types::{PrincipalId, Rule, RuleSetHash, Version};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

pub struct RuleVersionRegistry {
    store: Arc<dyn VersionStore>,
    access: Arc<dyn AccessControl>,
    events: Arc<dyn EventSink>,
    // Serializes check-then-commit so two registrations can't claim the
    // same version number.
    commit: Mutex<()>,
}

impl RuleVersionRegistry {
    pub fn new(
        store: Arc<dyn VersionStore>,
        access: Arc<dyn AccessControl>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            access,
            events,
            commit: Mutex::new(()),
        }
    }

    /// Register a new rule set and assign it the next version number.
    ///
    /// Fails if the sequence is empty, if the content hash is already
    /// versioned, or if `caller` is not the designated updater. A failed call
    /// never advances the version counter.
    pub fn register_version(
        &self,
        caller: &PrincipalId,
        rules: &[Rule],
    ) -> Result<Version, VersionError> {
        if !self.access.is_authorized(caller, Action::RegisterVersion) {
            return Err(VersionError::Unauthorized(caller.clone()));
        }
        if rules.is_empty() {
            return Err(VersionError::EmptyRuleSet);
        }

        let hash = hash_rule_set(rules);
        let _guard = self.commit.lock();
        if let Some(version) = self.store.version_of(&hash)? {
            return Err(VersionError::DuplicateRuleSet { hash, version });
        }

        let version = self.store.current_version()? + 1;
        self.store.insert_version(hash, version, rules)?;

        info!(
            version,
            hash = %hex::encode(hash),
            rules = rules.len(),
            updater = %caller,
            "registered rule-set version"
        );
        self.events.emit(Event::RuleSetUpdated {
            rule_set: rules.to_vec(),
            updater: caller.clone(),
        });
        Ok(version)
    }

    /// Resolve a content hash to its version. Pure lookup; `None` = unknown.
    pub fn resolve_version(&self, hash: &RuleSetHash) -> Result<Option<Version>, StorageError> {
        self.store.version_of(hash)
    }

    /// Rule list for a version. `None` for an unknown (or zero) version.
    pub fn rule_set(&self, version: Version) -> Result<Option<Vec<Rule>>, StorageError> {
        if version == 0 {
            return Ok(None);
        }
        self.store.rules_of(version)
    }

    /// Highest version assigned so far; 0 before the first registration.
    pub fn current_version(&self) -> Result<Version, StorageError> {
        self.store.current_version()
    }
}
