//! Membership registry.
//!
//! Orchestrates registration and withdrawal of principals against a rule-set
//! version. Humans register on resolution alone; agents are verified
//! rule-by-rule through their compliance oracle before any state is written.
//!
//! Every operation is check-then-commit: version resolution happens before
//! any compliance call, all compliance calls happen before any mutation, and
//! preconditions are re-validated under the commit lock. Oracle calls are
//! made without holding that lock, so an oracle that calls back into the
//! registry can at worst observe pre-commit state, never deadlock or corrupt
//! a half-written record.

use crate::access::{AccessControl, Action};
use crate::config::PauseState;
use crate::error::{RegistryError, StorageError};
use crate::events::{Event, EventSink};
use crate::hash::hash_rule_set;
use crate::oracle::ComplianceCheckable;
use crate::store::{MemberRecord, MembershipStore};
use crate::types::{PrincipalId, PrincipalKind, Rule, Version};
use crate::version::RuleVersionRegistry;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct MembershipRegistry {
    versions: Arc<RuleVersionRegistry>,
    members: Arc<dyn MembershipStore>,
    oracles: RwLock<HashMap<PrincipalId, Arc<dyn ComplianceCheckable>>>,
    access: Arc<dyn AccessControl>,
    pause: Arc<dyn PauseState>,
    events: Arc<dyn EventSink>,
    commit: Mutex<()>,
}

impl MembershipRegistry {
    pub fn new(
        versions: Arc<RuleVersionRegistry>,
        members: Arc<dyn MembershipStore>,
        access: Arc<dyn AccessControl>,
        pause: Arc<dyn PauseState>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            versions,
            members,
            oracles: RwLock::new(HashMap::new()),
            access,
            pause,
            events,
            commit: Mutex::new(()),
        }
    }

    fn ensure_unpaused(&self) -> Result<(), RegistryError> {
        if self.pause.is_paused() {
            return Err(RegistryError::SystemPaused);
        }
        Ok(())
    }

    fn record(&self, principal: &PrincipalId) -> Result<MemberRecord, RegistryError> {
        Ok(self.members.get(principal)?.unwrap_or_default())
    }

    fn oracle_of(
        &self,
        principal: &PrincipalId,
    ) -> Result<Arc<dyn ComplianceCheckable>, RegistryError> {
        self.oracles
            .read()
            .get(principal)
            .cloned()
            .ok_or(RegistryError::MissingOracle)
    }

    /// Rule list for a version a member is registered under. A miss here is
    /// a storage invariant violation, not a caller error: registration only
    /// ever stores versions that exist.
    fn stored_rules(&self, version: Version) -> Result<Vec<Rule>, RegistryError> {
        Ok(self.versions.rule_set(version)?.ok_or_else(|| {
            StorageError::Backend(format!("no rule list stored for version {}", version))
        })?)
    }

    fn verify_rules(
        &self,
        oracle: &dyn ComplianceCheckable,
        rules: &[Rule],
    ) -> Result<(), RegistryError> {
        // Fail-fast: the first non-compliant rule aborts the whole operation.
        for rule in rules {
            oracle.check_compliance(rule)?;
        }
        Ok(())
    }

    /// Register `principal` under the version its claimed rule set resolves
    /// to. Agents must hand over their compliance oracle and pass the full
    /// per-rule verification before the record is written.
    pub fn register(
        &self,
        principal: &PrincipalId,
        kind: PrincipalKind,
        claimed_rules: &[Rule],
        oracle: Option<Arc<dyn ComplianceCheckable>>,
    ) -> Result<Version, RegistryError> {
        self.ensure_unpaused()?;
        if self.record(principal)?.registered {
            return Err(RegistryError::AlreadyRegistered(principal.clone()));
        }

        let hash = hash_rule_set(claimed_rules);
        let version = self
            .versions
            .resolve_version(&hash)?
            .ok_or(RegistryError::UnknownRuleSet(hash))?;

        let oracle = match kind {
            PrincipalKind::Human => None,
            PrincipalKind::Agent => Some(oracle.ok_or(RegistryError::MissingOracle)?),
        };
        if let Some(oracle) = oracle.as_deref() {
            let rules = self.stored_rules(version)?;
            self.verify_rules(oracle, &rules)?;
        }

        let _guard = self.commit.lock();
        if self.record(principal)?.registered {
            return Err(RegistryError::AlreadyRegistered(principal.clone()));
        }
        self.members.put(
            principal,
            &MemberRecord {
                registered: true,
                kind,
                version,
            },
        )?;
        if let Some(oracle) = oracle {
            self.oracles.write().insert(principal.clone(), oracle);
        }

        info!(principal = %principal, %kind, version, "principal registered");
        self.events.emit(Event::UserRegistered {
            principal: principal.clone(),
            kind,
            rule_set: claimed_rules.to_vec(),
        });
        Ok(version)
    }

    /// Leave the system. Self-service only: the caller acts on its own
    /// record. Agents must still pass the full compliance verification
    /// against their stored version before departure.
    pub fn leave_system(&self, caller: &PrincipalId) -> Result<(), RegistryError> {
        self.ensure_unpaused()?;
        let record = self.record(caller)?;
        if !record.registered {
            return Err(RegistryError::NotRegistered(caller.clone()));
        }

        if record.kind == PrincipalKind::Agent {
            let oracle = self.oracle_of(caller)?;
            let rules = self.stored_rules(record.version)?;
            self.verify_rules(oracle.as_ref(), &rules)?;
        }

        let _guard = self.commit.lock();
        if !self.record(caller)?.registered {
            return Err(RegistryError::NotRegistered(caller.clone()));
        }
        self.members.remove(caller)?;
        self.oracles.write().remove(caller);

        info!(principal = %caller, "principal left the system");
        self.events.emit(Event::UserLeft {
            principal: caller.clone(),
        });
        Ok(())
    }

    /// Read-only compliance check of a registered principal against a
    /// claimed rule set. No state mutation, no events; not gated by pause.
    pub fn check_compliance(
        &self,
        principal: &PrincipalId,
        claimed_rules: &[Rule],
    ) -> Result<(), RegistryError> {
        let record = self.record(principal)?;
        if !record.registered {
            return Err(RegistryError::NotRegistered(principal.clone()));
        }

        let hash = hash_rule_set(claimed_rules);
        let claimed = self
            .versions
            .resolve_version(&hash)?
            .ok_or(RegistryError::UnknownRuleSet(hash))?;
        if claimed != record.version {
            return Err(RegistryError::VersionMismatch {
                claimed,
                registered: record.version,
            });
        }

        if record.kind == PrincipalKind::Agent {
            let oracle = self.oracle_of(principal)?;
            let rules = self.stored_rules(claimed)?;
            self.verify_rules(oracle.as_ref(), &rules)?;
        }
        Ok(())
    }

    /// Publish a new rule-set version. Thin wrapper over the version
    /// registry; its failures propagate unchanged. Restricted and
    /// pause-gated like the other mutations.
    pub fn update_rule_set(
        &self,
        caller: &PrincipalId,
        rules: &[Rule],
    ) -> Result<Version, RegistryError> {
        self.ensure_unpaused()?;
        if !self.access.is_authorized(caller, Action::UpdateRuleSet) {
            return Err(RegistryError::Unauthorized(caller.clone()));
        }
        Ok(self.versions.register_version(caller, rules)?)
    }

    /// Attach (or replace) the compliance oracle for an agent principal.
    ///
    /// Registration binds the oracle it was handed; a process that restarts
    /// with persistent stores uses this to re-bind oracles for already
    /// registered agents.
    pub fn bind_oracle(&self, principal: &PrincipalId, oracle: Arc<dyn ComplianceCheckable>) {
        self.oracles.write().insert(principal.clone(), oracle);
    }

    /// Membership record for a principal; the zero record when unknown.
    pub fn member(&self, principal: &PrincipalId) -> Result<MemberRecord, RegistryError> {
        self.record(principal)
    }

    /// All currently registered principals.
    pub fn members(&self) -> Result<Vec<(PrincipalId, MemberRecord)>, RegistryError> {
        Ok(self.members.list()?)
    }
}
