//! Per-agent compliance oracle.
//!
//! Each agent carries its own oracle: a store of rules the agent agrees to
//! follow, independently queryable for agreement to a specific rule. All
//! mutating operations are restricted to the agent's designated controller.

use crate::error::ComplianceError;
use crate::events::{Event, EventSink};
use crate::store::{AgreementEntry, AgreementStore};
use crate::types::{PrincipalId, Rule};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// How `check_compliance` judges an agreed rule.
///
/// `SelfAttested`: agreement alone is sufficient. `Attested`: a controller
/// must additionally mark the rule's compliance status, so the check is
/// third-party-attested rather than self-attested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceMode {
    #[default]
    SelfAttested,
    Attested,
}

/// Capability interface the membership registry verifies agents through.
///
/// The registry depends only on this trait, never on the concrete oracle, so
/// tests can substitute mocks and deployments can plug in remote oracles.
pub trait ComplianceCheckable: Send + Sync {
    /// Verify agreement with (and, in attested mode, compliance to) one rule.
    fn check_compliance(&self, rule: &Rule) -> Result<(), ComplianceError>;
}

pub struct ComplianceOracle {
    agent: PrincipalId,
    controller: PrincipalId,
    mode: ComplianceMode,
    store: Arc<dyn AgreementStore>,
    events: Arc<dyn EventSink>,
}

impl ComplianceOracle {
    pub fn new(
        agent: PrincipalId,
        controller: PrincipalId,
        mode: ComplianceMode,
        store: Arc<dyn AgreementStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            agent,
            controller,
            mode,
            store,
            events,
        }
    }

    /// Oracle whose agent controls itself.
    pub fn self_controlled(
        agent: PrincipalId,
        mode: ComplianceMode,
        store: Arc<dyn AgreementStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let controller = agent.clone();
        Self::new(agent, controller, mode, store, events)
    }

    pub fn agent(&self) -> &PrincipalId {
        &self.agent
    }

    fn verify_controller(&self, caller: &PrincipalId) -> Result<(), ComplianceError> {
        if *caller != self.controller {
            return Err(ComplianceError::Unauthorized(caller.clone()));
        }
        Ok(())
    }

    /// Mark `rule` as agreed. Fails if it is already agreed.
    pub fn add_rule(&self, caller: &PrincipalId, rule: &Rule) -> Result<(), ComplianceError> {
        self.verify_controller(caller)?;
        let entry = self.store.get(rule)?.unwrap_or_default();
        if entry.agreed {
            return Err(ComplianceError::RuleAlreadyAdded(rule.clone()));
        }

        self.store.put(
            rule,
            AgreementEntry {
                agreed: true,
                attested: false,
            },
        )?;
        debug!(agent = %self.agent, rule = %rule, "rule agreement added");
        self.events.emit(Event::RuleAdded { rule: rule.clone() });
        Ok(())
    }

    /// Revoke agreement with `rule`. Fails if the rule was never added.
    ///
    /// Revocation also clears the attestation side flag; a revoked rule is
    /// indistinguishable from an absent one to `check_compliance`.
    pub fn remove_rule(&self, caller: &PrincipalId, rule: &Rule) -> Result<(), ComplianceError> {
        self.verify_controller(caller)?;
        let entry = self.store.get(rule)?.unwrap_or_default();
        if !entry.agreed {
            return Err(ComplianceError::RuleNotFound(rule.clone()));
        }

        self.store.put(rule, AgreementEntry::default())?;
        debug!(agent = %self.agent, rule = %rule, "rule agreement removed");
        self.events.emit(Event::RuleRemoved { rule: rule.clone() });
        Ok(())
    }

    /// Set the compliance-status side flag for an agreed rule.
    ///
    /// Only meaningful in attested mode; the flag is tracked either way so
    /// switching modes does not lose state.
    pub fn set_attestation(
        &self,
        caller: &PrincipalId,
        rule: &Rule,
        attested: bool,
    ) -> Result<(), ComplianceError> {
        self.verify_controller(caller)?;
        let mut entry = self.store.get(rule)?.unwrap_or_default();
        if !entry.agreed {
            return Err(ComplianceError::RuleNotFound(rule.clone()));
        }

        entry.attested = attested;
        self.store.put(rule, entry)?;
        debug!(agent = %self.agent, rule = %rule, attested, "attestation updated");
        Ok(())
    }

    /// Whether the agent currently agrees to `rule`. Query helper; never
    /// fails on absence.
    pub fn agreed(&self, rule: &Rule) -> Result<bool, ComplianceError> {
        Ok(self.store.get(rule)?.unwrap_or_default().agreed)
    }
}

impl ComplianceCheckable for ComplianceOracle {
    fn check_compliance(&self, rule: &Rule) -> Result<(), ComplianceError> {
        let entry = self.store.get(rule)?.unwrap_or_default();
        if !entry.agreed {
            return Err(ComplianceError::RuleNotAgreed(rule.clone()));
        }
        if self.mode == ComplianceMode::Attested && !entry.attested {
            return Err(ComplianceError::RuleNotCompliant(rule.clone()));
        }
        Ok(())
    }
}
