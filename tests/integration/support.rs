//! Shared fixtures for the integration suite.

use charter::access::AllowAll;
use charter::config::RuntimeFlags;
use charter::events::{EventLog, NullSink};
use charter::membership::MembershipRegistry;
use charter::oracle::{ComplianceMode, ComplianceOracle};
use charter::store::memory::{MemoryAgreementStore, MemoryMembershipStore, MemoryVersionStore};
use charter::types::{PrincipalId, Rule};
use charter::version::RuleVersionRegistry;
use std::sync::Arc;

pub struct Fixture {
    pub registry: MembershipRegistry,
    pub versions: Arc<RuleVersionRegistry>,
    pub flags: Arc<RuntimeFlags>,
    pub log: Arc<EventLog>,
}

/// Registry wired over in-memory stores with an open access policy.
pub fn fixture() -> Fixture {
    let log = Arc::new(EventLog::new());
    let flags = Arc::new(RuntimeFlags::new(false));
    let versions = Arc::new(RuleVersionRegistry::new(
        Arc::new(MemoryVersionStore::new()),
        Arc::new(AllowAll),
        log.clone(),
    ));
    let registry = MembershipRegistry::new(
        versions.clone(),
        Arc::new(MemoryMembershipStore::new()),
        Arc::new(AllowAll),
        flags.clone(),
        log.clone(),
    );
    Fixture {
        registry,
        versions,
        flags,
        log,
    }
}

pub fn rules(items: &[&str]) -> Vec<Rule> {
    items.iter().map(|s| Rule::from(*s)).collect()
}

/// Self-controlled in-memory oracle that has already agreed to `set`.
pub fn agreed_oracle(agent: &PrincipalId, set: &[Rule]) -> Arc<ComplianceOracle> {
    let oracle = ComplianceOracle::self_controlled(
        agent.clone(),
        ComplianceMode::SelfAttested,
        Arc::new(MemoryAgreementStore::new()),
        Arc::new(NullSink),
    );
    for rule in set {
        oracle.add_rule(agent, rule).unwrap();
    }
    Arc::new(oracle)
}
