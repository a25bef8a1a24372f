//! Sled-backed registries survive a process restart.

use crate::support::rules;
use charter::access::AllowAll;
use charter::config::RuntimeFlags;
use charter::membership::MembershipRegistry;
use charter::oracle::{ComplianceMode, ComplianceOracle};
use charter::store::persistence::{
    SledAgreementStore, SledEventLog, SledMembershipStore, SledVersionStore,
};
use charter::types::{PrincipalId, PrincipalKind};
use charter::version::RuleVersionRegistry;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct SledFixture {
    registry: MembershipRegistry,
    events: Arc<SledEventLog>,
    db: sled::Db,
}

fn open(path: &Path) -> SledFixture {
    let db = sled::open(path).unwrap();
    let events = Arc::new(SledEventLog::with_db(&db).unwrap());
    let versions = Arc::new(RuleVersionRegistry::new(
        Arc::new(SledVersionStore::with_db(&db).unwrap()),
        Arc::new(AllowAll),
        events.clone(),
    ));
    let registry = MembershipRegistry::new(
        versions,
        Arc::new(SledMembershipStore::with_db(&db).unwrap()),
        Arc::new(AllowAll),
        Arc::new(RuntimeFlags::new(false)),
        events.clone(),
    );
    SledFixture {
        registry,
        events,
        db,
    }
}

fn sled_oracle(db: &sled::Db, events: Arc<SledEventLog>, agent: &PrincipalId) -> Arc<ComplianceOracle> {
    Arc::new(ComplianceOracle::self_controlled(
        agent.clone(),
        ComplianceMode::SelfAttested,
        Arc::new(SledAgreementStore::with_db(db, agent).unwrap()),
        events,
    ))
}

#[test]
fn membership_and_versions_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("charter.db");
    let gov = PrincipalId::from("gov");
    let agent = PrincipalId::from("a-1");
    let set = rules(&["r1", "r2"]);

    {
        let f = open(&path);
        f.registry.update_rule_set(&gov, &set).unwrap();
        let oracle = sled_oracle(&f.db, f.events.clone(), &agent);
        for rule in &set {
            oracle.add_rule(&agent, rule).unwrap();
        }
        f.registry
            .register(&agent, PrincipalKind::Agent, &set, Some(oracle))
            .unwrap();
    }

    let f = open(&path);
    let record = f.registry.member(&agent).unwrap();
    assert!(record.registered);
    assert_eq!(record.kind, PrincipalKind::Agent);
    assert_eq!(record.version, 1);

    // Event history is durable too.
    let events = f.events.all().unwrap();
    assert_eq!(events.len(), 4); // RuleSetUpdated + 2x RuleAdded + UserRegistered
}

#[test]
fn rebound_oracle_lets_an_agent_leave_after_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("charter.db");
    let gov = PrincipalId::from("gov");
    let agent = PrincipalId::from("a-1");
    let set = rules(&["r1"]);

    {
        let f = open(&path);
        f.registry.update_rule_set(&gov, &set).unwrap();
        let oracle = sled_oracle(&f.db, f.events.clone(), &agent);
        oracle.add_rule(&agent, &set[0]).unwrap();
        f.registry
            .register(&agent, PrincipalKind::Agent, &set, Some(oracle))
            .unwrap();
    }

    let f = open(&path);
    // Agreement state was persisted, so the rebound oracle still verifies.
    let oracle = sled_oracle(&f.db, f.events.clone(), &agent);
    f.registry.bind_oracle(&agent, oracle);
    f.registry.leave_system(&agent).unwrap();
    assert!(!f.registry.member(&agent).unwrap().registered);
}
