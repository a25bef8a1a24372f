//! End-to-end membership flows: registration, pause gating, departure.

use crate::support::{agreed_oracle, fixture, rules};
use charter::error::{ComplianceError, RegistryError};
use charter::events::Event;
use charter::store::MemberRecord;
use charter::types::{PrincipalId, PrincipalKind};

#[test]
fn pause_and_revocation_walkthrough() {
    let f = fixture();
    let gov = PrincipalId::from("gov");
    let set = rules(&["r1"]);
    f.registry.update_rule_set(&gov, &set).unwrap();

    // Human registers while unpaused.
    let human = PrincipalId::from("h-1");
    f.registry
        .register(&human, PrincipalKind::Human, &set, None)
        .unwrap();
    assert_eq!(f.registry.member(&human).unwrap().version, 1);

    // Any registration while paused is refused.
    f.flags.pause();
    let err = f
        .registry
        .register(&PrincipalId::from("h-2"), PrincipalKind::Human, &set, None)
        .unwrap_err();
    assert!(matches!(err, RegistryError::SystemPaused));
    f.flags.resume();

    // Agent registers, then falls out of agreement: departure is refused
    // and the record stays intact.
    let agent = PrincipalId::from("a-1");
    let oracle = agreed_oracle(&agent, &set);
    f.registry
        .register(&agent, PrincipalKind::Agent, &set, Some(oracle.clone()))
        .unwrap();

    oracle.remove_rule(&agent, &set[0]).unwrap();
    let err = f.registry.leave_system(&agent).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Compliance(ComplianceError::RuleNotAgreed(ref r)) if *r == set[0]
    ));
    assert!(f.registry.member(&agent).unwrap().registered);

    // Back in agreement, departure succeeds and the record fully resets.
    oracle.add_rule(&agent, &set[0]).unwrap();
    f.registry.leave_system(&agent).unwrap();
    assert_eq!(f.registry.member(&agent).unwrap(), MemberRecord::default());
}

#[test]
fn changing_rule_set_requires_leave_then_register() {
    let f = fixture();
    let gov = PrincipalId::from("gov");
    let set_a = rules(&["r1"]);
    let set_b = rules(&["r1", "r2"]);
    f.registry.update_rule_set(&gov, &set_a).unwrap();
    f.registry.update_rule_set(&gov, &set_b).unwrap();

    let alice = PrincipalId::from("alice");
    f.registry
        .register(&alice, PrincipalKind::Human, &set_a, None)
        .unwrap();

    // No in-place update path: re-registering under the new set fails.
    let err = f
        .registry
        .register(&alice, PrincipalKind::Human, &set_b, None)
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRegistered(_)));

    f.registry.leave_system(&alice).unwrap();
    f.registry
        .register(&alice, PrincipalKind::Human, &set_b, None)
        .unwrap();
    assert_eq!(f.registry.member(&alice).unwrap().version, 2);
}

#[test]
fn compliance_check_distinguishes_mismatch_from_unknown() {
    let f = fixture();
    let gov = PrincipalId::from("gov");
    let set_a = rules(&["r1"]);
    let set_b = rules(&["r2"]);
    f.registry.update_rule_set(&gov, &set_a).unwrap();
    f.registry.update_rule_set(&gov, &set_b).unwrap();

    let alice = PrincipalId::from("alice");
    f.registry
        .register(&alice, PrincipalKind::Human, &set_a, None)
        .unwrap();

    // Both versions exist; claiming the other one is a mismatch.
    let err = f.registry.check_compliance(&alice, &set_b).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::VersionMismatch {
            claimed: 2,
            registered: 1,
        }
    ));

    // A never-registered set is unknown, not a mismatch.
    let err = f
        .registry
        .check_compliance(&alice, &rules(&["r3"]))
        .unwrap_err();
    assert!(matches!(err, RegistryError::UnknownRuleSet(_)));

    // The matching set passes vacuously for a human.
    f.registry.check_compliance(&alice, &set_a).unwrap();
}

#[test]
fn agent_compliance_is_rechecked_on_read() {
    let f = fixture();
    let gov = PrincipalId::from("gov");
    let set = rules(&["r1", "r2"]);
    f.registry.update_rule_set(&gov, &set).unwrap();

    let agent = PrincipalId::from("a-1");
    let oracle = agreed_oracle(&agent, &set);
    f.registry
        .register(&agent, PrincipalKind::Agent, &set, Some(oracle.clone()))
        .unwrap();
    f.registry.check_compliance(&agent, &set).unwrap();

    // Compliance is verified live, not remembered from registration.
    oracle.remove_rule(&agent, &set[1]).unwrap();
    let err = f.registry.check_compliance(&agent, &set).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Compliance(ComplianceError::RuleNotAgreed(_))
    ));

    // The read-only check mutated nothing.
    assert!(f.registry.member(&agent).unwrap().registered);
}

#[test]
fn event_stream_records_the_full_lifecycle() {
    let f = fixture();
    let gov = PrincipalId::from("gov");
    let set = rules(&["r1"]);
    f.registry.update_rule_set(&gov, &set).unwrap();

    let alice = PrincipalId::from("alice");
    f.registry
        .register(&alice, PrincipalKind::Human, &set, None)
        .unwrap();
    f.registry.leave_system(&alice).unwrap();

    let events = f.log.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], Event::RuleSetUpdated { .. }));
    assert!(
        matches!(events[1], Event::UserRegistered { ref principal, kind, .. }
            if *principal == alice && kind == PrincipalKind::Human)
    );
    assert!(matches!(events[2], Event::UserLeft { ref principal } if *principal == alice));
}
