//! Property tests for canonical rule-set hashing.

use charter::hash::hash_rule_set;
use charter::types::Rule;
use proptest::prelude::*;

fn arb_rule_set() -> impl Strategy<Value = Vec<Rule>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..16)
        .prop_map(|rules| rules.into_iter().map(Rule::new).collect())
}

proptest! {
    #[test]
    fn hashing_is_deterministic(set in arb_rule_set()) {
        prop_assert_eq!(hash_rule_set(&set), hash_rule_set(&set));
    }

    #[test]
    fn distinct_sequences_hash_differently(a in arb_rule_set(), b in arb_rule_set()) {
        prop_assume!(a != b);
        prop_assert_ne!(hash_rule_set(&a), hash_rule_set(&b));
    }

    #[test]
    fn appending_a_rule_changes_the_hash(set in arb_rule_set(), extra in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut extended = set.clone();
        extended.push(Rule::new(extra));
        prop_assert_ne!(hash_rule_set(&set), hash_rule_set(&extended));
    }

    #[test]
    fn moving_bytes_across_rule_boundaries_changes_the_hash(prefix in prop::collection::vec(any::<u8>(), 1..32), suffix in prop::collection::vec(any::<u8>(), 1..32)) {
        let mut joined = prefix.clone();
        joined.extend_from_slice(&suffix);
        let as_one = vec![Rule::new(joined)];
        let as_two = vec![Rule::new(prefix), Rule::new(suffix)];
        prop_assert_ne!(hash_rule_set(&as_one), hash_rule_set(&as_two));
    }
}
