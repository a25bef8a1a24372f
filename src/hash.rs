//! Canonical hashing of rule sequences.
//!
//! A rule set is content-addressed by hashing its canonical byte encoding:
//! the rule count, then each rule prefixed with its length (both u64,
//! little-endian). Length prefixing keeps the encoding injective, so two
//! distinct sequences can never share a hash preimage.

use crate::types::{Rule, RuleSetHash};

/// Compute the content hash of an ordered rule sequence.
pub fn hash_rule_set(rules: &[Rule]) -> RuleSetHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(rules.len() as u64).to_le_bytes());
    for rule in rules {
        hasher.update(&(rule.as_bytes().len() as u64).to_le_bytes());
        hasher.update(rule.as_bytes());
    }
    *hasher.finalize().as_bytes()
}
