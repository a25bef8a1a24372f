//! Core types for the charter registration system.

use serde::{Deserialize, Serialize};

/// RuleSetHash: deterministic content hash of an ordered rule sequence
pub type RuleSetHash = [u8; 32];

/// Version: unique positive integer assigned to a distinct rule set (0 = none)
pub type Version = u64;

/// Rule: one opaque behavioral constraint
///
/// Rules are uninterpreted byte strings. Lookups use exact byte equality;
/// no parsing or normalization is ever applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule(pub Vec<u8>);

impl Rule {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Rule {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for Rule {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) if !s.chars().any(char::is_control) => write!(f, "{}", s),
            _ => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

/// Stable identifier for a registering principal (address or equivalent)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of a registering principal
///
/// `Human` is the zero value a membership record resets to on departure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrincipalKind {
    #[default]
    Human,
    Agent,
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalKind::Human => write!(f, "human"),
            PrincipalKind::Agent => write!(f, "agent"),
        }
    }
}
