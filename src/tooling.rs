//! CLI tooling for charter operations.

pub mod cli;
