//! Integration tests for the charter registration system

mod hash_properties;
mod membership_flow;
mod persistence;
mod support;
