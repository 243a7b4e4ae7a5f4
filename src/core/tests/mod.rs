//! Core module tests
//!
//! Contains test suites for core functionality:
//! - Parser tests (config snapshots, event scripts)
//! - Binding validation tests
//! - Type tests (Channel, TriggerKind, ActionId, ...)

#[cfg(test)]
mod validator_tests;
#[cfg(test)]
mod types_tests;
