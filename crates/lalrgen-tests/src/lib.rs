//! Shared grammar definitions for integration tests.

pub mod grammars;
