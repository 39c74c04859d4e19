//! Cucumber step definitions for interface tests.

pub mod history_store;
