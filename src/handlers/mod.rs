//! Event handlers registered with the broker.

pub mod projectors;
