//! Shared utilities and pure functions for statusd
//!
//! This crate provides the pieces used across the workspace that carry no
//! state of their own: delay calculations for probe scheduling and the
//! tracing subscriber setup.

pub mod backoff;
pub mod tracing;

pub use backoff::*;
