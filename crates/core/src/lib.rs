//! Core domain types, errors, and constants for `statusd`.
//!
//! This crate holds the vocabulary shared by the collector and the status
//! reporter: the health state of a single subsystem, the aggregate response
//! model built from all of them, and the error type every probe reports
//! through.
//!
//! ## Key Components
//!
//! - **`errors`**: The primary `Error` enum and `Result` alias. Probe failures
//!   travel as values of this type rather than being thrown out of the
//!   scheduler.
//! - **`types`**: `StatusState` and `Status`, the unit every subsystem reports.
//! - **`models`**: Subsystem payloads and the `StatusResponse` aggregate.
//! - **`constants`**: Shared defaults such as the probe interval and the
//!   staleness threshold.

pub mod constants;
pub mod errors;
pub mod models;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    models::*,
    types::{Status, StatusState},
};
