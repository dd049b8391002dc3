//! Configuration for the statusd collector and status reporter
//!
//! Settings are plain data with defaults for every field. They can be read
//! from a JSON document and adjusted through `STATUSD_*` environment
//! variables before being validated once at startup.

pub mod config;
pub mod loader;

#[cfg(test)]
mod config_tests;

pub use config::*;
pub use loader::ConfigLoader;
