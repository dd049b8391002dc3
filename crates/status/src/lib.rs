//! Aggregate health reporting for statusd
//!
//! The [`StatusReporter`] registers one probe per monitored subsystem with a
//! collector. Each probe's sink writes its own field of a shared
//! [`StatusStore`]; a status query copies the store, or a brief projection of
//! it, and attaches a verdict computed by [`evaluate`].
//!
//! ## Key Components
//!
//! - **`store`**: the lock-guarded aggregate and the brief projection
//! - **`rollup`**: the fixed-priority verdict
//! - **`kubernetes`**: the orchestrator version memoizer and heartbeat
//! - **`subsystems`**: the traits subsystems implement to be probed
//! - **`reporter`**: probe wiring, status queries and shutdown

pub mod kubernetes;
pub mod reporter;
pub mod rollup;
pub mod store;
pub mod subsystems;

pub use kubernetes::{K8sClient, K8sVersionCache, LastInteraction, ServerVersion};
pub use reporter::StatusReporter;
pub use rollup::{evaluate, RollupContext};
pub use store::StatusStore;
pub use subsystems::{from_fn, StatusSource, Subsystems};
