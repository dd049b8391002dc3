//! Probe scheduler for statusd
//!
//! A [`Collector`] owns a fixed set of named [`Probe`]s and runs each one on
//! its own tokio task. Between runs a probe sleeps for whatever its
//! [`IntervalPolicy`] returns for its current consecutive failure count, so a
//! failing subsystem can back off without slowing anyone else down.
//!
//! ```no_run
//! use statusd_collector::{Collector, IntervalPolicy, Probe};
//! use statusd_config::CollectorConfig;
//! use std::time::Duration;
//!
//! # async fn demo() -> statusd_core::Result<()> {
//! let collector = Collector::builder(CollectorConfig::default())
//!     .probe(
//!         Probe::new("ipam", |_cancel| async { Ok(42u32) })
//!             .interval(IntervalPolicy::fixed(Duration::from_secs(5)))
//!             .on_update(|result| println!("ipam: {result:?}")),
//!     )
//!     .build()?;
//!
//! collector.start();
//! collector.wait_for_first_run_timeout(Duration::from_secs(30)).await?;
//! let stale = collector.stale_probes();
//! # let _ = stale;
//! collector.close().await;
//! # Ok(())
//! # }
//! ```

mod barrier;
pub mod collector;
pub mod interval;
pub mod metrics;
pub mod probe;
mod state;

pub use collector::{Collector, CollectorBuilder};
pub use interval::{BackoffPolicy, ClusterSizeCadence, IntervalPolicy};
pub use metrics::ProbeMetrics;
pub use probe::Probe;
pub use state::ProbeStats;
pub use tokio_util::sync::CancellationToken;
