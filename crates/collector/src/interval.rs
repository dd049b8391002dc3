//! Interval policies: how long a probe sleeps before its next run.
//!
//! A policy is a pure function of the probe's consecutive failure count. The
//! adaptive policy may additionally read one external signal (for example the
//! number of nodes in the cluster) at the moment it is evaluated; it keeps no
//! state of its own.

use statusd_config::BackoffSettings;
use statusd_core::MIN_PROBE_INTERVAL;
use statusd_utils::{calculate_duration, cluster_size_dependent_interval};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Exponential backoff applied while a probe is failing
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub min: Duration,
    pub max: Duration,
    pub factor: f64,
    pub jitter: bool,
}

impl BackoffPolicy {
    pub fn new(min: Duration, max: Duration, factor: f64) -> Self {
        Self {
            min,
            max,
            factor,
            jitter: false,
        }
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// `min * factor^failures`, clamped to `[min, max]`
    pub fn delay(&self, failures: u32) -> Duration {
        calculate_duration(self.min, self.max, self.factor, self.jitter, failures)
    }
}

impl From<&BackoffSettings> for BackoffPolicy {
    fn from(settings: &BackoffSettings) -> Self {
        Self {
            min: settings.min,
            max: settings.max,
            factor: settings.factor,
            jitter: settings.jitter,
        }
    }
}

/// Healthy-state cadence that stretches with cluster size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterSizeCadence {
    pub base: Duration,
    pub max: Duration,
}

impl ClusterSizeCadence {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn interval(&self, num_nodes: usize) -> Duration {
        cluster_size_dependent_interval(self.base, self.max, num_nodes)
    }
}

type HealthyCadenceFn = Arc<dyn Fn() -> Duration + Send + Sync>;
type FailureIntervalFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Maps a consecutive failure count to the delay before the next run
#[derive(Clone)]
pub enum IntervalPolicy {
    /// Same delay regardless of failures
    Fixed(Duration),
    /// `healthy()` while succeeding, `backoff` while failing
    Adaptive {
        backoff: BackoffPolicy,
        healthy: HealthyCadenceFn,
    },
    /// Arbitrary function of the failure count
    Custom(FailureIntervalFn),
}

impl IntervalPolicy {
    pub fn fixed(interval: Duration) -> Self {
        IntervalPolicy::Fixed(interval)
    }

    pub fn adaptive<F>(backoff: BackoffPolicy, healthy: F) -> Self
    where
        F: Fn() -> Duration + Send + Sync + 'static,
    {
        IntervalPolicy::Adaptive {
            backoff,
            healthy: Arc::new(healthy),
        }
    }

    /// Backoff while failing; while healthy, a cadence derived from the node
    /// count returned by `num_nodes` at evaluation time.
    pub fn cluster_size_adaptive<N>(
        backoff: BackoffPolicy,
        cadence: ClusterSizeCadence,
        num_nodes: N,
    ) -> Self
    where
        N: Fn() -> usize + Send + Sync + 'static,
    {
        Self::adaptive(backoff, move || cadence.interval(num_nodes()))
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        IntervalPolicy::Custom(Arc::new(f))
    }

    /// Delay before the next run, never below `MIN_PROBE_INTERVAL`
    pub fn next_interval(&self, failures: u32) -> Duration {
        let raw = match self {
            IntervalPolicy::Fixed(interval) => *interval,
            IntervalPolicy::Adaptive { backoff, healthy } => {
                if failures == 0 {
                    healthy()
                } else {
                    backoff.delay(failures)
                }
            }
            IntervalPolicy::Custom(f) => f(failures),
        };
        raw.max(MIN_PROBE_INTERVAL)
    }
}

impl fmt::Debug for IntervalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalPolicy::Fixed(interval) => f.debug_tuple("Fixed").field(interval).finish(),
            IntervalPolicy::Adaptive { backoff, .. } => f
                .debug_struct("Adaptive")
                .field("backoff", backoff)
                .finish_non_exhaustive(),
            IntervalPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
