//! Delay calculations for probe scheduling.
//!
//! Both functions are pure: the same inputs always produce the same delay
//! (jitter aside), which keeps interval policies testable without a clock.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff: `min * factor^failures`, clamped to `[min, max]`.
///
/// With `jitter` the result is drawn uniformly from `[min, computed]`, so it
/// never exceeds the un-jittered value. Overflow of the exponent saturates at
/// `max`.
pub fn calculate_duration(
    min: Duration,
    max: Duration,
    factor: f64,
    jitter: bool,
    failures: u32,
) -> Duration {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let min_nanos = min.as_nanos() as f64;
    let max_nanos = max.as_nanos() as f64;

    let mut t = min_nanos * factor.powf(f64::from(failures));
    if !t.is_finite() || t > max_nanos {
        t = max_nanos;
    }
    if t < min_nanos {
        t = min_nanos;
    }

    if jitter {
        let r: f64 = rand::thread_rng().gen();
        t = r * (t - min_nanos) + min_nanos;
    }

    Duration::from_nanos(t.clamp(min_nanos, max_nanos).round() as u64)
}

/// Interval that grows logarithmically with the number of nodes in the
/// cluster: `base * ln(1 + nodes)`, capped at `max`.
///
/// An empty cluster is treated like a single node so the result stays
/// monotonically non-decreasing in `num_nodes`.
pub fn cluster_size_dependent_interval(base: Duration, max: Duration, num_nodes: usize) -> Duration {
    let nodes = num_nodes.max(1) as f64;
    let nanos = base.as_nanos() as f64 * nodes.ln_1p();
    if !nanos.is_finite() || nanos >= max.as_nanos() as f64 {
        return max;
    }
    Duration::from_nanos(nanos as u64)
}
