//! Prometheus metrics for probe runs

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};
use statusd_core::{Error, Result};
use std::time::Duration;

/// Per-probe run metrics, labelled by probe name
#[derive(Clone)]
pub struct ProbeMetrics {
    /// Completed runs by outcome
    runs: IntCounterVec,
    /// Wall time of each run including the update sink
    duration: HistogramVec,
    /// Current consecutive failure count
    consecutive_failures: IntGaugeVec,
}

impl ProbeMetrics {
    /// Create the metric families and register them with `registry`
    pub fn register(registry: &Registry) -> Result<Self> {
        let runs = IntCounterVec::new(
            Opts::new("statusd_probe_runs_total", "Total number of probe runs"),
            &["probe", "result"],
        )
        .map_err(metrics_error)?;
        registry
            .register(Box::new(runs.clone()))
            .map_err(metrics_error)?;

        let duration = HistogramVec::new(
            HistogramOpts::new(
                "statusd_probe_duration_seconds",
                "Probe run duration in seconds",
            ),
            &["probe"],
        )
        .map_err(metrics_error)?;
        registry
            .register(Box::new(duration.clone()))
            .map_err(metrics_error)?;

        let consecutive_failures = IntGaugeVec::new(
            Opts::new(
                "statusd_probe_consecutive_failures",
                "Consecutive failed runs per probe",
            ),
            &["probe"],
        )
        .map_err(metrics_error)?;
        registry
            .register(Box::new(consecutive_failures.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            runs,
            duration,
            consecutive_failures,
        })
    }

    pub fn observe(&self, probe: &str, success: bool, elapsed: Duration, failures: u32) {
        let result = if success { "success" } else { "failure" };
        self.runs.with_label_values(&[probe, result]).inc();
        self.duration
            .with_label_values(&[probe])
            .observe(elapsed.as_secs_f64());
        self.consecutive_failures
            .with_label_values(&[probe])
            .set(i64::from(failures));
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::configuration(format!("failed to register probe metrics: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_updates_families() {
        let registry = Registry::new();
        let metrics = ProbeMetrics::register(&registry).unwrap();

        metrics.observe("kvstore", false, Duration::from_millis(3), 1);
        metrics.observe("kvstore", false, Duration::from_millis(3), 2);
        metrics.observe("kvstore", true, Duration::from_millis(3), 0);

        assert_eq!(
            metrics.runs.with_label_values(&["kvstore", "failure"]).get(),
            2
        );
        assert_eq!(
            metrics.runs.with_label_values(&["kvstore", "success"]).get(),
            1
        );
        assert_eq!(
            metrics
                .consecutive_failures
                .with_label_values(&["kvstore"])
                .get(),
            0
        );

        let names: Vec<_> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"statusd_probe_runs_total".to_string()));
        assert!(names.contains(&"statusd_probe_duration_seconds".to_string()));
    }

    #[test]
    fn test_double_registration_is_an_error() {
        let registry = Registry::new();
        ProbeMetrics::register(&registry).unwrap();
        let err = ProbeMetrics::register(&registry).err().unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
