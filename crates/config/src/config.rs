//! Configuration structs for the collector and the status reporter
//!
//! All durations are carried as `Duration` in memory and encoded as integer
//! milliseconds when (de)serialized.

use serde::{Deserialize, Serialize};
use statusd_core::{
    Error, Result, DEFAULT_FIRST_RUN_TIMEOUT, DEFAULT_KVSTORE_KIND, DEFAULT_PROBE_INTERVAL,
    DEFAULT_SHUTDOWN_GRACE, DEFAULT_STALE_THRESHOLD, K8S_BACKOFF_FACTOR, K8S_BACKOFF_MAX,
    K8S_BACKOFF_MIN, K8S_BASE_INTERVAL, K8S_MINIMUM_EVENT_HEARTBEAT, K8S_VERSION_CHECK_INTERVAL,
};
use std::time::Duration;

/// Settings applied to every probe that does not bring its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Delay between runs for probes without an interval policy
    #[serde(rename = "interval_ms", with = "duration_ms")]
    pub interval: Duration,
    /// In-flight time after which a probe is reported as stale
    #[serde(rename = "stale_threshold_ms", with = "duration_ms")]
    pub stale_threshold: Duration,
    /// How long `close` waits for probe tasks to exit
    #[serde(rename = "shutdown_grace_ms", with = "duration_ms")]
    pub shutdown_grace: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PROBE_INTERVAL,
            stale_threshold: DEFAULT_STALE_THRESHOLD,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::configuration("collector interval must be positive"));
        }
        if self.stale_threshold.is_zero() {
            return Err(Error::configuration(
                "collector stale threshold must be positive",
            ));
        }
        Ok(())
    }
}

/// Exponential backoff used while a probe keeps failing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    #[serde(rename = "min_ms", with = "duration_ms")]
    pub min: Duration,
    #[serde(rename = "max_ms", with = "duration_ms")]
    pub max: Duration,
    pub factor: f64,
    pub jitter: bool,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            min: K8S_BACKOFF_MIN,
            max: K8S_BACKOFF_MAX,
            factor: K8S_BACKOFF_FACTOR,
            jitter: false,
        }
    }
}

impl BackoffSettings {
    pub fn validate(&self) -> Result<()> {
        if self.min.is_zero() {
            return Err(Error::configuration("backoff minimum must be positive"));
        }
        if self.min > self.max {
            return Err(Error::configuration(format!(
                "backoff minimum {:?} exceeds maximum {:?}",
                self.min, self.max
            )));
        }
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(Error::configuration(format!(
                "backoff factor must be a finite value >= 1.0, got {}",
                self.factor
            )));
        }
        Ok(())
    }
}

/// Daemon version, rendered into every verdict message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    pub version: String,
    pub revision: String,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            revision: "unknown".to_string(),
        }
    }
}

impl VersionInfo {
    /// `"<version> (v<version>-<revision>)"`
    pub fn banner(&self) -> String {
        format!("{} (v{}-{})", self.version, self.version, self.revision)
    }
}

/// Settings for the status reporter and the probes it registers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub collector: CollectorConfig,
    /// Maximum age of the memoized orchestrator version
    #[serde(rename = "k8s_version_check_interval_ms", with = "duration_ms")]
    pub k8s_version_check_interval: Duration,
    /// Any successful orchestrator interaction within this window counts as
    /// proof of connectivity
    #[serde(rename = "k8s_minimum_event_heartbeat_ms", with = "duration_ms")]
    pub k8s_minimum_event_heartbeat: Duration,
    pub kubernetes_backoff: BackoffSettings,
    /// Base of the cluster-size dependent cadence while healthy
    #[serde(rename = "kubernetes_base_interval_ms", with = "duration_ms")]
    pub kubernetes_base_interval: Duration,
    /// Upper bound of the cluster-size dependent cadence
    #[serde(rename = "kubernetes_max_interval_ms", with = "duration_ms")]
    pub kubernetes_max_interval: Duration,
    /// Bound on the startup readiness barrier
    #[serde(rename = "first_run_timeout_ms", with = "duration_ms")]
    pub first_run_timeout: Duration,
    /// Name of the control-plane store used in verdict messages
    pub kvstore_kind: String,
    pub version: VersionInfo,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            collector: CollectorConfig::default(),
            k8s_version_check_interval: K8S_VERSION_CHECK_INTERVAL,
            k8s_minimum_event_heartbeat: K8S_MINIMUM_EVENT_HEARTBEAT,
            kubernetes_backoff: BackoffSettings::default(),
            kubernetes_base_interval: K8S_BASE_INTERVAL,
            kubernetes_max_interval: K8S_BACKOFF_MAX,
            first_run_timeout: DEFAULT_FIRST_RUN_TIMEOUT,
            kvstore_kind: DEFAULT_KVSTORE_KIND.to_string(),
            version: VersionInfo::default(),
        }
    }
}

impl StatusConfig {
    pub fn validate(&self) -> Result<()> {
        self.collector.validate()?;
        self.kubernetes_backoff.validate()?;
        if self.kubernetes_base_interval.is_zero() {
            return Err(Error::configuration(
                "kubernetes base interval must be positive",
            ));
        }
        if self.kubernetes_max_interval < self.kubernetes_base_interval {
            return Err(Error::configuration(
                "kubernetes max interval must not be below the base interval",
            ));
        }
        if self.first_run_timeout.is_zero() {
            return Err(Error::configuration("first run timeout must be positive"));
        }
        Ok(())
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
