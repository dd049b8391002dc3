//! The probe scheduler.
//!
//! Every registered probe gets its own task running a strictly sequential
//! loop: run, record the outcome, call the update sink, sleep for the interval
//! its policy picks, repeat. Tasks share nothing but the shutdown token and
//! the first-run barrier, so a slow or failing probe never holds up another.

use crate::barrier::FirstRunBarrier;
use crate::metrics::ProbeMetrics;
use crate::probe::{panic_message, Probe, ProbeRunner};
use crate::state::{ProbeState, ProbeStats};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use prometheus::Registry;
use statusd_config::CollectorConfig;
use statusd_core::{Error, Result, MIN_PROBE_INTERVAL};
use statusd_utils::tracing::probe_span;
use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn, Instrument};

const FIRST_RUN_OPERATION: &str = "wait for first probe run";

struct ProbeSlot {
    runner: Box<dyn ProbeRunner>,
    state: ProbeState,
}

impl ProbeSlot {
    fn name(&self) -> &str {
        self.runner.name()
    }

    /// Delay before the next run. A panicking policy falls back to `default`
    /// so the probe keeps being scheduled.
    fn next_interval(&self, default: Duration) -> Duration {
        let fallback = default.max(MIN_PROBE_INTERVAL);
        let Some(policy) = self.runner.interval() else {
            return fallback;
        };
        let failures = self.state.consecutive_failures();
        match panic::catch_unwind(AssertUnwindSafe(|| policy.next_interval(failures))) {
            Ok(interval) => interval,
            Err(payload) => {
                error!(
                    probe = %self.name(),
                    panic = %panic_message(payload.as_ref()),
                    interval = ?fallback,
                    "interval policy panicked, using the default interval"
                );
                fallback
            }
        }
    }
}

/// Builder for a [`Collector`]
pub struct CollectorBuilder {
    config: CollectorConfig,
    probes: Vec<Box<dyn ProbeRunner>>,
    registry: Option<Registry>,
}

impl CollectorBuilder {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            probes: Vec::new(),
            registry: None,
        }
    }

    /// Register a probe. Probes are fixed once the collector is built.
    #[must_use]
    pub fn probe<T: Send + 'static>(mut self, probe: Probe<T>) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    /// Export per-probe run metrics to `registry`
    #[must_use]
    pub fn metrics(mut self, registry: &Registry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    pub fn build(self) -> Result<Collector> {
        self.config.validate()?;

        let mut seen = HashSet::new();
        for probe in &self.probes {
            let name = probe.name();
            if name.is_empty() {
                return Err(Error::configuration("probe name must not be empty"));
            }
            if !seen.insert(name.to_string()) {
                return Err(Error::duplicate_probe(name));
            }
        }

        let metrics = self
            .registry
            .as_ref()
            .map(ProbeMetrics::register)
            .transpose()?;

        let probes: Vec<_> = self
            .probes
            .into_iter()
            .map(|runner| {
                Arc::new(ProbeSlot {
                    runner,
                    state: ProbeState::default(),
                })
            })
            .collect();

        let shutdown = CancellationToken::new();
        let inner = CollectorInner {
            barrier: Arc::new(FirstRunBarrier::new(probes.len())),
            config: self.config,
            probes,
            _shutdown_guard: shutdown.clone().drop_guard(),
            shutdown,
            handles: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            metrics,
        };

        Ok(Collector {
            inner: Arc::new(inner),
        })
    }
}

struct CollectorInner {
    config: CollectorConfig,
    probes: Vec<Arc<ProbeSlot>>,
    shutdown: CancellationToken,
    /// Stops the probe tasks if every handle is dropped without `close`
    _shutdown_guard: DropGuard,
    barrier: Arc<FirstRunBarrier>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
    metrics: Option<ProbeMetrics>,
}

/// Runs a fixed set of probes, each on its own task and cadence.
///
/// Cloning is cheap; all clones drive the same probes.
#[derive(Clone)]
pub struct Collector {
    inner: Arc<CollectorInner>,
}

impl Collector {
    pub fn builder(config: CollectorConfig) -> CollectorBuilder {
        CollectorBuilder::new(config)
    }

    /// Spawn one task per probe; the first run of each happens immediately.
    ///
    /// Must be called from within a tokio runtime. Calling it again is a
    /// no-op.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            warn!("status collector already started");
            return;
        }

        info!(probes = self.inner.probes.len(), "starting status collector");
        let mut handles = self.inner.handles.lock();
        for slot in &self.inner.probes {
            let task = ProbeTask {
                slot: Arc::clone(slot),
                default_interval: self.inner.config.interval,
                shutdown: self.inner.shutdown.clone(),
                barrier: Arc::clone(&self.inner.barrier),
                metrics: self.inner.metrics.clone(),
            };
            handles.push(tokio::spawn(task.run()));
        }
    }

    /// Probes whose current run started more than their staleness threshold
    /// ago, keyed by name, with the run's start time. Each stuck run is
    /// logged at warn level once.
    pub fn stale_probes(&self) -> BTreeMap<String, DateTime<Utc>> {
        let now = Instant::now();
        let mut stale = BTreeMap::new();
        for slot in &self.inner.probes {
            let threshold = slot
                .runner
                .stale_threshold()
                .unwrap_or(self.inner.config.stale_threshold);
            if let Some((since, newly_stale)) = slot.state.stale_since(now, threshold) {
                if newly_stale {
                    warn!(probe = %slot.name(), %since, threshold = ?threshold, "probe is stale");
                } else {
                    debug!(probe = %slot.name(), %since, "probe still stale");
                }
                stale.insert(slot.name().to_string(), since);
            }
        }
        stale
    }

    /// Wait until every probe has completed one run-and-sink cycle.
    ///
    /// Returns immediately once that has happened. Fails with
    /// [`Error::Cancelled`] if `cancel` fires first or the collector is closed
    /// before the barrier opens.
    pub async fn wait_for_first_run(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            () = self.inner.barrier.wait() => Ok(()),
            () = cancel.cancelled() => Err(Error::cancelled(FIRST_RUN_OPERATION)),
            () = self.inner.shutdown.cancelled() => Err(Error::cancelled(FIRST_RUN_OPERATION)),
        }
    }

    /// [`wait_for_first_run`](Self::wait_for_first_run) bounded by `timeout`
    pub async fn wait_for_first_run_timeout(&self, timeout: Duration) -> Result<()> {
        let cancel = CancellationToken::new();
        match tokio::time::timeout(timeout, self.wait_for_first_run(&cancel)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(FIRST_RUN_OPERATION, timeout)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.barrier.is_open()
    }

    /// Stop scheduling new runs and wait up to the shutdown grace period for
    /// probe tasks to exit. In-flight runs are never aborted; a run still
    /// going when the grace period expires is left to finish on its own.
    pub async fn close(&self) {
        self.inner.shutdown.cancel();
        let handles = std::mem::take(&mut *self.inner.handles.lock());
        if handles.is_empty() {
            return;
        }

        info!(tasks = handles.len(), "stopping status collector");
        let grace = self.inner.config.shutdown_grace;
        match tokio::time::timeout(grace, futures::future::join_all(handles)).await {
            Ok(results) => {
                for result in results.into_iter().filter_map(|r| r.err()) {
                    warn!(error = %result, "probe task ended abnormally");
                }
            }
            Err(_) => {
                warn!(grace = ?grace, "probe tasks still running after shutdown grace period");
            }
        }
    }

    pub fn probe_stats(&self, name: &str) -> Option<ProbeStats> {
        self.inner
            .probes
            .iter()
            .find(|slot| slot.name() == name)
            .map(|slot| slot.state.stats())
    }

    pub fn probe_names(&self) -> impl Iterator<Item = &str> {
        self.inner.probes.iter().map(|slot| slot.name())
    }
}

struct ProbeTask {
    slot: Arc<ProbeSlot>,
    default_interval: Duration,
    shutdown: CancellationToken,
    barrier: Arc<FirstRunBarrier>,
    metrics: Option<ProbeMetrics>,
}

impl ProbeTask {
    async fn run(self) {
        let name = self.slot.name().to_string();
        let mut delay = None;

        loop {
            if let Some(delay) = delay {
                tokio::select! {
                    biased;
                    () = self.shutdown.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            if self.shutdown.is_cancelled() {
                break;
            }

            let span = probe_span(&name, self.slot.state.consecutive_failures());
            debug!(parent: &span, "running probe");
            self.slot.state.begin_run();
            let started = Instant::now();
            let failure = self
                .slot
                .runner
                .execute(self.shutdown.child_token(), &self.slot.state)
                .instrument(span)
                .await;
            let first_cycle = self.slot.state.finish_run();
            if first_cycle {
                self.barrier.arrive();
            }

            let failures = self.slot.state.consecutive_failures();
            let next = self.slot.next_interval(self.default_interval);
            if let Some(metrics) = &self.metrics {
                metrics.observe(&name, failure.is_none(), started.elapsed(), failures);
            }
            if let Some(error) = failure {
                warn!(probe = %name, failures, interval = ?next, %error, "probe failed");
            }
            delay = Some(next);
        }

        debug!(probe = %name, "probe loop stopped");
    }
}
