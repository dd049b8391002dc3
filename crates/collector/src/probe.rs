//! Probe definitions.
//!
//! A [`Probe`] is typed by the payload it produces, so its update sink gets a
//! concrete `Result<T>` rather than something it has to downcast. The
//! collector stores probes behind the object-safe [`ProbeRunner`] trait.

use crate::interval::IntervalPolicy;
use crate::state::ProbeState;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use statusd_core::{Error, Result};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::error;

type RunFn<T> = Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<T>> + Send + Sync>;
type UpdateSink<T> = Arc<dyn Fn(Result<T>) + Send + Sync>;

/// A named, independently scheduled health check
pub struct Probe<T> {
    name: String,
    run: RunFn<T>,
    interval: Option<IntervalPolicy>,
    stale_threshold: Option<Duration>,
    on_update: Option<UpdateSink<T>>,
}

impl<T: Send + 'static> Probe<T> {
    /// Create a probe from an async status function
    pub fn new<F, Fut>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(move |token| run(token).boxed()),
            interval: None,
            stale_threshold: None,
            on_update: None,
        }
    }

    /// Create a probe from a synchronous status function, run on the blocking
    /// thread pool so it cannot stall other probes.
    pub fn blocking<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&CancellationToken) -> Result<T> + Send + Sync + 'static,
    {
        let name = name.into();
        let probe_name = name.clone();
        let run = Arc::new(run);
        Self::new(name, move |token| {
            let run = Arc::clone(&run);
            let probe_name = probe_name.clone();
            async move {
                match tokio::task::spawn_blocking(move || run(&token)).await {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => Err(Error::probe_panicked(
                        probe_name,
                        panic_message(e.into_panic().as_ref()),
                    )),
                    Err(e) => Err(Error::probe(probe_name, e.to_string())),
                }
            }
        })
    }

    /// Interval policy; without one the collector default applies
    #[must_use]
    pub fn interval(mut self, policy: IntervalPolicy) -> Self {
        self.interval = Some(policy);
        self
    }

    /// Staleness threshold; without one the collector default applies
    #[must_use]
    pub fn stale_threshold(mut self, threshold: Duration) -> Self {
        self.stale_threshold = Some(threshold);
        self
    }

    /// Callback receiving every result, in run order
    #[must_use]
    pub fn on_update<S>(mut self, sink: S) -> Self
    where
        S: Fn(Result<T>) + Send + Sync + 'static,
    {
        self.on_update = Some(Arc::new(sink));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Object-safe view of a probe used by the collector
#[async_trait]
pub(crate) trait ProbeRunner: Send + Sync {
    fn name(&self) -> &str;

    fn interval(&self) -> Option<&IntervalPolicy>;

    fn stale_threshold(&self) -> Option<Duration>;

    /// Run once, record the outcome in `state`, then hand the result to the
    /// update sink. Panics in either the run or the sink are contained here.
    /// Returns the error text when the run failed.
    async fn execute(&self, token: CancellationToken, state: &ProbeState) -> Option<String>;
}

#[async_trait]
impl<T: Send + 'static> ProbeRunner for Probe<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Option<&IntervalPolicy> {
        self.interval.as_ref()
    }

    fn stale_threshold(&self) -> Option<Duration> {
        self.stale_threshold
    }

    async fn execute(&self, token: CancellationToken, state: &ProbeState) -> Option<String> {
        let run = Arc::clone(&self.run);
        let outcome = AssertUnwindSafe(async move { run(token).await })
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(result) => result.map_err(|e| e.for_probe(&self.name)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    probe = %self.name,
                    panic = %message,
                    "probe panicked; recording as failure"
                );
                Err(Error::probe_panicked(&self.name, message))
            }
        };

        let failure = result.as_ref().err().map(ToString::to_string);
        state.record_result(failure.is_none());

        if let Some(sink) = &self.on_update {
            let delivered = std::panic::catch_unwind(AssertUnwindSafe(|| sink(result)));
            if let Err(payload) = delivered {
                error!(
                    probe = %self.name,
                    panic = %panic_message(payload.as_ref()),
                    "probe update sink panicked"
                );
            }
        }

        failure
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
