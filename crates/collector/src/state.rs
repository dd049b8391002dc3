//! Per-probe bookkeeping shared between a probe's task and readers.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Read-only view of one probe's scheduling state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeStats {
    /// Completed run-and-sink cycles
    pub runs: u64,
    pub consecutive_failures: u32,
    /// Start of the current run, if one is in flight
    pub in_flight_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
struct RunStart {
    at: Instant,
    wall: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    in_flight: Option<RunStart>,
    consecutive_failures: u32,
    runs: u64,
    /// The in-flight run has already been reported stale
    stale_reported: bool,
}

/// Written only by the owning probe's task; read by staleness queries.
#[derive(Debug, Default)]
pub(crate) struct ProbeState {
    inner: Mutex<Inner>,
}

impl ProbeState {
    pub(crate) fn begin_run(&self) {
        let mut inner = self.inner.lock();
        inner.in_flight = Some(RunStart {
            at: Instant::now(),
            wall: Utc::now(),
        });
        inner.stale_reported = false;
    }

    /// Returns the new consecutive failure count
    pub(crate) fn record_result(&self, success: bool) -> u32 {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = if success {
            0
        } else {
            inner.consecutive_failures.saturating_add(1)
        };
        inner.consecutive_failures
    }

    /// Ends the in-flight run once the sink has been called. Returns `true`
    /// when this completed the probe's first cycle.
    pub(crate) fn finish_run(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.in_flight = None;
        inner.runs += 1;
        inner.runs == 1
    }

    pub(crate) fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    /// Start time of the in-flight run if it began more than `threshold` ago,
    /// and whether this is the first check to find that run stale.
    pub(crate) fn stale_since(
        &self,
        now: Instant,
        threshold: Duration,
    ) -> Option<(DateTime<Utc>, bool)> {
        let mut inner = self.inner.lock();
        let start = inner
            .in_flight
            .filter(|start| now.saturating_duration_since(start.at) > threshold)?;
        let newly_stale = !std::mem::replace(&mut inner.stale_reported, true);
        Some((start.wall, newly_stale))
    }

    pub(crate) fn stats(&self) -> ProbeStats {
        let inner = self.inner.lock();
        ProbeStats {
            runs: inner.runs,
            consecutive_failures: inner.consecutive_failures,
            in_flight_since: inner.in_flight.map(|start| start.wall),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_reset_on_success() {
        let state = ProbeState::default();
        assert_eq!(state.record_result(false), 1);
        assert_eq!(state.record_result(false), 2);
        assert_eq!(state.record_result(true), 0);
        assert_eq!(state.consecutive_failures(), 0);
    }

    #[test]
    fn test_first_finish_is_reported_once() {
        let state = ProbeState::default();
        state.begin_run();
        assert!(state.finish_run());
        state.begin_run();
        assert!(!state.finish_run());
        assert_eq!(state.stats().runs, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_only_while_in_flight_past_threshold() {
        let state = ProbeState::default();
        let threshold = Duration::from_millis(100);
        assert_eq!(state.stale_since(Instant::now(), threshold), None);

        state.begin_run();
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(state.stale_since(Instant::now(), threshold), None);

        tokio::time::advance(Duration::from_millis(1)).await;
        let (since, newly_stale) = state.stale_since(Instant::now(), threshold).unwrap();
        assert!(newly_stale);
        assert_eq!(state.stats().in_flight_since, Some(since));

        state.finish_run();
        assert_eq!(state.stale_since(Instant::now(), threshold), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_run_is_new_only_once() {
        let state = ProbeState::default();
        let threshold = Duration::from_millis(10);

        state.begin_run();
        tokio::time::advance(Duration::from_millis(20)).await;
        assert!(state.stale_since(Instant::now(), threshold).unwrap().1);
        assert!(!state.stale_since(Instant::now(), threshold).unwrap().1);
        assert!(!state.stale_since(Instant::now(), threshold).unwrap().1);

        // A later run that hangs is reported again
        state.finish_run();
        state.begin_run();
        tokio::time::advance(Duration::from_millis(20)).await;
        assert!(state.stale_since(Instant::now(), threshold).unwrap().1);
    }
}
