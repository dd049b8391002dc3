//! Level-triggered barrier that opens once every probe has completed a cycle.

use tokio::sync::watch;

#[derive(Debug)]
pub(crate) struct FirstRunBarrier {
    pending: watch::Sender<usize>,
}

impl FirstRunBarrier {
    pub(crate) fn new(probes: usize) -> Self {
        let (pending, _) = watch::channel(probes);
        Self { pending }
    }

    /// Called exactly once per probe, after its first sink call
    pub(crate) fn arrive(&self) {
        self.pending.send_modify(|pending| *pending = pending.saturating_sub(1));
    }

    pub(crate) fn is_open(&self) -> bool {
        *self.pending.borrow() == 0
    }

    /// Resolves once the barrier is open; returns immediately if it already is
    pub(crate) async fn wait(&self) {
        let mut rx = self.pending.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }
}
