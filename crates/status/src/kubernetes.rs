//! Orchestrator connectivity: the version memoizer and the status it feeds.
//!
//! Asking the apiserver for its version on every probe run would put steady
//! load on it for no gain while other API traffic already proves the
//! connection works. The cached version is therefore reused as long as the
//! client has talked to the apiserver recently and the cache itself is not
//! too old.

use async_trait::async_trait;
use parking_lot::Mutex;
use statusd_core::{K8sStatus, Result, StatusState};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Version information reported by the apiserver
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerVersion {
    pub major: String,
    pub minor: String,
    pub git_version: String,
    pub platform: String,
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} ({}) [{}]",
            self.major, self.minor, self.git_version, self.platform
        )
    }
}

/// Client for the orchestrator API
#[async_trait]
pub trait K8sClient: Send + Sync {
    /// `false` when the daemon runs without an orchestrator
    fn is_enabled(&self) -> bool;

    async fn server_version(&self, cancel: &CancellationToken) -> Result<ServerVersion>;

    /// API groups the daemon is currently watching
    fn api_groups(&self) -> Vec<String>;
}

/// Time of the last successful interaction with the apiserver.
///
/// Shared between the API client, which calls [`touch`](Self::touch) after
/// every successful request, and the version cache.
#[derive(Debug, Default)]
pub struct LastInteraction {
    at: Mutex<Option<Instant>>,
}

impl LastInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&self) {
        *self.at.lock() = Some(Instant::now());
    }

    /// Time since the last interaction, `None` if there has been none
    pub fn elapsed(&self) -> Option<Duration> {
        self.at.lock().map(|at| at.elapsed())
    }
}

#[derive(Debug)]
struct CachedVersion {
    version: String,
    checked_at: Instant,
}

/// Memoized apiserver version
#[derive(Debug)]
pub struct K8sVersionCache {
    check_interval: Duration,
    heartbeat: Duration,
    last_interaction: Arc<LastInteraction>,
    cached: Mutex<Option<CachedVersion>>,
}

impl K8sVersionCache {
    pub fn new(
        check_interval: Duration,
        heartbeat: Duration,
        last_interaction: Arc<LastInteraction>,
    ) -> Self {
        Self {
            check_interval,
            heartbeat,
            last_interaction,
            cached: Mutex::new(None),
        }
    }

    /// The cached version string, if the apiserver was heard from within the
    /// heartbeat window and the cache is younger than the check interval.
    pub fn cached_version(&self) -> Option<String> {
        let cached = self.cached.lock();

        match self.last_interaction.elapsed() {
            Some(since) if since <= self.heartbeat => {}
            _ => return None,
        }

        cached
            .as_ref()
            .filter(|c| !c.version.is_empty() && c.checked_at.elapsed() <= self.check_interval)
            .map(|c| c.version.clone())
    }

    /// Store a freshly queried version and return its formatted string
    pub fn update(&self, version: &ServerVersion) -> String {
        let formatted = version.to_string();
        *self.cached.lock() = Some(CachedVersion {
            version: formatted.clone(),
            checked_at: Instant::now(),
        });
        formatted
    }

    pub fn last_interaction(&self) -> &Arc<LastInteraction> {
        &self.last_interaction
    }
}

/// Current orchestrator status, using the cached version when it is valid.
///
/// A failed version query is returned as an error so the probe backs off.
pub async fn k8s_status(
    client: Option<&dyn K8sClient>,
    cache: &K8sVersionCache,
    cancel: &CancellationToken,
) -> Result<K8sStatus> {
    let Some(client) = client.filter(|c| c.is_enabled()) else {
        return Ok(K8sStatus::disabled());
    };

    let version = match cache.cached_version() {
        Some(version) => version,
        None => {
            let info = client.server_version(cancel).await?;
            cache.last_interaction().touch();
            cache.update(&info)
        }
    };

    Ok(K8sStatus {
        state: StatusState::Ok,
        msg: version,
        k8s_api_versions: client.api_groups(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use statusd_core::Error;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const CHECK: Duration = Duration::from_secs(15 * 60);
    const HEARTBEAT: Duration = Duration::from_secs(60);

    fn version() -> ServerVersion {
        ServerVersion {
            major: "1".into(),
            minor: "29".into(),
            git_version: "v1.29.3".into(),
            platform: "linux/amd64".into(),
        }
    }

    #[derive(Default)]
    struct FakeClient {
        queries: AtomicUsize,
        failing: AtomicBool,
    }

    #[async_trait]
    impl K8sClient for FakeClient {
        fn is_enabled(&self) -> bool {
            true
        }

        async fn server_version(&self, _cancel: &CancellationToken) -> Result<ServerVersion> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::probe("", "connection refused"));
            }
            Ok(version())
        }

        fn api_groups(&self) -> Vec<String> {
            vec!["networking.k8s.io/v1::NetworkPolicy".into()]
        }
    }

    #[test]
    fn test_version_format() {
        assert_eq!(version().to_string(), "1.29 (v1.29.3) [linux/amd64]");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_requires_recent_heartbeat() {
        let heartbeat = Arc::new(LastInteraction::new());
        let cache = K8sVersionCache::new(CHECK, HEARTBEAT, Arc::clone(&heartbeat));

        cache.update(&version());
        assert_eq!(cache.cached_version(), None);

        heartbeat.touch();
        assert_eq!(
            cache.cached_version().as_deref(),
            Some("1.29 (v1.29.3) [linux/amd64]")
        );

        tokio::time::advance(HEARTBEAT + Duration::from_secs(1)).await;
        assert_eq!(cache.cached_version(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_expires_after_check_interval() {
        let heartbeat = Arc::new(LastInteraction::new());
        let cache = K8sVersionCache::new(CHECK, HEARTBEAT, Arc::clone(&heartbeat));
        cache.update(&version());

        tokio::time::advance(CHECK).await;
        heartbeat.touch();
        assert!(cache.cached_version().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        heartbeat.touch();
        assert_eq!(cache.cached_version(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reuses_cached_version() {
        let client = FakeClient::default();
        let cache = K8sVersionCache::new(CHECK, HEARTBEAT, Arc::new(LastInteraction::new()));
        let cancel = CancellationToken::new();

        let first = k8s_status(Some(&client), &cache, &cancel).await.unwrap();
        let second = k8s_status(Some(&client), &cache, &cancel).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.state, StatusState::Ok);
        assert_eq!(first.msg, "1.29 (v1.29.3) [linux/amd64]");
        assert_eq!(first.k8s_api_versions.len(), 1);
        assert_eq!(client.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_query_failure_is_an_error() {
        let client = FakeClient::default();
        client.failing.store(true, Ordering::SeqCst);
        let cache = K8sVersionCache::new(CHECK, HEARTBEAT, Arc::new(LastInteraction::new()));

        let err = k8s_status(Some(&client), &cache, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
        assert!(cache.last_interaction().elapsed().is_none());
    }

    #[tokio::test]
    async fn test_status_without_client_is_disabled() {
        let cache = K8sVersionCache::new(CHECK, HEARTBEAT, Arc::new(LastInteraction::new()));
        let status = k8s_status(None, &cache, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(status, K8sStatus::disabled());
    }
}
