//! The monitored subsystems, as seen by the status reporter.
//!
//! Each subsystem only needs to answer one question: what is your status
//! right now. Subsystems the daemon runs without are left as `None`.

use crate::kubernetes::{K8sClient, LastInteraction};
use async_trait::async_trait;
use statusd_core::{
    ClusterMeshStatus, ControllerStatus, EncryptionStatus, HubbleStatus, IpamStatus,
    KubeProxyReplacement, MonitorStatus, ProxyStatus, Result, Status,
};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A subsystem able to report its current status
#[async_trait]
pub trait StatusSource<T>: Send + Sync {
    async fn status(&self, cancel: &CancellationToken) -> Result<T>;
}

/// Adapter turning a synchronous closure into a [`StatusSource`]
pub struct FnSource<F>(F);

#[async_trait]
impl<T, F> StatusSource<T> for FnSource<F>
where
    T: Send + 'static,
    F: Fn() -> Result<T> + Send + Sync,
{
    async fn status(&self, _cancel: &CancellationToken) -> Result<T> {
        (self.0)()
    }
}

/// Wrap a closure as a shared status source
pub fn from_fn<T, F>(f: F) -> Arc<dyn StatusSource<T>>
where
    T: Send + 'static,
    F: Fn() -> Result<T> + Send + Sync + 'static,
{
    Arc::new(FnSource(f))
}

pub type Source<T> = Option<Arc<dyn StatusSource<T>>>;

type NodeCountFn = Arc<dyn Fn() -> usize + Send + Sync>;

/// Everything the reporter probes
#[derive(Clone)]
pub struct Subsystems {
    /// Name of this node, reported in the cluster status
    pub node_name: String,
    /// Number of nodes in the cluster; stretches the orchestrator probe's
    /// healthy cadence
    pub node_count: NodeCountFn,
    pub kvstore: Source<Status>,
    pub kubernetes: Option<Arc<dyn K8sClient>>,
    /// Heartbeat updated by the orchestrator client
    pub k8s_last_interaction: Arc<LastInteraction>,
    pub container_runtime: Source<Status>,
    pub ipam: Source<IpamStatus>,
    pub node_monitor: Source<MonitorStatus>,
    pub cluster_health: Source<Status>,
    pub l7_proxy: Source<ProxyStatus>,
    pub controllers: Source<Vec<ControllerStatus>>,
    pub cluster_mesh: Source<ClusterMeshStatus>,
    pub hubble: Source<HubbleStatus>,
    pub encryption: Source<EncryptionStatus>,
    pub kube_proxy_replacement: Source<KubeProxyReplacement>,
    pub auth_cert_provider: Source<Status>,
    pub cni_config: Source<Status>,
}

impl Subsystems {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            node_count: Arc::new(|| 1),
            kvstore: None,
            kubernetes: None,
            k8s_last_interaction: Arc::new(LastInteraction::new()),
            container_runtime: None,
            ipam: None,
            node_monitor: None,
            cluster_health: None,
            l7_proxy: None,
            controllers: None,
            cluster_mesh: None,
            hubble: None,
            encryption: None,
            kube_proxy_replacement: None,
            auth_cert_provider: None,
            cni_config: None,
        }
    }

    #[must_use]
    pub fn node_count<F>(mut self, f: F) -> Self
    where
        F: Fn() -> usize + Send + Sync + 'static,
    {
        self.node_count = Arc::new(f);
        self
    }
}

impl Default for Subsystems {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for Subsystems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subsystems")
            .field("node_name", &self.node_name)
            .field("kvstore", &self.kvstore.is_some())
            .field("kubernetes", &self.kubernetes.is_some())
            .field("container_runtime", &self.container_runtime.is_some())
            .field("cluster_health", &self.cluster_health.is_some())
            .finish_non_exhaustive()
    }
}
