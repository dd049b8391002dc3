//! Wires every subsystem into a probe and answers status queries.

use crate::kubernetes::{k8s_status, K8sClient, K8sVersionCache};
use crate::rollup::{evaluate, RollupContext};
use crate::store::{project, StatusStore};
use crate::subsystems::{Source, StatusSource, Subsystems};
use prometheus::Registry;
use statusd_collector::{
    BackoffPolicy, ClusterSizeCadence, Collector, CollectorBuilder, IntervalPolicy, Probe,
};
use statusd_config::StatusConfig;
use statusd_core::{
    ClusterStatus, EncryptionStatus, K8sStatus, Result, ResultExt, Status, StatusResponse,
    PROBE_AUTH_CERT_PROVIDER, PROBE_CLUSTER, PROBE_CLUSTERMESH, PROBE_CLUSTER_HEALTH,
    PROBE_CNI_CONFIG, PROBE_CONTAINER_RUNTIME, PROBE_CONTROLLERS, PROBE_ENCRYPTION, PROBE_HUBBLE,
    PROBE_IPAM, PROBE_KUBERNETES, PROBE_KUBE_PROXY_REPLACEMENT, PROBE_KVSTORE, PROBE_L7_PROXY,
    PROBE_NODE_MONITOR,
};
use std::sync::Arc;
use tracing::{error, info};

const KVSTORE_HELP: &str = "statusd depends on the availability of the kvstore operator and its \
     etcd cluster. Check that the operator and the etcd cluster are running and do not report \
     any warnings or errors.";

/// Owns the collector and the aggregate it fills
pub struct StatusReporter {
    store: Arc<StatusStore>,
    collector: Collector,
    version_cache: Arc<K8sVersionCache>,
    kubernetes: Option<Arc<dyn K8sClient>>,
    banner: String,
    kvstore_kind: String,
}

impl StatusReporter {
    /// Register a probe per subsystem, start them and wait until each has
    /// reported once.
    pub async fn start(config: StatusConfig, subsystems: Subsystems) -> Result<Self> {
        Self::start_with_metrics(config, subsystems, None).await
    }

    /// Like [`start`](Self::start), exporting probe metrics to `registry`
    pub async fn start_with_metrics(
        config: StatusConfig,
        subsystems: Subsystems,
        registry: Option<&Registry>,
    ) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(StatusStore::new());
        let version_cache = Arc::new(K8sVersionCache::new(
            config.k8s_version_check_interval,
            config.k8s_minimum_event_heartbeat,
            Arc::clone(&subsystems.k8s_last_interaction),
        ));

        let mut builder = register_probes(
            Collector::builder(config.collector.clone()),
            &config,
            &subsystems,
            &store,
            &version_cache,
        );
        if let Some(registry) = registry {
            builder = builder.metrics(registry);
        }
        let collector = builder.build().context("registering status probes")?;

        collector.start();
        if let Err(e) = collector
            .wait_for_first_run_timeout(config.first_run_timeout)
            .await
        {
            error!(error = %e, "status probes did not complete their first run");
            collector.close().await;
            return Err(e);
        }
        info!(node = %subsystems.node_name, "status collector ready");

        Ok(Self {
            store,
            collector,
            version_cache,
            kubernetes: subsystems.kubernetes,
            banner: config.version.banner(),
            kvstore_kind: config.kvstore_kind,
        })
    }

    /// Current aggregate with its verdict in `daemon` and the stale probes in
    /// `stale`. A brief response carries only the cluster health status and
    /// the first failing controller.
    pub fn status(&self, brief: bool, require_k8s_connectivity: bool) -> StatusResponse {
        let stale = self.collector.stale_probes();
        let ctx = RollupContext {
            banner: &self.banner,
            kvstore_kind: &self.kvstore_kind,
            k8s_enabled: self.kubernetes.as_ref().is_some_and(|k| k.is_enabled()),
            require_k8s_connectivity,
        };

        self.store.read(|live| {
            let mut response = project(live, brief);
            response.daemon = Some(evaluate(&ctx, live, &stale));
            response.stale = stale;
            response
        })
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    pub fn version_cache(&self) -> &Arc<K8sVersionCache> {
        &self.version_cache
    }

    /// Stop all probes
    pub async fn close(&self) {
        let kvstore = self.store.read(|live| live.kvstore.clone());
        if let Some(kvstore) = kvstore.filter(|s| !s.state.is_ok_or_disabled()) {
            error!(status = %kvstore.msg, help = KVSTORE_HELP, "kvstore state not OK");
        }
        self.collector.close().await;
    }
}

fn source_probe<T: Send + 'static>(name: &str, source: &Arc<dyn StatusSource<T>>) -> Probe<T> {
    let source = Arc::clone(source);
    Probe::new(name, move |cancel| {
        let source = Arc::clone(&source);
        async move { source.status(&cancel).await }
    })
}

/// Probe for a subsystem that always reports: `absent()` stands in for a
/// subsystem that is not configured.
fn source_probe_or<T: Send + 'static>(
    name: &str,
    source: &Source<T>,
    absent: fn() -> T,
) -> Probe<T> {
    match source {
        Some(source) => source_probe(name, source),
        None => Probe::new(name, move |_| async move { Ok(absent()) }),
    }
}

/// Sink for subsystems that cannot express errors: failures are dropped and
/// the last good value stays in place.
fn keep_last<T, F>(store: &Arc<StatusStore>, assign: F) -> impl Fn(Result<T>) + Send + Sync
where
    T: 'static,
    F: Fn(&mut StatusResponse, T) + Send + Sync + 'static,
{
    let store = Arc::clone(store);
    move |result| {
        if let Ok(value) = result {
            store.update(|sr| assign(sr, value));
        }
    }
}

/// Sink for subsystems whose errors are shown as a `Failure` status
fn record_failures<F>(
    store: &Arc<StatusStore>,
    assign: F,
) -> impl Fn(Result<Status>) + Send + Sync
where
    F: Fn(&mut StatusResponse, Status) + Send + Sync + 'static,
{
    let store = Arc::clone(store);
    move |result| {
        let status = result.unwrap_or_else(|e| Status::failure(e.to_string()));
        store.update(|sr| assign(sr, status));
    }
}

/// Subsystems with a default always get a probe. The others get one only
/// when a source is configured, so every registered probe's field is set
/// once the first run completes.
fn register_probes(
    builder: CollectorBuilder,
    config: &StatusConfig,
    subsystems: &Subsystems,
    store: &Arc<StatusStore>,
    version_cache: &Arc<K8sVersionCache>,
) -> CollectorBuilder {
    let mut builder = builder
        .probe(
            source_probe_or(PROBE_KVSTORE, &subsystems.kvstore, Status::disabled)
                .on_update(record_failures(store, |sr, s| sr.kvstore = Some(s))),
        )
        .probe(kubernetes_probe(config, subsystems, store, version_cache))
        .probe(cluster_probe(&subsystems.node_name, store))
        .probe(
            source_probe_or(PROBE_ENCRYPTION, &subsystems.encryption, EncryptionStatus::default)
                .on_update(keep_last(store, |sr, v| sr.encryption = Some(v))),
        )
        .probe(
            source_probe_or(
                PROBE_AUTH_CERT_PROVIDER,
                &subsystems.auth_cert_provider,
                Status::disabled,
            )
            .on_update(keep_last(store, |sr, v| sr.auth_certificate_provider = Some(v))),
        );

    if let Some(source) = &subsystems.container_runtime {
        builder = builder.probe(
            source_probe(PROBE_CONTAINER_RUNTIME, source)
                .on_update(record_failures(store, |sr, s| sr.container_runtime = Some(s))),
        );
    }
    if let Some(source) = &subsystems.ipam {
        builder = builder.probe(
            source_probe(PROBE_IPAM, source)
                .on_update(keep_last(store, |sr, v| sr.ipam = Some(v))),
        );
    }
    if let Some(source) = &subsystems.node_monitor {
        builder = builder.probe(
            source_probe(PROBE_NODE_MONITOR, source)
                .on_update(keep_last(store, |sr, v| sr.node_monitor = Some(v))),
        );
    }
    if let Some(source) = &subsystems.cluster_health {
        builder = builder.probe(source_probe(PROBE_CLUSTER_HEALTH, source).on_update(
            record_failures(store, |sr, s| {
                sr.cluster
                    .get_or_insert_with(ClusterStatus::default)
                    .cluster_health = Some(s);
            }),
        ));
    }
    if let Some(source) = &subsystems.l7_proxy {
        builder = builder.probe(
            source_probe(PROBE_L7_PROXY, source)
                .on_update(keep_last(store, |sr, v| sr.proxy = Some(v))),
        );
    }
    if let Some(source) = &subsystems.controllers {
        builder = builder.probe(
            source_probe(PROBE_CONTROLLERS, source)
                .on_update(keep_last(store, |sr, v| sr.controllers = v)),
        );
    }
    if let Some(source) = &subsystems.cluster_mesh {
        builder = builder.probe(
            source_probe(PROBE_CLUSTERMESH, source)
                .on_update(keep_last(store, |sr, v| sr.cluster_mesh = Some(v))),
        );
    }
    if let Some(source) = &subsystems.hubble {
        builder = builder.probe(
            source_probe(PROBE_HUBBLE, source)
                .on_update(keep_last(store, |sr, v| sr.hubble = Some(v))),
        );
    }
    if let Some(source) = &subsystems.kube_proxy_replacement {
        builder = builder.probe(
            source_probe(PROBE_KUBE_PROXY_REPLACEMENT, source)
                .on_update(keep_last(store, |sr, v| sr.kube_proxy_replacement = Some(v))),
        );
    }
    if let Some(source) = &subsystems.cni_config {
        builder = builder.probe(
            source_probe(PROBE_CNI_CONFIG, source)
                .on_update(keep_last(store, |sr, v| sr.cni_file = Some(v))),
        );
    }
    builder
}

/// Orchestrator probe: backs off exponentially while failing and otherwise
/// runs on a cadence that stretches with the cluster size.
fn kubernetes_probe(
    config: &StatusConfig,
    subsystems: &Subsystems,
    store: &Arc<StatusStore>,
    version_cache: &Arc<K8sVersionCache>,
) -> Probe<K8sStatus> {
    let policy = IntervalPolicy::cluster_size_adaptive(
        BackoffPolicy::from(&config.kubernetes_backoff),
        ClusterSizeCadence::new(
            config.kubernetes_base_interval,
            config.kubernetes_max_interval,
        ),
        {
            let node_count = Arc::clone(&subsystems.node_count);
            move || node_count()
        },
    );

    let client = subsystems.kubernetes.clone();
    let cache = Arc::clone(version_cache);
    let store = Arc::clone(store);

    Probe::new(PROBE_KUBERNETES, move |cancel| {
        let client = client.clone();
        let cache = Arc::clone(&cache);
        async move { k8s_status(client.as_deref(), &cache, &cancel).await }
    })
    .interval(policy)
    .on_update(move |result| {
        let status = result.unwrap_or_else(|e| K8sStatus::failure(e.to_string()));
        store.update(|sr| sr.kubernetes = Some(status));
    })
}

/// Reports this node's name. The health sub-field belongs to the
/// cluster-health probe and is carried over untouched.
fn cluster_probe(node_name: &str, store: &Arc<StatusStore>) -> Probe<ClusterStatus> {
    let node_name = node_name.to_string();
    let store = Arc::clone(store);

    Probe::new(PROBE_CLUSTER, move |_| {
        let cluster = ClusterStatus {
            self_name: node_name.clone(),
            cluster_health: None,
        };
        async move { Ok(cluster) }
    })
    .on_update(move |result| {
        if let Ok(mut cluster) = result {
            store.update(|sr| {
                cluster.cluster_health = sr.cluster.take().and_then(|c| c.cluster_health);
                sr.cluster = Some(cluster);
            });
        }
    })
}
