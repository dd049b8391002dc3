/// Constants used throughout the statusd codebase
use std::time::Duration;

// Collector defaults
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(60);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// Any interval below this is raised to it so a probe can never spin
pub const MIN_PROBE_INTERVAL: Duration = Duration::from_millis(1);

// Kubernetes version memoization
pub const K8S_VERSION_CHECK_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const K8S_MINIMUM_EVENT_HEARTBEAT: Duration = Duration::from_secs(60);

// Kubernetes probe cadence
pub const K8S_BACKOFF_MIN: Duration = Duration::from_secs(5);
pub const K8S_BACKOFF_MAX: Duration = Duration::from_secs(2 * 60);
pub const K8S_BACKOFF_FACTOR: f64 = 2.0;
pub const K8S_BASE_INTERVAL: Duration = Duration::from_secs(10);

// Reporter startup
pub const DEFAULT_FIRST_RUN_TIMEOUT: Duration = Duration::from_secs(60);

// Rollup messages
pub const DEFAULT_KVSTORE_KIND: &str = "Kvstore";
pub const STATUS_MESSAGE_SPACER: &str = "    ";
pub const STALE_STATUS_MESSAGE: &str = "Stale status data";

// Probe names
pub const PROBE_KVSTORE: &str = "kvstore";
pub const PROBE_KUBERNETES: &str = "kubernetes";
pub const PROBE_CONTAINER_RUNTIME: &str = "container-runtime";
pub const PROBE_IPAM: &str = "ipam";
pub const PROBE_NODE_MONITOR: &str = "node-monitor";
pub const PROBE_CLUSTER: &str = "cluster";
pub const PROBE_CLUSTER_HEALTH: &str = "cluster-health";
pub const PROBE_L7_PROXY: &str = "l7-proxy";
pub const PROBE_CONTROLLERS: &str = "controllers";
pub const PROBE_CLUSTERMESH: &str = "clustermesh";
pub const PROBE_HUBBLE: &str = "hubble";
pub const PROBE_ENCRYPTION: &str = "encryption";
pub const PROBE_KUBE_PROXY_REPLACEMENT: &str = "kube-proxy-replacement";
pub const PROBE_AUTH_CERT_PROVIDER: &str = "auth-cert-provider";
pub const PROBE_CNI_CONFIG: &str = "cni-config";

// Configuration environment overrides
pub const ENV_INTERVAL_MS: &str = "STATUSD_INTERVAL_MS";
pub const ENV_STALE_THRESHOLD_MS: &str = "STATUSD_STALE_THRESHOLD_MS";
pub const ENV_SHUTDOWN_GRACE_MS: &str = "STATUSD_SHUTDOWN_GRACE_MS";
pub const ENV_FIRST_RUN_TIMEOUT_MS: &str = "STATUSD_FIRST_RUN_TIMEOUT_MS";
