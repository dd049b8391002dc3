//! Subsystem payloads and the aggregate status response.
//!
//! Every type here owns its data, so `Clone` is a deep copy. Snapshots taken
//! from the status store rely on that: a cloned `StatusResponse` shares no
//! memory with the live aggregate.

use crate::types::Status;
use crate::StatusState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Orchestrator connectivity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct K8sStatus {
    pub state: StatusState,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub msg: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub k8s_api_versions: Vec<String>,
}

impl K8sStatus {
    pub fn disabled() -> Self {
        Self {
            state: StatusState::Disabled,
            ..Default::default()
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            state: StatusState::Failure,
            msg: msg.into(),
            k8s_api_versions: Vec::new(),
        }
    }
}

/// IP address allocator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IpamStatus {
    #[serde(default)]
    pub allocations: BTreeMap<String, String>,
    #[serde(default)]
    pub ipv4: Vec<String>,
    #[serde(default)]
    pub ipv6: Vec<String>,
    #[serde(default)]
    pub status: String,
}

/// Node event monitor
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub cpus: i64,
    pub npages: i64,
    pub pagesize: i64,
    pub lost: i64,
    pub unknown: i64,
}

/// Cluster identity plus the connectivity health checker result.
///
/// Written by two probes: `cluster` owns `self_name`, `cluster-health` owns
/// `cluster_health`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClusterStatus {
    #[serde(rename = "self", default)]
    pub self_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_health: Option<Status>,
}

/// L7 proxy
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProxyStatus {
    pub ip: String,
    pub port_range: String,
    pub total_redirects: i64,
    pub total_ports: i64,
}

/// Run history of one background controller
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControllerRunStatus {
    pub success_count: i64,
    pub failure_count: i64,
    pub consecutive_failure_count: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_failure_msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ControllerRunStatus>,
}

impl ControllerStatus {
    /// Message of the last failure, if the controller is currently failing
    pub fn failure_message(&self) -> Option<&str> {
        self.status
            .as_ref()
            .map(|s| s.last_failure_msg.as_str())
            .filter(|msg| !msg.is_empty())
    }
}

/// One remote cluster in the mesh
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteCluster {
    pub name: String,
    pub ready: bool,
    pub num_nodes: i64,
    pub num_endpoints: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClusterMeshStatus {
    #[serde(default)]
    pub clusters: Vec<RemoteCluster>,
    pub num_global_services: i64,
}

/// Flow observability pipeline
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HubbleStatus {
    pub state: StatusState,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observer: Option<ObserverStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObserverStatus {
    pub current_flows: i64,
    pub max_flows: i64,
    pub seen_flows: i64,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncryptionMode {
    #[default]
    Disabled,
    IPsec,
    Wireguard,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireguardInterface {
    pub name: String,
    pub listening_port: i64,
    pub peer_count: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub public_key: String,
}

/// Transparent encryption agent
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncryptionStatus {
    pub mode: EncryptionMode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub msg: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wireguard: Vec<WireguardInterface>,
}

/// Load-balancer replacement summary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KubeProxyReplacement {
    pub mode: String,
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub direct_routing_device: String,
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}

/// The aggregate, one field per monitored subsystem.
///
/// `stale` and `daemon` are derived on every query and never stored in the
/// live aggregate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kvstore: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<K8sStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_runtime: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipam: Option<IpamStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_monitor: Option<MonitorStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controllers: Vec<ControllerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_mesh: Option<ClusterMeshStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hubble: Option<HubbleStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_proxy_replacement: Option<KubeProxyReplacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_certificate_provider: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cni_file: Option<Status>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stale: BTreeMap<String, DateTime<Utc>>,
}
