//! The aggregate status store.
//!
//! One `StatusResponse` behind a reader/writer lock. Probe sinks write their
//! own field through [`StatusStore::update`]; readers take isolated copies.

use parking_lot::RwLock;
use statusd_core::{ClusterStatus, StatusResponse};

#[derive(Debug, Default)]
pub struct StatusStore {
    live: RwLock<StatusResponse>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the live aggregate under the write lock
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut StatusResponse),
    {
        f(&mut *self.live.write());
    }

    /// Run `f` against the live aggregate under the read lock
    pub fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&StatusResponse) -> R,
    {
        f(&*self.live.read())
    }

    /// Isolated copy of the aggregate, or of its brief projection
    pub fn snapshot(&self, brief: bool) -> StatusResponse {
        self.read(|live| project(live, brief))
    }
}

/// Copy `live`, or just the parts a brief query cares about: the cluster
/// health status and the first controller reporting a failure.
pub fn project(live: &StatusResponse, brief: bool) -> StatusResponse {
    if !brief {
        return live.clone();
    }

    let cluster = ClusterStatus {
        cluster_health: live
            .cluster
            .as_ref()
            .and_then(|c| c.cluster_health.clone()),
        ..ClusterStatus::default()
    };

    // One failing controller is enough for a brief client to act on
    let controllers = live
        .controllers
        .iter()
        .find(|c| c.failure_message().is_some())
        .cloned()
        .into_iter()
        .collect();

    StatusResponse {
        cluster: Some(cluster),
        controllers,
        ..StatusResponse::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statusd_core::{ControllerRunStatus, ControllerStatus, IpamStatus, Status};

    fn controller(name: &str, failure: &str) -> ControllerStatus {
        ControllerStatus {
            name: name.into(),
            status: Some(ControllerRunStatus {
                last_failure_msg: failure.into(),
                ..ControllerRunStatus::default()
            }),
        }
    }

    fn populated() -> StatusStore {
        let store = StatusStore::new();
        store.update(|sr| {
            sr.kvstore = Some(Status::ok("etcd: 3/3 connected"));
            sr.ipam = Some(IpamStatus::default());
            sr.cluster = Some(ClusterStatus {
                self_name: "node-1".into(),
                cluster_health: Some(Status::ok("Health check ok")),
            });
            sr.controllers = vec![
                controller("healthy", ""),
                ControllerStatus {
                    name: "never-ran".into(),
                    status: None,
                },
                controller("first-failing", "timeout"),
                controller("second-failing", "refused"),
            ];
        });
        store
    }

    #[test]
    fn test_full_snapshot_is_isolated() {
        let store = populated();
        let snapshot = store.snapshot(false);

        store.update(|sr| {
            sr.kvstore = Some(Status::failure("lost quorum"));
            sr.controllers.clear();
        });

        assert_eq!(snapshot.kvstore, Some(Status::ok("etcd: 3/3 connected")));
        assert_eq!(snapshot.controllers.len(), 4);
        assert_eq!(store.snapshot(false).controllers.len(), 0);
    }

    #[test]
    fn test_brief_keeps_health_and_first_failing_controller() {
        let brief = populated().snapshot(true);

        let cluster = brief.cluster.unwrap();
        assert_eq!(cluster.self_name, "");
        assert_eq!(cluster.cluster_health, Some(Status::ok("Health check ok")));
        assert_eq!(brief.controllers.len(), 1);
        assert_eq!(brief.controllers[0].name, "first-failing");
        assert!(brief.kvstore.is_none());
        assert!(brief.ipam.is_none());
    }

    #[test]
    fn test_brief_of_empty_store() {
        let brief = StatusStore::new().snapshot(true);
        assert_eq!(brief.cluster, Some(ClusterStatus::default()));
        assert!(brief.controllers.is_empty());
    }
}
