//! Reduces the aggregate to one overall verdict.
//!
//! Checks run in a fixed order and the first match wins:
//!
//! 1. stale probes
//! 2. kvstore not ready
//! 3. container runtime not ready or disabled
//! 4. orchestrator not ready, only when the caller requires connectivity
//! 5. CNI configuration could not be written
//!
//! Anything else is `Ok`.

use chrono::{DateTime, Utc};
use statusd_core::{
    Status, StatusResponse, StatusState, STALE_STATUS_MESSAGE, STATUS_MESSAGE_SPACER,
};
use std::collections::BTreeMap;

/// Inputs to the verdict that do not come from the aggregate itself
#[derive(Debug, Clone, Copy)]
pub struct RollupContext<'a> {
    /// Version banner every verdict message starts with
    pub banner: &'a str,
    /// Name the kvstore is reported under
    pub kvstore_kind: &'a str,
    /// Whether the daemon runs with an orchestrator client at all
    pub k8s_enabled: bool,
    pub require_k8s_connectivity: bool,
}

/// Overall verdict for `live`, given the probes currently stale
pub fn evaluate(
    ctx: &RollupContext<'_>,
    live: &StatusResponse,
    stale: &BTreeMap<String, DateTime<Utc>>,
) -> Status {
    let not_ready = |state: StatusState, reason: String| Status {
        state,
        msg: format!("{}{}{}", ctx.banner, STATUS_MESSAGE_SPACER, reason),
    };

    if !stale.is_empty() {
        return not_ready(StatusState::Warning, STALE_STATUS_MESSAGE.to_string());
    }

    if let Some(kvstore) = live.kvstore.as_ref().filter(|s| !s.state.is_ok_or_disabled()) {
        return not_ready(
            kvstore.state,
            format!("{} service is not ready: {}", ctx.kvstore_kind, kvstore.msg),
        );
    }

    if let Some(runtime) = live
        .container_runtime
        .as_ref()
        .filter(|s| s.state != StatusState::Ok)
    {
        let reason = if runtime.state == StatusState::Disabled {
            "Container runtime is disabled".to_string()
        } else {
            format!("Container runtime is not ready: {}", runtime.msg)
        };
        return not_ready(runtime.state, reason);
    }

    if ctx.k8s_enabled && ctx.require_k8s_connectivity {
        if let Some(k8s) = live
            .kubernetes
            .as_ref()
            .filter(|s| s.state != StatusState::Ok)
        {
            return not_ready(
                k8s.state,
                format!("Kubernetes service is not ready: {}", k8s.msg),
            );
        }
    }

    if let Some(cni) = live
        .cni_file
        .as_ref()
        .filter(|s| s.state == StatusState::Failure)
    {
        return not_ready(
            StatusState::Failure,
            format!("Could not write CNI config file: {}", cni.msg),
        );
    }

    Status::ok(ctx.banner)
}
