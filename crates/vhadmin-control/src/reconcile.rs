use futures_util::future::join_all;
use vhadmin_lgsm::lock_file;
use vhadmin_process::{PhysicalId, ServerName, ServerState, ServerStatuses};

use crate::state::AppState;

/// Current state of one instance, from its lock file and a live probe.
///
/// Never fails: anything that keeps us from confirming the instance is
/// reported as `Unknown` for this instance alone.
pub async fn reconcile_one(
    state: &AppState,
    name: &ServerName,
    physical: &PhysicalId,
) -> ServerState {
    let lock = match lock_file::read(&state.config.lock_dir, physical.as_str()).await {
        Ok(None) => {
            tracing::debug!(server = %name, "no lock file");
            return ServerState::Stopped;
        }
        Ok(Some(rec)) => rec,
        Err(err) => {
            tracing::warn!(server = %name, %err, "lock file unusable");
            return ServerState::Unknown;
        }
    };

    let port = lock.query_port();
    match state.prober.probe(state.public_ip, port).await {
        Ok(()) => {
            tracing::debug!(server = %name, port, "probe confirmed");
            ServerState::Running
        }
        Err(err) => {
            tracing::warn!(server = %name, port, %err, "probe did not confirm");
            ServerState::Unknown
        }
    }
}

/// Reconciles every configured instance except `skip`, concurrently.
pub async fn reconcile(state: &AppState, skip: Option<&ServerName>) -> ServerStatuses {
    let checks = state
        .config
        .servers
        .iter()
        .filter(|(name, _)| Some(*name) != skip)
        .map(|(name, physical)| async move {
            (name.clone(), reconcile_one(state, name, physical).await)
        });
    join_all(checks).await.into_iter().collect()
}

pub async fn reconcile_all(state: &AppState) -> ServerStatuses {
    reconcile(state, None).await
}
