use tracing::Instrument;
use vhadmin_lgsm::ServerScript;
use vhadmin_process::{ActionOutcome, PhysicalId, ServerAction, ServerName, ServerState};

use crate::{outcomes::unix_ms_now, state::AppState};

/// Starts `<toolchain_dir>/<physical> <verb>` in the background and returns
/// the optimistic state right away.
///
/// The script's result never reaches the caller. It is logged and kept in the
/// outcome log; the next status read shows its effect, if any.
/// Concurrent dispatches against the same instance are not serialized.
pub fn dispatch(
    state: &AppState,
    server: &ServerName,
    physical: &PhysicalId,
    action: ServerAction,
    request_id: &str,
) -> ServerState {
    let script = ServerScript::new(&state.config.toolchain_dir, physical.as_str());
    let timeout = state.config.action_timeout;
    let outcomes = state.outcomes.clone();
    let server = server.clone();

    tracing::info!(%server, physical_id = %physical, %action, "dispatching server action");

    // Detached from the request span: the action outlives the request.
    let span = tracing::info_span!(parent: None, "server_action", %server, %action, request_id);
    tokio::spawn(
        async move {
            let started_at_unix_ms = unix_ms_now();
            let result = script.invoke(action.verb(), timeout).await;
            let finished_at_unix_ms = unix_ms_now();

            let (ok, message) = match result {
                Ok(_) => {
                    tracing::info!(
                        elapsed_ms = finished_at_unix_ms.saturating_sub(started_at_unix_ms),
                        "server action completed"
                    );
                    (true, None)
                }
                Err(err) => {
                    tracing::warn!(%err, "server action failed");
                    (false, Some(err.to_string()))
                }
            };

            outcomes.record(ActionOutcome {
                server,
                action,
                started_at_unix_ms,
                finished_at_unix_ms,
                ok,
                message,
            });
        }
        .instrument(span),
    );

    action.optimistic_state()
}
