use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether snapshots can currently be saved.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let viewers = state.viewer_count();
    match state.storage_health().await {
        Ok(()) => HealthResponse::ok(viewers),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded(viewers)
        }
    }
}
