//! Service-level endpoints.

use axum::extract::State;
use axum::Json;
use protocol::MessageResponse;
use tracing::info;

use super::AppState;
use crate::error::{ApiError, ApiResult};

/// `GET /health`: liveness probe. Touches nothing remote.
pub async fn health() -> Json<MessageResponse> {
    Json(MessageResponse::new("ok"))
}

/// `GET /removeSafeMode`: take the name node out of safe mode.
pub async fn remove_safe_mode(State(state): State<AppState>) -> ApiResult<Json<MessageResponse>> {
    state
        .fs
        .leave_safe_mode()
        .await
        .map_err(|e| ApiError::command("Failed to leave safe mode", e))?;

    info!("Safe mode left");
    Ok(Json(MessageResponse::new("Safe mode removed successfully")))
}
