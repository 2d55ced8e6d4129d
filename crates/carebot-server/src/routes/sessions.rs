use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use carebot_schema::Session;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ResetResult {
    pub session_id: String,
    pub reset: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(get_session))
        .route("/{id}/reset", post(reset_session))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    state
        .services
        .sessions()
        .get(&id)
        .await
        .map(Json)
        .ok_or(ApiError::SessionNotFound(id))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResetResult>, ApiError> {
    if !state.services.sessions().remove(&id).await {
        return Err(ApiError::SessionNotFound(id));
    }
    tracing::info!(session_id = %id, "session reset");
    Ok(Json(ResetResult {
        session_id: id,
        reset: true,
    }))
}
