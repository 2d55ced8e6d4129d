use axum::{extract::State, routing::post, Json, Router};
use carebot_core::{ChatTurnOutcome, ChatTurnRequest};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnOutcome>, ApiError> {
    let outcome = state.services.chat(request).await?;
    Ok(Json(outcome))
}
