use axum::{extract::State, routing::post, Json, Router};
use carebot_schema::GrievanceRecord;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GrievanceRequest {
    #[serde(default)]
    pub text: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/grievance", post(classify))
}

async fn classify(
    State(state): State<AppState>,
    Json(request): Json<GrievanceRequest>,
) -> Result<Json<GrievanceRecord>, ApiError> {
    let record = state.services.grievance(&request.text).await?;
    tracing::info!(
        category = record.category.as_str(),
        priority = record.priority.as_str(),
        manual_review = record.needs_manual_review,
        "grievance routed to {}",
        record.routed_department
    );
    Ok(Json(record))
}
