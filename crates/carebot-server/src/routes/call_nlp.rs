use axum::{extract::State, routing::post, Json, Router};
use carebot_schema::CallAnalysis;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CallTranscriptRequest {
    #[serde(default)]
    pub transcript_text: String,
    #[serde(default)]
    pub call_id: Option<String>,
}

#[derive(Serialize)]
pub struct CallAnalysisResponse {
    pub call_id: String,
    #[serde(flatten)]
    pub analysis: CallAnalysis,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/call_nlp", post(analyze))
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<CallTranscriptRequest>,
) -> Result<Json<CallAnalysisResponse>, ApiError> {
    let call_id = request
        .call_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let analysis = state.services.analyze_call(&request.transcript_text).await?;
    tracing::info!(
        call_id = %call_id,
        tags = analysis.tags.len(),
        degraded = analysis.degraded,
        "call transcript analyzed"
    );
    Ok(Json(CallAnalysisResponse { call_id, analysis }))
}
