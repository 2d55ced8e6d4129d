pub mod call_nlp;
pub mod chat;
pub mod grievance;
pub mod health;
pub mod sessions;

use axum::Router;

use crate::state::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(chat::router())
        .merge(grievance::router())
        .merge(call_nlp::router())
        .merge(health::router())
        .nest("/sessions", sessions::router())
}
