use std::sync::Arc;

use carebot_core::CareServices;

/// Shared application state accessible from all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<CareServices>,
}

impl AppState {
    pub fn new(services: CareServices) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}
