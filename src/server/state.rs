use crate::air::RequestOrchestrator;
use std::sync::Arc;

pub struct AppState {
    pub orchestrator: Arc<RequestOrchestrator>,
}
