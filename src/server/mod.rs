mod handlers;
mod state;

use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::air::RequestOrchestrator;
pub use state::AppState;

pub fn build_router(orchestrator: Arc<RequestOrchestrator>) -> Router {
    let state = Arc::new(AppState { orchestrator });

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/report", get(handlers::report))
        .route("/api/regions", get(handlers::regions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(addr: SocketAddr, orchestrator: Arc<RequestOrchestrator>) -> std::io::Result<()> {
    let app = build_router(orchestrator);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "smog_watch server listening");
    axum::serve(listener, app).await
}
