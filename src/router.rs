use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{api, cors, files, sse};

/// Build the relay router:
/// - `GET /events` observer stream
/// - `POST /broadcast` publish
/// - everything else served from the public directory
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/events", get(sse::events_handler))
        .route("/broadcast", post(api::publish_handler))
        .fallback(files::serve_static)
        .layer(middleware::from_fn(cors::cors_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
