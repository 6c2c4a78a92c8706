use crate::{handlers, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sign-message", post(handlers::sign_message))
        .route("/generate-meme", post(handlers::generate_meme))
        .route("/memes/{owner}", get(handlers::owned_memes))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        // Requests are small JSON bodies; anything bigger is junk.
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}
