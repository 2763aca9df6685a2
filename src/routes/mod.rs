/// Application routes configuration
use crate::handlers::{
    get_event, get_event_images, get_feed, get_map_markers, health, list_events, AppState,
};
use axum::{routing::get, Router};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Event cache endpoints
        .route("/api/events", get(list_events))
        .route("/api/events/:id", get(get_event))
        .route("/api/events/:id/images", get(get_event_images))
        // Query and projection endpoints
        .route("/api/feed", get(get_feed))
        .route("/api/map/markers", get(get_map_markers))
        .with_state(state)
}
