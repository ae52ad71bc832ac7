//! Route definitions for the Mango Surveillance Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::identity_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Seasonal lookup and calculator preview (public)
        .route("/season", get(handlers::get_season))
        .route("/calculator/preview", post(handlers::preview_calculation))
        // Protected routes - farm surveillance
        .nest("/farms/:farm_id", farm_routes())
        // Protected routes - survey sessions
        .nest("/sessions", session_routes())
        // Protected routes - maintenance
        .nest("/admin/sessions", admin_routes())
}

/// Farm-scoped routes (protected)
fn farm_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/calculations",
            get(handlers::list_calculations).post(handlers::create_calculation),
        )
        .route("/calculations/current", get(handlers::get_current_calculation))
        .route("/surveillance", get(handlers::get_farm_surveillance))
        .route("/stats", get(handlers::get_farm_stats))
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::start_session),
        )
        .route_layer(middleware::from_fn(identity_middleware))
}

/// Survey session routes (protected)
fn session_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:session_id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route(
            "/:session_id/observations",
            get(handlers::list_observations).post(handlers::record_observation),
        )
        .route("/:session_id/finish", post(handlers::finish_session))
        .route("/:session_id/abandon", post(handlers::abandon_session))
        .route_layer(middleware::from_fn(identity_middleware))
}

/// Maintenance routes (protected)
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/sweep", post(handlers::sweep_stale_sessions))
        .route("/repair-durations", post(handlers::repair_session_durations))
        .route("/repair-targets", post(handlers::repair_session_targets))
        .route_layer(middleware::from_fn(identity_middleware))
}
