use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
        ])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to the web frontend origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/api/v1/exercises", exercise_routes().layer(cors.clone()))
        .nest("/api/v1/test-sessions", test_session_routes().layer(cors.clone()))
        .route(
            "/api/v1/progress",
            get(handlers::progress::get_progress).layer(cors.clone()),
        )
        .route(
            "/api/v1/attempts",
            get(handlers::progress::list_attempts).layer(cors),
        )
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

fn exercise_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/", get(handlers::exercises::list_exercises))
        .route("/{id}", get(handlers::exercises::get_exercise))
        .route("/{id}/check-answer", post(handlers::exercises::check_answer))
}

fn test_session_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/", post(handlers::test_sessions::create_test_session))
        .route("/{id}", get(handlers::test_sessions::get_test_session))
        .route(
            "/{id}/submit-response",
            post(handlers::test_sessions::submit_response),
        )
        .route("/{id}/submit", post(handlers::test_sessions::submit_session))
        .route(
            "/{id}/abandon",
            post(handlers::test_sessions::abandon_session),
        )
}
