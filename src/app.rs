use axum::{extract::State, middleware, routing::get, Json, Router};
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    app_state::AppState,
    middleware::{language_middleware, observability_middleware},
    modules::api_routes,
    websocket::websocket_routes,
};

pub fn create_router(state: AppState) -> Router {
    let static_dir = state.env.app.static_dir.clone();

    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .merge(websocket_routes())
        .fallback_service(tower_http::services::ServeDir::new(static_dir))
        .layer(middleware::from_fn(language_middleware))
        .layer(middleware::from_fn(observability_middleware))
        .with_state(state)
}

async fn hello(State(state): State<AppState>) -> String {
    format!("{} says hello!\n", state.env.app.name)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_status = match state.repo.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!("Repository health check failed: {}", e);
            "unhealthy"
        }
    };

    let storage = if state.env.database.url.is_some() { "postgres" } else { "memory" };
    let telemetry_health = crate::telemetry::telemetry_health_check();
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(json!({
        "status": "ok",
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "storage": storage,
            "telemetry": telemetry_health
        }
    }))
}
