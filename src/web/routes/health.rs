use axum::{Router, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::web::{AppState, response::ApiResponse};

#[derive(Serialize, utoipa::ToSchema)]
pub struct Health {
    status: &'static str,
    version: &'static str,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/api/health", get(health_handler))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = Health)),
    tag = "health"
)]
async fn health_handler() -> impl IntoResponse {
    ApiResponse::ok(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
