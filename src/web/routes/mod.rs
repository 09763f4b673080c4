use crate::web::{AppState, doc::ApiDoc};
use axum::Router;
use serde::Deserialize;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod analytics;
pub mod auth;
pub mod chapters;
pub mod classes;
pub mod content;
pub mod courses;
pub mod domains;
pub mod enrollments;
pub mod health;
pub mod learning;
pub mod modules;
pub mod progress;
pub mod users;

pub const MAX_PAGE_SIZE: i64 = 200;

pub fn default_limit() -> i64 {
    50
}

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

impl PaginationQuery {
    /// Limit within `1..=MAX_PAGE_SIZE`, offset never negative.
    pub fn bounds(&self) -> (i64, i64) {
        clamp_page(self.limit, self.offset)
    }
}

pub fn clamp_page(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
}

pub fn build_app<S: Send + Sync + Clone + 'static>(state: AppState) -> Router<S> {
    let docs = state.config().app().docs();

    let mut router = Router::new()
        .merge(health::routes(state.clone()))
        .merge(auth::routes(state.clone()))
        .merge(users::routes(state.clone()))
        .merge(domains::routes(state.clone()))
        .merge(courses::routes(state.clone()))
        .merge(modules::routes(state.clone()))
        .merge(chapters::routes(state.clone()))
        .merge(content::routes(state.clone()))
        .merge(enrollments::routes(state.clone()))
        .merge(classes::routes(state.clone()))
        .merge(progress::routes(state.clone()))
        .merge(learning::routes(state.clone()))
        .merge(analytics::routes(state.clone()))
        .layer(CookieManagerLayer::default())
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if docs {
        let openapi = ApiDoc::openapi();

        router = router.merge(SwaggerUi::new("/api/docs").url("/api-doc/openapi.json", openapi));
    }

    router
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn page_bounds() {
        assert_eq!(clamp_page(0, -5), (1, 0));
        assert_eq!(clamp_page(10_000, 20), (MAX_PAGE_SIZE, 20));
        assert_eq!(clamp_page(25, 0), (25, 0));
    }
}
