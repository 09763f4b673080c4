use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    auth::Permission,
    model::{
        ResourceType,
        analytics::{CourseAnalytics, PlatformOverview},
    },
    web::{
        AppState, RequestContext, WebError, WebResult, error::ErrorResponse, guard, middlewares,
        response::ApiResponse,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/api/courses/{id}/analytics", get(course_analytics_handler))
        .route("/api/analytics/overview", get(overview_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}/analytics",
    params(("id" = Uuid, Path, description = "Course id")),
    description = "Enrollment, completion, quiz and submission figures for one course",
    responses(
        (status = 200, description = "Course analytics", body = CourseAnalytics),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "analytics",
    security(("cookie" = []), ("bearer" = []))
)]
async fn course_analytics_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = guard::fetch_course(state.pool(), user, course_id).await?;
    guard::ensure_owner(state.pool(), user, &course).await?;

    let analytics = CourseAnalytics::fetch(state.pool(), course_id)
        .await
        .map_err(|e| WebError::db(ResourceType::Analytics, e))?;

    Ok(ApiResponse::ok(analytics))
}

#[utoipa::path(
    get,
    path = "/api/analytics/overview",
    description = "Platform-wide totals",
    responses(
        (status = 200, description = "Platform overview", body = PlatformOverview),
        (status = 403, description = "Analytics are for administrators", body = ErrorResponse),
    ),
    tag = "analytics",
    security(("cookie" = []), ("bearer" = []))
)]
async fn overview_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_permission(user, Permission::ViewAnalytics, ResourceType::Analytics)?;

    let overview = PlatformOverview::fetch(state.pool())
        .await
        .map_err(|e| WebError::db(ResourceType::Analytics, e))?;

    Ok(ApiResponse::ok(overview))
}
