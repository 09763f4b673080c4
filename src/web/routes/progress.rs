use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    auth::Permission,
    model::{
        ResourceType,
        analytics::ProgressRow,
        entity::{ChapterProgress, Enrollment, ModuleOutlineRow},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::{
            courses::ModuleOutline,
            learning::{
                ChapterProgressResponse, CourseProgressDetail, CourseProgressQuery, ProgressBody,
                ProgressSummary,
            },
        },
        error::ErrorResponse,
        extract::{ApiQuery, ValidJson},
        guard, middlewares,
        response::ApiResponse,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/api/chapters/{id}/progress", post(chapter_progress_handler))
        .route("/api/progress", get(my_progress_handler))
        .route("/api/courses/{id}/progress", get(course_progress_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn progress_err(e: crate::model::DatabaseError) -> WebError {
    WebError::db(ResourceType::ChapterProgress, e)
}

#[utoipa::path(
    post,
    path = "/api/chapters/{id}/progress",
    params(("id" = Uuid, Path, description = "Chapter id")),
    request_body = ProgressBody,
    description = "Marks a chapter completed or not; the enrollment status follows",
    responses(
        (status = 200, description = "Progress stored", body = ChapterProgressResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Chapter not found", body = ErrorResponse),
    ),
    tag = "progress",
    security(("cookie" = []), ("bearer" = []))
)]
async fn chapter_progress_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(chapter_id): Path<Uuid>,
    ValidJson(payload): ValidJson<ProgressBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let chapter = guard::fetch_chapter(state.pool(), user, chapter_id).await?;
    let course_id = guard::course_of_chapter(state.pool(), &chapter).await?;
    guard::ensure_enrolled_student(state.pool(), user, course_id).await?;

    let progress = ChapterProgress::set(state.pool(), user.user_id(), chapter_id, payload.completed)
        .await
        .map_err(progress_err)?;
    let enrollment = Enrollment::sync_completion(state.pool(), user, user.user_id(), course_id)
        .await
        .map_err(|e| WebError::db(ResourceType::Enrollment, e))?;

    Ok(ApiResponse::ok(ChapterProgressResponse { progress, enrollment }))
}

#[utoipa::path(
    get,
    path = "/api/progress",
    description = "Progress of the current student in each of their enrollments",
    responses(
        (status = 200, description = "Progress per enrollment", body = Vec<ProgressSummary>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Only students have progress", body = ErrorResponse),
    ),
    tag = "progress",
    security(("cookie" = []), ("bearer" = []))
)]
async fn my_progress_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_permission(user, Permission::TakeCourses, ResourceType::ChapterProgress)?;

    let rows = ProgressRow::fetch(state.pool(), Some(user.user_id()), None)
        .await
        .map_err(progress_err)?;

    Ok(ApiResponse::ok(
        rows.into_iter().map(ProgressSummary::from).collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}/progress",
    params(("id" = Uuid, Path, description = "Course id"), CourseProgressQuery),
    description = "One student's progress through a course, chapter by chapter. Students always get their own",
    responses(
        (status = 200, description = "Progress detail", body = CourseProgressDetail),
        (status = 400, description = "Staff must name a student", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course or enrollment not found", body = ErrorResponse),
    ),
    tag = "progress",
    security(("cookie" = []), ("bearer" = []))
)]
async fn course_progress_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    ApiQuery(query): ApiQuery<CourseProgressQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = guard::fetch_course(state.pool(), user, course_id).await?;

    let student_id = if user.is_student() {
        if query.student_id.is_some_and(|id| id != user.user_id()) {
            return Err(WebError::resource_forbidden(ResourceType::ChapterProgress));
        }
        user.user_id()
    } else {
        guard::ensure_owner(state.pool(), user, &course).await?;
        query.student_id.ok_or(WebError::resource_bad_request(
            ResourceType::ChapterProgress,
            "student_id is required",
        ))?
    };

    let summary = ProgressRow::fetch(state.pool(), Some(student_id), Some(course_id))
        .await
        .map_err(progress_err)?
        .into_iter()
        .next()
        .map(ProgressSummary::from)
        .ok_or(WebError::resource_not_found(ResourceType::Enrollment))?;

    let rows = ModuleOutlineRow::fetch_for_course(state.pool(), student_id, course_id)
        .await
        .map_err(progress_err)?;
    let modules = ModuleOutline::from_rows(rows).map_err(progress_err)?;

    Ok(ApiResponse::ok(CourseProgressDetail { summary, modules }))
}
