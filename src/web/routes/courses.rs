use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    auth::{Permission, UserRole},
    model::{
        CrudRepository, ModelManager, ResourceTyped,
        entity::{Course, CourseCreateUpdate, CourseFilter, CourseStatus, ModuleOutlineRow},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::courses::{CourseCreateBody, CourseDetail, CourseUpdateBody, ModuleOutline},
        error::ErrorResponse,
        extract::{ApiQuery, ValidJson},
        guard, middlewares,
        response::ApiResponse,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/api/courses", get(course_list_handler).post(course_create_handler))
        .route(
            "/api/courses/{id}",
            get(course_get_handler)
                .patch(course_update_handler)
                .delete(course_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Courses can only be assigned to trainer accounts.
async fn ensure_trainer(mm: &ModelManager, actor: &AuthenticatedUser, id: Uuid) -> WebResult<()> {
    let trainer = guard::fetch_user(mm, actor, id).await?;
    if trainer.role() != UserRole::Trainer {
        return Err(WebError::resource_bad_request(
            Course::get_resource_type(),
            "trainer_id must reference a trainer",
        ));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/courses",
    params(CourseFilter),
    description = "Courses visible to the caller",
    responses(
        (status = 200, description = "Courses", body = Vec<Course>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []), ("bearer" = []))
)]
async fn course_list_handler(
    ctx: RequestContext,
    ApiQuery(filter): ApiQuery<CourseFilter>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let courses = Course::list_visible(state.pool(), user, &filter)
        .await
        .map_err(|e| WebError::db(Course::get_resource_type(), e))?;

    Ok(ApiResponse::ok(courses))
}

#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CourseCreateBody,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 403, description = "You're not allowed to author courses", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []), ("bearer" = []))
)]
async fn course_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CourseCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_permission(user, Permission::AuthorCourses, Course::get_resource_type())?;

    let trainer_id = if user.user_role().has_permission(Permission::ManageAllCourses) {
        if let Some(id) = payload.trainer_id {
            ensure_trainer(state.pool(), user, id).await?;
        }
        payload.trainer_id
    } else {
        if payload.trainer_id.is_some_and(|id| id != user.user_id()) {
            return Err(WebError::resource_forbidden(Course::get_resource_type()));
        }
        Some(user.user_id())
    };

    let created = Course::create(
        state.pool(),
        user,
        CourseCreateUpdate {
            title: payload.title,
            description: payload.description,
            domain_id: payload.domain_id,
            trainer_id,
            status: payload.status.unwrap_or(CourseStatus::Draft),
        },
    )
    .await
    .map_err(|e| WebError::db(Course::get_resource_type(), e))?;

    tracing::info!("course {} created by {}", created.id(), user.user_id());
    Ok(ApiResponse::created(created))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    description = "Course with its module and chapter outline",
    responses(
        (status = 200, description = "Course found", body = CourseDetail),
        (status = 403, description = "Course not visible to you", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []), ("bearer" = []))
)]
async fn course_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = guard::fetch_course(state.pool(), user, id).await?;
    if !guard::can_see_course(user, &course) {
        return Err(WebError::resource_forbidden(Course::get_resource_type()));
    }

    let modules = if guard::can_study_course(state.pool(), user, &course).await? {
        let rows = ModuleOutlineRow::fetch_for_course(state.pool(), user.user_id(), course.id())
            .await
            .map_err(|e| WebError::db(Course::get_resource_type(), e))?;
        ModuleOutline::from_rows(rows).map_err(|e| WebError::db(Course::get_resource_type(), e))?
    } else {
        Vec::new()
    };

    Ok(ApiResponse::ok(CourseDetail { course, modules }))
}

#[utoipa::path(
    patch,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = CourseUpdateBody,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []), ("bearer" = []))
)]
async fn course_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<CourseUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = guard::authored_course(state.pool(), user, id).await?;

    let mut data = course.to_update();
    if let Some(trainer_id) = payload.trainer_id.filter(|t| Some(*t) != course.trainer_id()) {
        guard::ensure_permission(user, Permission::ManageAllCourses, Course::get_resource_type())?;
        ensure_trainer(state.pool(), user, trainer_id).await?;
        data.trainer_id = Some(trainer_id);
    }
    if let Some(title) = payload.title {
        data.title = title;
    }
    if let Some(description) = payload.description {
        data.description = description;
    }
    if let Some(domain_id) = payload.domain_id {
        data.domain_id = Some(domain_id);
    }
    if let Some(status) = payload.status {
        data.status = status;
    }

    let updated = course
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::db(Course::get_resource_type(), e))?;

    Ok(ApiResponse::ok(updated))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    description = "Deletes the course with its modules, chapters, content and enrollments",
    responses(
        (status = 200, description = "Course deleted"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []), ("bearer" = []))
)]
async fn course_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = guard::authored_course(state.pool(), user, id).await?;

    course
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::db(Course::get_resource_type(), e))?;

    tracing::info!("course {} deleted by {}", id, user.user_id());
    Ok(ApiResponse::deleted())
}
