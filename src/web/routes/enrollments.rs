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
        CrudRepository, ModelManager, ResourceType, ResourceTyped,
        entity::{Enrollment, EnrollmentCreate, EnrollmentFilter, EnrollmentStatus},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::enrollments::{EnrollmentCreateBody, EnrollmentUpdateBody},
        error::ErrorResponse,
        extract::{ApiQuery, ValidJson},
        guard, middlewares,
        response::ApiResponse,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/api/enrollments",
            get(enrollment_list_handler).post(enrollment_create_handler),
        )
        .route(
            "/api/enrollments/{id}",
            get(enrollment_get_handler)
                .patch(enrollment_update_handler)
                .delete(enrollment_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn is_own(actor: &AuthenticatedUser, enrollment: &Enrollment) -> bool {
    actor.is_student() && enrollment.student_id() == actor.user_id()
}

/// Staff acting on an enrollment of a course they own.
async fn ensure_manages(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    enrollment: &Enrollment,
) -> WebResult<()> {
    guard::ensure_permission(actor, Permission::ManageEnrollments, ResourceType::Enrollment)?;
    guard::ensure_owner(mm, actor, enrollment).await
}

async fn ensure_class_in_course(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    class_id: Uuid,
    course_id: Uuid,
) -> WebResult<()> {
    let class = guard::fetch_class(mm, actor, class_id).await?;
    if class.course_id() != course_id {
        return Err(WebError::resource_bad_request(
            ResourceType::Class,
            "class belongs to another course",
        ));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/enrollments",
    params(EnrollmentFilter),
    description = "Students see their own enrollments, trainers those of their courses",
    responses(
        (status = 200, description = "Successfully collected enrollments", body = Vec<Enrollment>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(("cookie" = []), ("bearer" = []))
)]
async fn enrollment_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<EnrollmentFilter>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rows = Enrollment::list_visible(state.pool(), user, &filter)
        .await
        .map_err(|e| WebError::db(Enrollment::get_resource_type(), e))?;

    Ok(ApiResponse::ok(rows))
}

#[utoipa::path(
    post,
    path = "/api/enrollments",
    request_body = EnrollmentCreateBody,
    description = "Students enroll themselves into published courses; staff enroll students into courses they manage",
    responses(
        (status = 201, description = "Enrollment created", body = Enrollment),
        (status = 400, description = "Target is not a student or class mismatch", body = ErrorResponse),
        (status = 403, description = "Not allowed to enroll here", body = ErrorResponse),
        (status = 404, description = "Course, student or class not found", body = ErrorResponse),
        (status = 409, description = "Student is already enrolled", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(("cookie" = []), ("bearer" = []))
)]
async fn enrollment_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<EnrollmentCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = guard::fetch_course(state.pool(), user, payload.course_id).await?;

    let student_id = if user.is_student() {
        if payload.student_id.is_some_and(|id| id != user.user_id()) || payload.class_id.is_some() {
            return Err(WebError::resource_forbidden(Enrollment::get_resource_type()));
        }
        if !course.is_published() {
            return Err(WebError::resource_bad_request(
                Enrollment::get_resource_type(),
                "course is not open for enrollment",
            ));
        }
        user.user_id()
    } else {
        guard::ensure_permission(user, Permission::ManageEnrollments, ResourceType::Enrollment)?;
        guard::ensure_owner(state.pool(), user, &course).await?;

        let Some(student_id) = payload.student_id else {
            return Err(WebError::resource_bad_request(
                Enrollment::get_resource_type(),
                "student_id is required",
            ));
        };
        let student = guard::fetch_user(state.pool(), user, student_id).await?;
        if student.role() != UserRole::Student {
            return Err(WebError::resource_bad_request(
                Enrollment::get_resource_type(),
                "only students can be enrolled",
            ));
        }
        if let Some(class_id) = payload.class_id {
            ensure_class_in_course(state.pool(), user, class_id, course.id()).await?;
        }
        student_id
    };

    let created = Enrollment::create(
        state.pool(),
        user,
        EnrollmentCreate {
            student_id,
            course_id: course.id(),
            class_id: payload.class_id,
            status: EnrollmentStatus::Active,
        },
    )
    .await
    .map_err(|e| WebError::db(Enrollment::get_resource_type(), e))?;

    tracing::info!("student {} enrolled into course {}", student_id, course.id());
    Ok(ApiResponse::created(created))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment id")),
    responses(
        (status = 200, description = "Enrollment found", body = Enrollment),
        (status = 403, description = "Not your enrollment", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(("cookie" = []), ("bearer" = []))
)]
async fn enrollment_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollment = guard::fetch_enrollment(state.pool(), user, id).await?;
    if !is_own(user, &enrollment) {
        ensure_manages(state.pool(), user, &enrollment).await?;
    }

    Ok(ApiResponse::ok(enrollment))
}

#[utoipa::path(
    patch,
    path = "/api/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment id")),
    request_body = EnrollmentUpdateBody,
    description = "Staff change status or class; students may only drop their own enrollment",
    responses(
        (status = 200, description = "Enrollment updated", body = Enrollment),
        (status = 400, description = "Class belongs to another course", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(("cookie" = []), ("bearer" = []))
)]
async fn enrollment_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<EnrollmentUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollment = guard::fetch_enrollment(state.pool(), user, id).await?;

    if is_own(user, &enrollment) {
        let drops = payload.status == Some(EnrollmentStatus::Dropped) && payload.class_id.is_none();
        if !drops {
            return Err(WebError::resource_forbidden(Enrollment::get_resource_type()));
        }
    } else {
        ensure_manages(state.pool(), user, &enrollment).await?;
    }

    let mut data = enrollment.to_update();
    if let Some(status) = payload.status {
        data.status = status;
    }
    if let Some(class_id) = payload.class_id {
        ensure_class_in_course(state.pool(), user, class_id, enrollment.course_id()).await?;
        data.class_id = Some(class_id);
    }

    let updated = enrollment
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::db(Enrollment::get_resource_type(), e))?;

    Ok(ApiResponse::ok(updated))
}

#[utoipa::path(
    delete,
    path = "/api/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment id")),
    responses(
        (status = 200, description = "Enrollment deleted"),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(("cookie" = []), ("bearer" = []))
)]
async fn enrollment_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollment = guard::fetch_enrollment(state.pool(), user, id).await?;
    if !is_own(user, &enrollment) {
        ensure_manages(state.pool(), user, &enrollment).await?;
    }

    enrollment
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::db(Enrollment::get_resource_type(), e))?;

    Ok(ApiResponse::deleted())
}
