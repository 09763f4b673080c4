use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    auth::{Permission, UserRole},
    model::{
        CrudRepository, ModelManager, ResourceType, ResourceTyped,
        entity::{Class, ClassCreateUpdate, Enrollment},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::classes::{
            ClassCreateBody, ClassDetail, ClassListQuery, ClassStudentBody, ClassUpdateBody,
            dates_in_order,
        },
        error::ErrorResponse,
        extract::{ApiQuery, ValidJson},
        guard, middlewares,
        response::ApiResponse,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/api/classes", get(class_list_handler).post(class_create_handler))
        .route(
            "/api/classes/{id}",
            get(class_get_handler)
                .patch(class_update_handler)
                .delete(class_delete_handler),
        )
        .route("/api/classes/{id}/students", post(class_add_student_handler))
        .route(
            "/api/classes/{id}/students/{student_id}",
            delete(class_remove_student_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn ensure_manages(mm: &ModelManager, actor: &AuthenticatedUser, class: &Class) -> WebResult<()> {
    guard::ensure_permission(actor, Permission::ManageClasses, ResourceType::Class)?;
    guard::ensure_owner(mm, actor, class).await
}

async fn ensure_role(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    user_id: Uuid,
    role: UserRole,
) -> WebResult<()> {
    let user = guard::fetch_user(mm, actor, user_id).await?;
    if user.role() != role {
        return Err(WebError::resource_bad_request(
            Class::get_resource_type(),
            format!("user {user_id} is not a {role}"),
        ));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/classes",
    params(ClassListQuery),
    responses(
        (status = 200, description = "Successfully collected classes", body = Vec<Class>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
    ),
    tag = "classes",
    security(("cookie" = []), ("bearer" = []))
)]
async fn class_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ClassListQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let classes = Class::list_visible(state.pool(), user, query.course_id)
        .await
        .map_err(|e| WebError::db(Class::get_resource_type(), e))?;

    Ok(ApiResponse::ok(classes))
}

#[utoipa::path(
    post,
    path = "/api/classes",
    request_body = ClassCreateBody,
    responses(
        (status = 201, description = "Class created", body = Class),
        (status = 400, description = "Invalid dates or trainer", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "classes",
    security(("cookie" = []), ("bearer" = []))
)]
async fn class_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ClassCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_permission(user, Permission::ManageClasses, ResourceType::Class)?;
    let course = guard::fetch_course(state.pool(), user, payload.course_id).await?;
    guard::ensure_owner(state.pool(), user, &course).await?;

    let trainer_id = match payload.trainer_id {
        Some(id) => {
            ensure_role(state.pool(), user, id, UserRole::Trainer).await?;
            Some(id)
        }
        None => course.trainer_id(),
    };

    let created = Class::create(
        state.pool(),
        user,
        ClassCreateUpdate {
            name: payload.name,
            course_id: course.id(),
            trainer_id,
            starts_on: payload.starts_on,
            ends_on: payload.ends_on,
        },
    )
    .await
    .map_err(|e| WebError::db(Class::get_resource_type(), e))?;

    Ok(ApiResponse::created(created))
}

#[utoipa::path(
    get,
    path = "/api/classes/{id}",
    params(("id" = Uuid, Path, description = "Class id")),
    description = "Class with its students",
    responses(
        (status = 200, description = "Class found", body = ClassDetail),
        (status = 403, description = "Not your class", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse),
    ),
    tag = "classes",
    security(("cookie" = []), ("bearer" = []))
)]
async fn class_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let class = guard::fetch_class(state.pool(), user, id).await?;

    let member = if user.is_student() {
        Enrollment::find_by_student_course(state.pool(), user.user_id(), class.course_id())
            .await
            .map_err(|e| WebError::db(Enrollment::get_resource_type(), e))?
            .is_some_and(|e| e.class_id() == Some(id))
    } else {
        class.trainer_id() == Some(user.user_id())
    };
    if !member {
        ensure_manages(state.pool(), user, &class).await?;
    }

    let students = class
        .students(state.pool())
        .await
        .map_err(|e| WebError::db(Class::get_resource_type(), e))?;

    Ok(ApiResponse::ok(ClassDetail { class, students }))
}

#[utoipa::path(
    patch,
    path = "/api/classes/{id}",
    params(("id" = Uuid, Path, description = "Class id")),
    request_body = ClassUpdateBody,
    responses(
        (status = 200, description = "Class updated", body = Class),
        (status = 400, description = "Invalid dates or trainer", body = ErrorResponse),
        (status = 403, description = "Not your class", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse),
    ),
    tag = "classes",
    security(("cookie" = []), ("bearer" = []))
)]
async fn class_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<ClassUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let class = guard::fetch_class(state.pool(), user, id).await?;
    ensure_manages(state.pool(), user, &class).await?;

    let mut data = class.to_update();
    if let Some(name) = payload.name {
        data.name = name;
    }
    if let Some(trainer_id) = payload.trainer_id {
        ensure_role(state.pool(), user, trainer_id, UserRole::Trainer).await?;
        data.trainer_id = Some(trainer_id);
    }
    if payload.starts_on.is_some() {
        data.starts_on = payload.starts_on;
    }
    if payload.ends_on.is_some() {
        data.ends_on = payload.ends_on;
    }
    if !dates_in_order(data.starts_on, data.ends_on) {
        return Err(WebError::resource_bad_request(
            Class::get_resource_type(),
            "ends_on must not be before starts_on",
        ));
    }

    let updated = class
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::db(Class::get_resource_type(), e))?;

    Ok(ApiResponse::ok(updated))
}

#[utoipa::path(
    delete,
    path = "/api/classes/{id}",
    params(("id" = Uuid, Path, description = "Class id")),
    description = "Deletes the class; its enrollments stay without a class",
    responses(
        (status = 200, description = "Class deleted"),
        (status = 403, description = "Not your class", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse),
    ),
    tag = "classes",
    security(("cookie" = []), ("bearer" = []))
)]
async fn class_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let class = guard::fetch_class(state.pool(), user, id).await?;
    ensure_manages(state.pool(), user, &class).await?;

    class
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::db(Class::get_resource_type(), e))?;

    Ok(ApiResponse::deleted())
}

#[utoipa::path(
    post,
    path = "/api/classes/{id}/students",
    params(("id" = Uuid, Path, description = "Class id")),
    request_body = ClassStudentBody,
    description = "Puts a student into the class, enrolling them into its course when needed",
    responses(
        (status = 200, description = "Student's enrollment", body = Enrollment),
        (status = 400, description = "User is not a student", body = ErrorResponse),
        (status = 403, description = "Not your class", body = ErrorResponse),
        (status = 404, description = "Class or student not found", body = ErrorResponse),
    ),
    tag = "classes",
    security(("cookie" = []), ("bearer" = []))
)]
async fn class_add_student_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<ClassStudentBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let class = guard::fetch_class(state.pool(), user, id).await?;
    ensure_manages(state.pool(), user, &class).await?;
    ensure_role(state.pool(), user, payload.student_id, UserRole::Student).await?;

    let enrollment = Enrollment::assign_class(state.pool(), payload.student_id, class.course_id(), id)
        .await
        .map_err(|e| WebError::db(Enrollment::get_resource_type(), e))?;

    Ok(ApiResponse::ok(enrollment))
}

#[utoipa::path(
    delete,
    path = "/api/classes/{id}/students/{student_id}",
    params(
        ("id" = Uuid, Path, description = "Class id"),
        ("student_id" = Uuid, Path, description = "Student id"),
    ),
    description = "Takes the student out of the class; the course enrollment stays",
    responses(
        (status = 200, description = "Student removed"),
        (status = 403, description = "Not your class", body = ErrorResponse),
        (status = 404, description = "Class not found or student not in it", body = ErrorResponse),
    ),
    tag = "classes",
    security(("cookie" = []), ("bearer" = []))
)]
async fn class_remove_student_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((id, student_id)): Path<(Uuid, Uuid)>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let class = guard::fetch_class(state.pool(), user, id).await?;
    ensure_manages(state.pool(), user, &class).await?;

    let detached = Enrollment::detach_class(state.pool(), id, student_id)
        .await
        .map_err(|e| WebError::db(Enrollment::get_resource_type(), e))?;
    if !detached {
        return Err(WebError::resource_not_found(Enrollment::get_resource_type()));
    }

    Ok(ApiResponse::deleted())
}
