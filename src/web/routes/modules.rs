use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{Enrollment, Module, ModuleCreate},
        ordering,
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::content::{ModuleUpdateBody, ReorderBody, StructureCreateBody},
        error::ErrorResponse,
        extract::ValidJson,
        guard, middlewares,
        response::ApiResponse,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/api/courses/{id}/modules",
            get(module_list_handler).post(module_create_handler),
        )
        .route("/api/courses/{id}/modules/reorder", post(module_reorder_handler))
        .route(
            "/api/modules/{id}",
            patch(module_update_handler).delete(module_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}/modules",
    params(("id" = Uuid, Path, description = "Course id")),
    description = "Modules of a course in display order",
    responses(
        (status = 200, description = "Successfully collected modules", body = Vec<Module>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You may not study this course", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "modules",
    security(("cookie" = []), ("bearer" = []))
)]
async fn module_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_can_study(state.pool(), user, course_id).await?;

    let modules = Module::all_by_course(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::db(Module::get_resource_type(), e))?;

    Ok(ApiResponse::ok(modules))
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/modules",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = StructureCreateBody,
    responses(
        (status = 201, description = "Module created", body = Module),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "modules",
    security(("cookie" = []), ("bearer" = []))
)]
async fn module_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    ValidJson(payload): ValidJson<StructureCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::authored_course(state.pool(), user, course_id).await?;

    let created = Module::create(
        state.pool(),
        user,
        ModuleCreate {
            course_id,
            title: payload.title,
            description: payload.description,
            order_index: payload.order_index,
        },
    )
    .await
    .map_err(|e| WebError::db(Module::get_resource_type(), e))?;

    Ok(ApiResponse::created(created))
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/modules/reorder",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = ReorderBody,
    description = "Sets the order of all modules of the course",
    responses(
        (status = 200, description = "Modules in their new order", body = Vec<Module>),
        (status = 400, description = "Ids are not exactly the course's modules", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
    ),
    tag = "modules",
    security(("cookie" = []), ("bearer" = []))
)]
async fn module_reorder_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    ValidJson(payload): ValidJson<ReorderBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::authored_course(state.pool(), user, course_id).await?;

    ordering::apply_order::<Module>(state.pool(), course_id, &payload.ids)
        .await
        .map_err(|e| WebError::db(Module::get_resource_type(), e))?;

    let modules = Module::all_by_course(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::db(Module::get_resource_type(), e))?;

    Ok(ApiResponse::ok(modules))
}

#[utoipa::path(
    patch,
    path = "/api/modules/{id}",
    params(("id" = Uuid, Path, description = "Module id")),
    request_body = ModuleUpdateBody,
    responses(
        (status = 200, description = "Module updated", body = Module),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "modules",
    security(("cookie" = []), ("bearer" = []))
)]
async fn module_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<ModuleUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = guard::fetch_module(state.pool(), user, id).await?;
    guard::authored_course(state.pool(), user, module.course_id()).await?;

    let mut data = module.to_update();
    if let Some(title) = payload.title {
        data.title = title;
    }
    if let Some(description) = payload.description {
        data.description = description;
    }
    data.order_index = payload.order_index;

    let updated = module
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::db(Module::get_resource_type(), e))?;

    Ok(ApiResponse::ok(updated))
}

#[utoipa::path(
    delete,
    path = "/api/modules/{id}",
    params(("id" = Uuid, Path, description = "Module id")),
    description = "Deletes the module with its chapters; later modules move up",
    responses(
        (status = 200, description = "Module deleted"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "modules",
    security(("cookie" = []), ("bearer" = []))
)]
async fn module_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = guard::fetch_module(state.pool(), user, id).await?;
    let course_id = module.course_id();
    guard::authored_course(state.pool(), user, course_id).await?;

    module
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::db(Module::get_resource_type(), e))?;
    Enrollment::sync_course(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::db(Enrollment::get_resource_type(), e))?;

    Ok(ApiResponse::deleted())
}
