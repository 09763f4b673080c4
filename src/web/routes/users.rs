use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    auth::{Permission, UserRole, hash_password},
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped,
        entity::{UserEntity, UserEntityCreateUpdate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::users::{UserCreateBody, UserListQuery, UserUpdateBody},
        error::ErrorResponse,
        extract::{ApiQuery, ValidJson},
        guard, middlewares,
        response::ApiResponse,
        routes::clamp_page,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/api/users", get(user_list_handler).post(user_create_handler))
        .route(
            "/api/users/{id}",
            get(user_get_handler)
                .patch(user_update_handler)
                .delete(user_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Staff accounts (admin, sub-admin) are only managed by holders of
/// `ManageStaff`.
fn ensure_can_manage_role(actor: &AuthenticatedUser, role: UserRole) -> WebResult<()> {
    if role.is_staff() {
        guard::ensure_permission(actor, Permission::ManageStaff, UserEntity::get_resource_type())?;
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<UserEntity>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not allowed to manage users", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users",
    security(("cookie" = []), ("bearer" = []))
)]
async fn user_list_handler(
    ctx: RequestContext,
    ApiQuery(query): ApiQuery<UserListQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_permission(user, Permission::ManageUsers, UserEntity::get_resource_type())?;

    let (limit, offset) = clamp_page(query.limit, query.offset);
    let page = match query.role.as_deref() {
        Some(raw) => {
            let role = UserRole::parse(raw).ok_or(WebError::resource_bad_request(
                UserEntity::get_resource_type(),
                format!("unknown role `{raw}`"),
            ))?;
            UserEntity::page_by_role(state.pool(), user, role, limit, offset).await
        }
        None => UserEntity::page(state.pool(), user, limit, offset).await,
    }
    .map_err(|e| WebError::db(UserEntity::get_resource_type(), e))?;

    Ok(ApiResponse::ok(page))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserCreateBody,
    description = "Creates an account with any role",
    responses(
        (status = 201, description = "User created successfully", body = UserEntity),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 403, description = "Role may not be assigned by you", body = ErrorResponse),
        (status = 409, description = "Email already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users",
    security(("cookie" = []), ("bearer" = []))
)]
async fn user_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<UserCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_permission(user, Permission::ManageUsers, UserEntity::get_resource_type())?;
    ensure_can_manage_role(user, payload.role)?;

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let created = UserEntity::create(
        state.pool(),
        user,
        UserEntityCreateUpdate {
            email: payload.email,
            name: payload.name,
            password_hash: hash,
            role: payload.role,
            domain_id: payload.domain_id,
            is_active: true,
        },
    )
    .await
    .map_err(|e| WebError::db(UserEntity::get_resource_type(), e))?;

    tracing::info!("{} created {} account {}", user.user_id(), created.role(), created.id());
    Ok(ApiResponse::created(created))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserEntity),
        (status = 403, description = "Only yourself or user managers", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "users",
    security(("cookie" = []), ("bearer" = []))
)]
async fn user_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = guard::fetch_user(state.pool(), user, id).await?;
    guard::ensure_owner(state.pool(), user, &found).await?;

    Ok(ApiResponse::ok(found))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateBody,
    responses(
        (status = 200, description = "User updated successfully", body = UserEntity),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "You doesn't have enough permissions to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users",
    security(("cookie" = []), ("bearer" = []))
)]
async fn user_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UserUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = guard::fetch_user(state.pool(), user, id).await?;
    guard::ensure_owner(state.pool(), user, &found).await?;

    if payload.touches_admin_fields() {
        guard::ensure_permission(user, Permission::ManageUsers, UserEntity::get_resource_type())?;
    }
    // editing your own profile is fine, changing a staff role is not
    if found.id() != user.user_id() || payload.role.is_some() {
        ensure_can_manage_role(user, found.role())?;
    }
    if let Some(role) = payload.role {
        ensure_can_manage_role(user, role)?;
    }

    let mut data = found.to_update();
    if let Some(name) = payload.name {
        data.name = name;
    }
    if let Some(email) = payload.email {
        data.email = email;
    }
    if let Some(password) = payload.password {
        data.password_hash = hash_password(&password).map_err(WebError::server_crypt_error)?;
    }
    if let Some(role) = payload.role {
        data.role = role;
    }
    if let Some(domain_id) = payload.domain_id {
        data.domain_id = Some(domain_id);
    }
    if let Some(is_active) = payload.is_active {
        data.is_active = is_active;
    }

    let updated = found
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::db(UserEntity::get_resource_type(), e))?;

    Ok(ApiResponse::ok(updated))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    description = "Deletes specified user",
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 400, description = "You cannot delete yourself", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users",
    security(("cookie" = []), ("bearer" = []))
)]
async fn user_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_permission(user, Permission::ManageUsers, UserEntity::get_resource_type())?;

    if id == user.user_id() {
        return Err(WebError::resource_bad_request(
            UserEntity::get_resource_type(),
            "you cannot delete your own account",
        ));
    }

    let found = guard::fetch_user(state.pool(), user, id).await?;
    ensure_can_manage_role(user, found.role())?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::db(UserEntity::get_resource_type(), e))?;

    tracing::info!("{} deleted account {}", user.user_id(), id);
    Ok(ApiResponse::deleted())
}
