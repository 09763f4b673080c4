use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, patch},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::Permission,
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped,
        entity::{Domain, DomainCreateUpdate},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        error::ErrorResponse,
        extract::{ApiQuery, ValidJson},
        guard, middlewares,
        response::ApiResponse,
        routes::PaginationQuery,
    },
};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct DomainBody {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct DomainUpdateBody {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/api/domains", get(domain_list_handler).post(domain_create_handler))
        .route(
            "/api/domains/{id}",
            patch(domain_update_handler).delete(domain_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/domains",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<Domain>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
    ),
    tag = "domains",
    security(("cookie" = []), ("bearer" = []))
)]
async fn domain_list_handler(
    ctx: RequestContext,
    ApiQuery(page): ApiQuery<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let (limit, offset) = page.bounds();
    let domains = Domain::page(state.pool(), user, limit, offset)
        .await
        .map_err(|e| WebError::db(Domain::get_resource_type(), e))?;

    Ok(ApiResponse::ok(domains))
}

#[utoipa::path(
    post,
    path = "/api/domains",
    request_body = DomainBody,
    responses(
        (status = 201, description = "Domain created", body = Domain),
        (status = 403, description = "You're not allowed to manage domains", body = ErrorResponse),
        (status = 409, description = "Domain name taken", body = ErrorResponse),
    ),
    tag = "domains",
    security(("cookie" = []), ("bearer" = []))
)]
async fn domain_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<DomainBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_permission(user, Permission::ManageDomains, Domain::get_resource_type())?;

    let created = Domain::create(
        state.pool(),
        user,
        DomainCreateUpdate {
            name: payload.name.trim().to_string(),
            description: payload.description,
        },
    )
    .await
    .map_err(|e| WebError::db(Domain::get_resource_type(), e))?;

    Ok(ApiResponse::created(created))
}

#[utoipa::path(
    patch,
    path = "/api/domains/{id}",
    params(("id" = Uuid, Path, description = "Domain id")),
    request_body = DomainUpdateBody,
    responses(
        (status = 200, description = "Domain updated", body = Domain),
        (status = 403, description = "You're not allowed to manage domains", body = ErrorResponse),
        (status = 404, description = "Domain not found", body = ErrorResponse),
        (status = 409, description = "Domain name taken", body = ErrorResponse),
    ),
    tag = "domains",
    security(("cookie" = []), ("bearer" = []))
)]
async fn domain_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<DomainUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_permission(user, Permission::ManageDomains, Domain::get_resource_type())?;
    let found = guard::fetch_domain(state.pool(), user, id).await?;

    let data = DomainCreateUpdate {
        name: payload
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| found.name().to_string()),
        description: payload
            .description
            .unwrap_or_else(|| found.description().to_string()),
    };

    let updated = found
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::db(Domain::get_resource_type(), e))?;

    Ok(ApiResponse::ok(updated))
}

#[utoipa::path(
    delete,
    path = "/api/domains/{id}",
    params(("id" = Uuid, Path, description = "Domain id")),
    responses(
        (status = 200, description = "Domain deleted; its users and courses are detached"),
        (status = 403, description = "You're not allowed to manage domains", body = ErrorResponse),
        (status = 404, description = "Domain not found", body = ErrorResponse),
    ),
    tag = "domains",
    security(("cookie" = []), ("bearer" = []))
)]
async fn domain_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_permission(user, Permission::ManageDomains, Domain::get_resource_type())?;
    let found = guard::fetch_domain(state.pool(), user, id).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::db(Domain::get_resource_type(), e))?;

    Ok(ApiResponse::deleted())
}
