use axum::{
    Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Duration;
use tower_cookies::{Cookie, Cookies, cookie::SameSite};

use crate::{
    auth::{self, UserClaims, UserRole, hash_password, verify_password},
    model::{
        CrudRepository, ResourceTyped,
        entity::{UserEntity, UserEntityCreateUpdate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::auth::{LoginBody, RegisterBody, SessionResponse},
        error::ErrorResponse,
        extract::ValidJson,
        guard,
        middlewares::{self, AUTH_TOKEN},
        response::ApiResponse,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/api/auth/me", get(me_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/logout", post(logout_handler))
        .merge(protected)
        .with_state(state)
}

/// Signs a session token for `user` and sets it as the `SID` cookie.
fn start_session(state: &AppState, cookies: &Cookies, user: &UserEntity) -> WebResult<String> {
    let hours = state.config().app().session_hours();
    let claims = UserClaims::new(user.id(), user.role(), Duration::hours(hours));
    let token = auth::generate_token(claims, state.config().app().jwt())
        .map_err(|e| WebError::server_crypt_error(e.into()))?;

    let mut cookie = Cookie::new(AUTH_TOKEN, token.clone());
    cookie.set_same_site(SameSite::Lax);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookies.add(cookie);

    Ok(token)
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    description = "Authorizes user in the system",
    request_body = LoginBody,
    responses(
        (status = 200, description = "User signed in", body = SessionResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Credentials invalid or account disabled", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
)]
async fn login_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    ValidJson(payload): ValidJson<LoginBody>,
) -> WebResult<impl IntoResponse> {
    let admin = AuthenticatedUser::admin();
    let Some(found) = UserEntity::find_by_email(state.pool(), &admin, &payload.email)
        .await
        .map_err(|e| WebError::db(UserEntity::get_resource_type(), e))?
    else {
        return Err(WebError::auth_invalid_credentials());
    };

    let is_verified =
        verify_password(found.hash(), &payload.password).map_err(WebError::server_crypt_error)?;

    if !is_verified || !found.is_active() {
        return Err(WebError::auth_invalid_credentials());
    }

    let token = start_session(&state, &cookies, &found)?;
    tracing::info!("user {} signed in as {}", found.id(), found.role());

    Ok(ApiResponse::ok(SessionResponse { user: found, token }))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterBody,
    description = "Creates a student account and signs it in",
    responses(
        (status = 201, description = "User created successfully", body = SessionResponse),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 409, description = "User already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
async fn register_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    ValidJson(payload): ValidJson<RegisterBody>,
) -> WebResult<impl IntoResponse> {
    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_email(state.pool(), &admin, &payload.email)
        .await
        .map_err(|e| WebError::db(UserEntity::get_resource_type(), e))?;

    if found.is_some() {
        return Err(WebError::registration_conflict());
    }

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let payload = UserEntityCreateUpdate {
        email: payload.email,
        name: payload.name,
        password_hash: hash,
        role: UserRole::Student,
        domain_id: None,
        is_active: true,
    };

    let created = UserEntity::create(state.pool(), &admin, payload)
        .await
        .map_err(|e| match e {
            e if e.is_unique_violation() => WebError::registration_conflict(),
            e => WebError::db(UserEntity::get_resource_type(), e),
        })?;

    let token = start_session(&state, &cookies, &created)?;
    tracing::info!("student {} registered", created.id());

    Ok(ApiResponse::created(SessionResponse {
        user: created,
        token,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    description = "Clears the session cookie",
    responses((status = 200, description = "Signed out")),
    tag = "auth"
)]
async fn logout_handler(cookies: Cookies) -> impl IntoResponse {
    let mut cookie = Cookie::from(AUTH_TOKEN);
    cookie.set_path("/");
    cookies.remove(cookie);
    ApiResponse::deleted()
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    description = "Returns the signed-in user",
    responses(
        (status = 200, description = "Current user", body = UserEntity),
        (status = 401, description = "Not signed in", body = ErrorResponse),
    ),
    tag = "auth",
    security(("cookie" = []), ("bearer" = []))
)]
async fn me_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let me = guard::fetch_user(state.pool(), user, user.user_id()).await?;
    Ok(ApiResponse::ok(me))
}
