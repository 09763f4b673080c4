use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    auth,
    model::{CrudRepository, ResourceTyped, entity::UserEntity},
    web::{AppState, RequestContext, context::AuthenticatedUser, error::WebError},
};

pub static AUTH_TOKEN: &str = "SID";

/// Session token from an `Authorization: Bearer` header, or from the `SID`
/// cookie when no header is sent.
fn session_token(cookies: &Cookies, req: &Request) -> Option<(String, &'static str)> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| (t.trim().to_string(), "Authorization"));
    if bearer.is_some() {
        return bearer;
    }

    cookies
        .get(AUTH_TOKEN)
        .map(|cookie| (cookie.value().to_string(), AUTH_TOKEN))
}

pub async fn extract_context_fn(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let Some((token, source)) = session_token(&cookies, &req) else {
        req.extensions_mut().insert(RequestContext::new(None));
        return Ok(next.run(req).await);
    };

    let claims = auth::process_token(&token, state.config().app().jwt())
        .map_err(|e| WebError::auth_token_invalid(source, e))?;

    let Ok(id) = claims.claims.sub.parse::<uuid::Uuid>() else {
        tracing::warn!("session token with malformed subject");
        req.extensions_mut().insert(RequestContext::new(None));
        return Ok(next.run(req).await);
    };

    let user = UserEntity::find_by_id(state.pool(), &AuthenticatedUser::admin(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    // The role comes from the row, not the token, so role changes apply at once.
    let ctx = match user {
        Some(user) if user.is_active() => {
            RequestContext::new(Some(AuthenticatedUser::new(id, user.role())))
        }
        _ => RequestContext::new(None),
    };

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
