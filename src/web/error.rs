use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    auth::CryptError,
    error::log_error,
    model::{DatabaseError, ResourceType},
};

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("RegistrationUserConflict")]
    RegistrationUserConflict,
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("AuthenticationTokenInvalid, source: {source_name}. Error: {error}")]
    AuthenticationTokenInvalid {
        source_name: String,
        error: jsonwebtoken::errors::Error,
    },

    #[error("AuthenticationRequired")]
    AuthenticationRequired,

    #[error("AuthenticationInvalidCredentials")]
    AuthenticationInvalidCredentials,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("ResourceNotFound: {resource_type:?}")]
    ResourceNotFound { resource_type: ResourceType },

    #[error("ResourceForbidden: {resource_type:?}")]
    ResourceForbidden { resource_type: ResourceType },

    #[error("ResourceFetchError: {resource_type:?}. Error: {error}")]
    ResourceFetchError {
        resource_type: ResourceType,
        error: DatabaseError,
    },

    #[error("ResourceBadRequest: {resource_type:?}, {reason}")]
    ResourceBadRequest {
        resource_type: ResourceType,
        reason: String,
    },

    #[error("ResourceConflict: {resource_type:?}, {reason}")]
    ResourceConflict {
        resource_type: ResourceType,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("ValidationFailed: {0}")]
    ValidationFailed(#[from] ValidationErrors),

    #[error("ValidationMalformedBody: {0}")]
    ValidationMalformedBody(String),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ServerCryptError: {0}")]
    ServerCryptError(#[from] crate::auth::CryptError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn client_display(&self) -> String {
        String::from("Internal server error.")
    }
}

impl RegistrationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RegistrationUserConflict => StatusCode::CONFLICT,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::RegistrationUserConflict => {
                String::from("Registration error, user already exists.")
            }
        }
    }
}

impl AuthenticationError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::AuthenticationTokenInvalid { .. } => {
                String::from("Authentication error, session token invalid or expired.")
            }
            Self::AuthenticationRequired => String::from("Authentication required."),
            Self::AuthenticationInvalidCredentials => {
                String::from("Authentication error, user not found or password is invalid.")
            }
        }
    }
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ResourceForbidden { .. } => StatusCode::FORBIDDEN,
            Self::ResourceFetchError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ResourceBadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::ResourceConflict { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceNotFound { .. } => String::from("Resource error, resource not found."),
            Self::ResourceForbidden { .. } => String::from("Resource error, resource forbidden."),
            Self::ResourceFetchError { .. } => {
                String::from("Resource error, unable to fetch resource.")
            }
            Self::ResourceBadRequest { reason, .. } => format!("Resource error, {reason}."),
            Self::ResourceConflict { reason, .. } => format!("Resource conflict, {reason}."),
        }
    }
}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ValidationFailed(_) => String::from("Validation error, check the submitted fields."),
            Self::ValidationMalformedBody(_) => String::from("Validation error, malformed request body."),
        }
    }

    /// Field messages are safe to show the client in every build.
    pub fn details(&self) -> String {
        match self {
            Self::ValidationFailed(errors) => errors.to_string(),
            Self::ValidationMalformedBody(reason) => reason.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("ResourceError - {0}")]
    ResourceError(#[from] ResourceError),
    #[error("AuthenticationError - {0}")]
    AuthenticationError(#[from] AuthenticationError),
    #[error("RegistrationError - {0}")]
    RegistrationError(#[from] RegistrationError),
    #[error("ValidationError - {0}")]
    ValidationError(#[from] ValidationError),
    #[error("ServerError - {0}")]
    ServerError(#[from] ServerError),
}

impl From<ValidationErrors> for WebError {
    fn from(value: ValidationErrors) -> Self {
        Self::ValidationError(ValidationError::ValidationFailed(value))
    }
}

impl WebError {
    pub fn resource_not_found(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceNotFound {
            resource_type: r#type,
        })
    }

    pub fn resource_forbidden(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceForbidden {
            resource_type: r#type,
        })
    }

    pub fn resource_fetch_error(r#type: ResourceType, error: DatabaseError) -> Self {
        Self::ResourceError(ResourceError::ResourceFetchError {
            resource_type: r#type,
            error,
        })
    }

    pub fn resource_bad_request<S: Into<String>>(r#type: ResourceType, reason: S) -> Self {
        Self::ResourceError(ResourceError::ResourceBadRequest {
            resource_type: r#type,
            reason: reason.into(),
        })
    }

    pub fn resource_conflict<S: Into<String>>(r#type: ResourceType, reason: S) -> Self {
        Self::ResourceError(ResourceError::ResourceConflict {
            resource_type: r#type,
            reason: reason.into(),
        })
    }

    /// Maps a repository error onto the matching HTTP error for `r#type`.
    pub fn db(r#type: ResourceType, error: DatabaseError) -> Self {
        match error {
            DatabaseError::Forbidden => Self::resource_forbidden(r#type),
            DatabaseError::Invalid(reason) => Self::resource_bad_request(r#type, reason),
            e if e.is_unique_violation() => Self::resource_conflict(r#type, "already exists"),
            e if e.is_foreign_key_violation() => {
                Self::resource_bad_request(r#type, "referenced resource does not exist")
            }
            e => Self::resource_fetch_error(r#type, e),
        }
    }

    pub fn malformed_body<S: Into<String>>(reason: S) -> Self {
        Self::ValidationError(ValidationError::ValidationMalformedBody(reason.into()))
    }

    pub fn auth_token_invalid<S: Into<String>>(
        source_name: S,
        error: jsonwebtoken::errors::Error,
    ) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationTokenInvalid {
            source_name: source_name.into(),
            error,
        })
    }

    pub fn auth_required() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRequired)
    }

    pub fn auth_invalid_credentials() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationInvalidCredentials)
    }

    pub fn registration_conflict() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationUserConflict)
    }

    pub fn server_crypt_error(e: CryptError) -> Self {
        Self::ServerError(ServerError::ServerCryptError(e))
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::ResourceError(e) => e.status_code(),
            Self::RegistrationError(e) => e.status_code(),
            Self::AuthenticationError(e) => e.status_code(),
            Self::ValidationError(e) => e.status_code(),
            Self::ServerError(e) => e.status_code(),
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceError(e) => e.client_display(),
            Self::RegistrationError(e) => e.client_display(),
            Self::AuthenticationError(e) => e.client_display(),
            Self::ValidationError(e) => e.client_display(),
            Self::ServerError(e) => e.client_display(),
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::ValidationError(e) => Some(e.details()),
            _ if cfg!(debug_assertions) => Some(self.to_string()),
            _ => None,
        }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Human-readable message for the client
    pub error: String,
    /// HTTP status code (stringified)
    pub status_code: String,
    /// Field errors, or debug details in debug builds
    pub details: Option<String>,
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            log_error(&self);
        } else {
            tracing::debug!("{}", self);
        }

        let body = ErrorResponse {
            success: false,
            error: self.client_display(),
            status_code: status_code.as_str().to_string(),
            details: self.details(),
        };

        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn database_errors_map_to_statuses() {
        let forbidden = WebError::db(ResourceType::Course, DatabaseError::Forbidden);
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

        let invalid = WebError::db(ResourceType::Module, DatabaseError::Invalid("bad order".into()));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert!(invalid.client_display().contains("bad order"));

        let other = WebError::db(
            ResourceType::User,
            DatabaseError::SqlxError(sqlx::Error::RowNotFound),
        );
        assert_eq!(other.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_errors_are_unauthorized() {
        assert_eq!(WebError::auth_required().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            WebError::auth_invalid_credentials().status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn conflicts() {
        assert_eq!(WebError::registration_conflict().status_code(), StatusCode::CONFLICT);
        assert_eq!(
            WebError::resource_conflict(ResourceType::QuizAttempt, "no attempts left").status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn validation_details_always_present() {
        let err = WebError::malformed_body("expected a number");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.details().as_deref(), Some("expected a number"));
    }
}
