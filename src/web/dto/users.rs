use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::UserRole;

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct UserCreateBody {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    #[serde(deserialize_with = "role_from_str")]
    pub role: UserRole,
    pub domain_id: Option<Uuid>,
}

/// Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UserUpdateBody {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "maybe_role_from_str")]
    pub role: Option<UserRole>,
    pub domain_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

impl UserUpdateBody {
    /// Fields only user managers may change.
    pub fn touches_admin_fields(&self) -> bool {
        self.role.is_some() || self.domain_id.is_some() || self.is_active.is_some() || self.email.is_some()
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct UserListQuery {
    pub role: Option<String>,
    #[serde(default = "crate::web::routes::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn role_from_str<'de, D: serde::Deserializer<'de>>(d: D) -> Result<UserRole, D::Error> {
    let raw = String::deserialize(d)?;
    UserRole::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("unknown role `{raw}`")))
}

fn maybe_role_from_str<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<UserRole>, D::Error> {
    match Option::<String>::deserialize(d)? {
        Some(raw) => UserRole::parse(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown role `{raw}`"))),
        None => Ok(None),
    }
}
