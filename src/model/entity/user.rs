use crate::auth::{Permission, UserRole};
use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserEntity {
    id: uuid::Uuid,
    email: String,
    name: String,
    #[serde(skip)]
    password_hash: String,
    role: String,
    domain_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UserEntityCreateUpdate {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: UserRole,
    pub domain_id: Option<Uuid>,
    pub is_active: bool,
}

impl ResourceTyped for UserEntity {
    fn get_resource_type() -> crate::model::repo::ResourceType {
        crate::model::repo::ResourceType::User
    }
}

impl UserEntity {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> &str {
        &self.password_hash
    }

    pub fn role(&self) -> UserRole {
        UserRole::from(self.role.as_str())
    }

    pub fn domain_id(&self) -> Option<Uuid> {
        self.domain_id
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Current values as an update payload, for partial updates.
    pub fn to_update(&self) -> UserEntityCreateUpdate {
        UserEntityCreateUpdate {
            email: self.email.clone(),
            name: self.name.clone(),
            password_hash: self.password_hash.clone(),
            role: self.role(),
            domain_id: self.domain_id,
            is_active: self.is_active,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait::async_trait]
impl CrudRepository<UserEntity, UserEntityCreateUpdate, uuid::Uuid> for UserEntity {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, domain_id, is_active)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(normalize_email(&data.email))
        .bind(&data.name)
        .bind(&data.password_hash)
        .bind(data.role.as_str())
        .bind(data.domain_id)
        .bind(data.is_active)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        let email = normalize_email(&data.email);
        sqlx::query(
            r#"
            UPDATE users
            SET email = $1, name = $2, password_hash = $3, role = $4, domain_id = $5, is_active = $6
            WHERE id = $7
            "#,
        )
        .bind(&email)
        .bind(&data.name)
        .bind(&data.password_hash)
        .bind(data.role.as_str())
        .bind(data.domain_id)
        .bind(data.is_active)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.email = email;
        self.name = data.name;
        self.password_hash = data.password_hash;
        self.role = data.role.to_string();
        self.domain_id = data.domain_id;
        self.is_active = data.is_active;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(UserEntity, UserEntityCreateUpdate, Uuid);

#[async_trait]
impl HasOwner for UserEntity {
    type OwnerId = uuid::Uuid;
    const OVERRIDE: Permission = Permission::ManageUsers;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.id) // owners of users are themselves
    }
}

impl UserEntity {
    pub async fn find_by_email(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        email: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn page_by_role(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        role: UserRole,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<crate::model::Page<Self>> {
        let items = sqlx::query_as(
            "SELECT * FROM users WHERE role = $1 ORDER BY created_at, id LIMIT $2 OFFSET $3",
        )
        .bind(role.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(mm.executor())
            .await?;

        Ok(crate::model::Page::new(items, total, limit, offset))
    }

    pub async fn count_by_role(mm: &ModelManager) -> DatabaseResult<Vec<(String, i64)>> {
        let rows = sqlx::query_as("SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role")
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }
}
