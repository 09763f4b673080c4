use crate::impl_paginatable_for;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Subject area courses are grouped under.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Domain {
    id: Uuid,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DomainCreateUpdate {
    pub name: String,
    pub description: String,
}

impl ResourceTyped for Domain {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Domain
    }
}

impl Domain {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

#[async_trait]
impl CrudRepository<Domain, DomainCreateUpdate, Uuid> for Domain {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: DomainCreateUpdate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "INSERT INTO domains (id, name, description) VALUES ($1,$2,$3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.name.trim())
        .bind(&data.description)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: DomainCreateUpdate,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE domains SET name = $1, description = $2 WHERE id = $3")
            .bind(data.name.trim())
            .bind(&data.description)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.name = data.name.trim().to_string();
        self.description = data.description;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM domains WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM domains WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM domains ORDER BY name LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM domains")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Domain, DomainCreateUpdate, Uuid);

impl Domain {
    pub async fn find_by_name(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        name: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM domains WHERE name = $1")
            .bind(name.trim())
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }
}
