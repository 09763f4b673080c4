use crate::auth::Permission;
use crate::model::access::HasOwner;
use crate::model::ordering::{self, Ordered};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::Course;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Module {
    id: uuid::Uuid,
    course_id: Uuid,
    title: String,
    description: String,
    order_index: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ModuleCreate {
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    /// Appends when absent.
    pub order_index: Option<i32>,
}

impl ResourceTyped for Module {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Module
    }
}

impl Ordered for Module {
    const TABLE: &'static str = "modules";
    const PARENT: &'static str = "course_id";
    const PARENT_TABLE: &'static str = "courses";
}

impl Module {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn to_update(&self) -> ModuleCreate {
        ModuleCreate {
            course_id: self.course_id,
            title: self.title.clone(),
            description: self.description.clone(),
            order_index: None,
        }
    }
}

#[async_trait]
impl CrudRepository<Module, ModuleCreate, uuid::Uuid> for Module {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: ModuleCreate,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let mut tx = mm.executor().begin().await?;

        let idx = ordering::next_index::<Module>(&mut *tx, data.course_id).await?;
        sqlx::query("INSERT INTO modules (id, course_id, title, description, order_index) VALUES ($1,$2,$3,$4,$5)")
            .bind(id)
            .bind(data.course_id)
            .bind(&data.title)
            .bind(&data.description)
            .bind(idx)
            .execute(&mut *tx)
            .await?;

        if data.order_index.is_some() {
            ordering::place::<Module>(&mut *tx, data.course_id, id, data.order_index).await?;
        }
        tx.commit().await?;

        Self::find_by_id(mm, actor, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound.into())
    }

    async fn update(
        self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: ModuleCreate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.executor().begin().await?;

        sqlx::query("UPDATE modules SET title = $1, description = $2 WHERE id = $3")
            .bind(&data.title)
            .bind(&data.description)
            .bind(self.id)
            .execute(&mut *tx)
            .await?;

        if let Some(position) = data.order_index.filter(|p| *p != self.order_index) {
            ordering::place::<Module>(&mut *tx, self.course_id, self.id, Some(position)).await?;
        }
        tx.commit().await?;

        Self::find_by_id(mm, actor, self.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound.into())
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        let mut tx = mm.executor().begin().await?;
        ordering::lock_parent::<Module>(&mut *tx, self.course_id).await?;
        sqlx::query("DELETE FROM modules WHERE id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;
        ordering::resequence::<Module>(&mut *tx, self.course_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM modules WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM modules ORDER BY course_id, order_index LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modules")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl Module {
    pub async fn all_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM modules WHERE course_id = $1 ORDER BY order_index")
            .bind(course_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Module {
    type OwnerId = uuid::Uuid;
    const OVERRIDE: Permission = Permission::ManageAllCourses;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(Course::trainer_of(mm, self.course_id).await?.unwrap_or_default())
    }
}
