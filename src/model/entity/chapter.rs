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

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Chapter {
    id: Uuid,
    module_id: Uuid,
    title: String,
    description: String,
    order_index: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ChapterCreate {
    pub module_id: Uuid,
    pub title: String,
    pub description: String,
    pub order_index: Option<i32>,
}

impl ResourceTyped for Chapter {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Chapter
    }
}

impl Ordered for Chapter {
    const TABLE: &'static str = "chapters";
    const PARENT: &'static str = "module_id";
    const PARENT_TABLE: &'static str = "modules";
}

impl Chapter {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn module_id(&self) -> Uuid {
        self.module_id
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

    pub fn to_update(&self) -> ChapterCreate {
        ChapterCreate {
            module_id: self.module_id,
            title: self.title.clone(),
            description: self.description.clone(),
            order_index: None,
        }
    }
}

#[async_trait]
impl CrudRepository<Chapter, ChapterCreate, Uuid> for Chapter {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: ChapterCreate,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let mut tx = mm.executor().begin().await?;

        let idx = ordering::next_index::<Chapter>(&mut *tx, data.module_id).await?;
        sqlx::query("INSERT INTO chapters (id, module_id, title, description, order_index) VALUES ($1,$2,$3,$4,$5)")
            .bind(id)
            .bind(data.module_id)
            .bind(&data.title)
            .bind(&data.description)
            .bind(idx)
            .execute(&mut *tx)
            .await?;

        if data.order_index.is_some() {
            ordering::place::<Chapter>(&mut *tx, data.module_id, id, data.order_index).await?;
        }
        tx.commit().await?;

        Self::find_by_id(mm, actor, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound.into())
    }

    /// A changed `module_id` moves the chapter: it is placed at `order_index`
    /// (or appended) in the new module and the old module closes the gap.
    async fn update(
        self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: ChapterCreate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.executor().begin().await?;

        // both parents, in a stable order
        let mut parents = [self.module_id, data.module_id];
        parents.sort_unstable();
        for parent in parents {
            ordering::lock_parent::<Chapter>(&mut *tx, parent).await?;
        }

        sqlx::query("UPDATE chapters SET title = $1, description = $2 WHERE id = $3")
            .bind(&data.title)
            .bind(&data.description)
            .bind(self.id)
            .execute(&mut *tx)
            .await?;

        if data.module_id != self.module_id {
            let idx = ordering::next_index::<Chapter>(&mut *tx, data.module_id).await?;
            sqlx::query("UPDATE chapters SET module_id = $1, order_index = $2 WHERE id = $3")
                .bind(data.module_id)
                .bind(idx)
                .bind(self.id)
                .execute(&mut *tx)
                .await?;

            ordering::place::<Chapter>(&mut *tx, data.module_id, self.id, data.order_index).await?;
            ordering::resequence::<Chapter>(&mut *tx, self.module_id).await?;
            tracing::debug!("chapter {} moved {} -> {}", self.id, self.module_id, data.module_id);
        } else if let Some(position) = data.order_index.filter(|p| *p != self.order_index) {
            ordering::place::<Chapter>(&mut *tx, self.module_id, self.id, Some(position)).await?;
        }
        tx.commit().await?;

        Self::find_by_id(mm, actor, self.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound.into())
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        let mut tx = mm.executor().begin().await?;
        ordering::lock_parent::<Chapter>(&mut *tx, self.module_id).await?;
        sqlx::query("DELETE FROM chapters WHERE id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;
        ordering::resequence::<Chapter>(&mut *tx, self.module_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM chapters WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM chapters ORDER BY module_id, order_index LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chapters")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl Chapter {
    pub async fn all_by_module(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        module_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM chapters WHERE module_id = $1 ORDER BY order_index")
            .bind(module_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn course_id(&self, mm: &ModelManager) -> DatabaseResult<Uuid> {
        let id = sqlx::query_scalar("SELECT course_id FROM modules WHERE id = $1")
            .bind(self.module_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(id)
    }

    pub async fn count_in_course(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM chapters c
            JOIN modules m ON m.id = c.module_id
            WHERE m.course_id = $1
            "#,
        )
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Chapter {
    type OwnerId = Uuid;
    const OVERRIDE: Permission = Permission::ManageAllCourses;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let trainer: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT co.trainer_id
            FROM modules m
            JOIN courses co ON co.id = m.course_id
            WHERE m.id = $1
            "#,
        )
        .bind(self.module_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(trainer.unwrap_or_default())
    }
}
