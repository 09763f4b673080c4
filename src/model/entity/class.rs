use crate::auth::Permission;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::Course;

/// A cohort of students taking one course together.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Class {
    id: Uuid,
    name: String,
    course_id: Uuid,
    trainer_id: Option<Uuid>,
    starts_on: Option<NaiveDate>,
    ends_on: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ClassCreateUpdate {
    pub name: String,
    pub course_id: Uuid,
    pub trainer_id: Option<Uuid>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct ClassStudentRow {
    pub student_id: Uuid,
    pub name: String,
    pub email: String,
    pub enrollment_id: Uuid,
    pub status: String,
}

impl ResourceTyped for Class {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Class
    }
}

impl Class {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn trainer_id(&self) -> Option<Uuid> {
        self.trainer_id
    }

    pub fn to_update(&self) -> ClassCreateUpdate {
        ClassCreateUpdate {
            name: self.name.clone(),
            course_id: self.course_id,
            trainer_id: self.trainer_id,
            starts_on: self.starts_on,
            ends_on: self.ends_on,
        }
    }
}

#[async_trait]
impl CrudRepository<Class, ClassCreateUpdate, Uuid> for Class {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ClassCreateUpdate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO classes (id, name, course_id, trainer_id, starts_on, ends_on)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(data.course_id)
        .bind(data.trainer_id)
        .bind(data.starts_on)
        .bind(data.ends_on)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ClassCreateUpdate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE classes
            SET name = $1, trainer_id = $2, starts_on = $3, ends_on = $4
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(data.trainer_id)
        .bind(data.starts_on)
        .bind(data.ends_on)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM classes WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM classes WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM classes ORDER BY created_at, id LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM classes")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Class {
    type OwnerId = Uuid;
    const OVERRIDE: Permission = Permission::ManageAllCourses;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(Course::trainer_of(mm, self.course_id).await?.unwrap_or_default())
    }
}

impl Class {
    /// Managers see every class, trainers the classes of their courses or the
    /// ones they teach, students the classes they belong to.
    pub async fn list_visible(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Option<Uuid>,
    ) -> DatabaseResult<Vec<Self>> {
        let see_all = actor.user_role().has_permission(Permission::ManageAllCourses);

        let rows = sqlx::query_as(
            r#"
            SELECT cl.* FROM classes cl
            JOIN courses co ON co.id = cl.course_id
            WHERE ($1::uuid IS NULL OR cl.course_id = $1)
              AND (
                $2::bool
                OR co.trainer_id = $3
                OR cl.trainer_id = $3
                OR EXISTS (
                    SELECT 1 FROM enrollments e
                    WHERE e.class_id = cl.id AND e.student_id = $3
                )
              )
            ORDER BY cl.created_at, cl.id
            "#,
        )
        .bind(course_id)
        .bind(see_all)
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }

    pub async fn students(&self, mm: &ModelManager) -> DatabaseResult<Vec<ClassStudentRow>> {
        let rows = sqlx::query_as(
            r#"
            SELECT u.id AS student_id, u.name, u.email, e.id AS enrollment_id, e.status
            FROM enrollments e
            JOIN users u ON u.id = e.student_id
            WHERE e.class_id = $1
            ORDER BY u.name
            "#,
        )
        .bind(self.id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}
