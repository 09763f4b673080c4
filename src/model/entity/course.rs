use crate::auth::Permission;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Course {
    id: Uuid,
    title: String,
    description: String,
    domain_id: Option<Uuid>,
    trainer_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CourseCreateUpdate {
    pub title: String,
    pub description: String,
    pub domain_id: Option<Uuid>,
    pub trainer_id: Option<Uuid>,
    pub status: CourseStatus,
}

#[derive(Debug, Default, Clone, Deserialize, utoipa::IntoParams)]
pub struct CourseFilter {
    pub domain_id: Option<Uuid>,
    pub status: Option<CourseStatus>,
}

impl ResourceTyped for Course {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn domain_id(&self) -> Option<Uuid> {
        self.domain_id
    }

    pub fn trainer_id(&self) -> Option<Uuid> {
        self.trainer_id
    }

    pub fn status(&self) -> CourseStatus {
        CourseStatus::parse(&self.status).unwrap_or(CourseStatus::Draft)
    }

    pub fn is_published(&self) -> bool {
        self.status() == CourseStatus::Published
    }

    pub fn to_update(&self) -> CourseCreateUpdate {
        CourseCreateUpdate {
            title: self.title.clone(),
            description: self.description.clone(),
            domain_id: self.domain_id,
            trainer_id: self.trainer_id,
            status: self.status(),
        }
    }
}

#[async_trait]
impl CrudRepository<Course, CourseCreateUpdate, Uuid> for Course {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreateUpdate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO courses (id, title, description, domain_id, trainer_id, status)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.domain_id)
        .bind(data.trainer_id)
        .bind(data.status.as_str())
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreateUpdate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE courses
            SET title = $1, description = $2, domain_id = $3, trainer_id = $4, status = $5,
                updated_at = now()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.domain_id)
        .bind(data.trainer_id)
        .bind(data.status.as_str())
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM courses WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM courses ORDER BY created_at, id LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Course {
    type OwnerId = Uuid;
    const OVERRIDE: Permission = Permission::ManageAllCourses;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.trainer_id.unwrap_or_default())
    }
}

impl Course {
    /// Courses the actor may see: everything for course managers, own and
    /// published courses for trainers, published ones for everybody else.
    pub async fn list_visible(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        filter: &CourseFilter,
    ) -> DatabaseResult<Vec<Self>> {
        let role = actor.user_role();
        let see_all = role.has_permission(Permission::ManageAllCourses);
        let owner = role
            .has_permission(Permission::AuthorCourses)
            .then_some(actor.user_id());

        let rows = sqlx::query_as(
            r#"
            SELECT * FROM courses c
            WHERE ($1::uuid IS NULL OR c.domain_id = $1)
              AND ($2::text IS NULL OR c.status = $2)
              AND ($3::bool OR c.status = 'published' OR c.trainer_id = $4)
            ORDER BY c.created_at, c.id
            "#,
        )
        .bind(filter.domain_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(see_all)
        .bind(owner)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }

    pub async fn count_by_status(mm: &ModelManager) -> DatabaseResult<Vec<(String, i64)>> {
        let rows = sqlx::query_as("SELECT status, COUNT(*) FROM courses GROUP BY status ORDER BY status")
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }
}

// Utils

#[derive(Debug, sqlx::FromRow)]
pub struct ModuleOutlineRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub chapters: serde_json::Value,
}

impl ModuleOutlineRow {
    /// Modules of a course with their chapters, in display order. `completed`
    /// on each chapter reflects the progress of `student_id`.
    pub async fn fetch_for_course(
        mm: &ModelManager,
        student_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<ModuleOutlineRow> = sqlx::query_as(
            r#"
            SELECT
            m.id,
            m.title,
            m.description,
            m.order_index,
            COALESCE(
                json_agg(
                    json_build_object(
                        'id', c.id,
                        'title', c.title,
                        'order_index', c.order_index,
                        'completed', COALESCE(cp.completed, false)
                    ) ORDER BY c.order_index
                ) FILTER (WHERE c.id IS NOT NULL),
                '[]'
            ) AS chapters
            FROM modules m
            LEFT JOIN chapters c ON c.module_id = m.id
            LEFT JOIN chapter_progress cp
            ON cp.chapter_id = c.id
            AND cp.student_id = $2
            WHERE m.course_id = $1
            GROUP BY m.id
            ORDER BY m.order_index;
        "#,
        )
        .bind(course_id)
        .bind(student_id)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }
}

impl Course {
    pub async fn trainer_of(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<Option<Uuid>> {
        let trainer: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT trainer_id FROM courses WHERE id = $1")
                .bind(course_id)
                .fetch_optional(mm.executor())
                .await?;
        Ok(trainer.flatten())
    }
}
