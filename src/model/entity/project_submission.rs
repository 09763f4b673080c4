use crate::auth::Permission;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::Course;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct ProjectSubmission {
    id: Uuid,
    student_id: Uuid,
    content_item_id: Uuid,
    submission_url: String,
    notes: String,
    status: String,
    grade: Option<i32>,
    feedback: Option<String>,
    reviewed_by: Option<Uuid>,
    submitted_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct ProjectSubmissionCreate {
    pub student_id: Uuid,
    pub content_item_id: Uuid,
    pub submission_url: String,
    pub notes: String,
}

impl ResourceTyped for ProjectSubmission {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::ProjectSubmission
    }
}

impl ProjectSubmission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn content_item_id(&self) -> Uuid {
        self.content_item_id
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub async fn create(mm: &ModelManager, data: ProjectSubmissionCreate) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO project_submissions (id, student_id, content_item_id, submission_url, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.student_id)
        .bind(data.content_item_id)
        .bind(&data.submission_url)
        .bind(&data.notes)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as("SELECT * FROM project_submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(row)
    }

    pub async fn list_for(
        mm: &ModelManager,
        content_item_id: Uuid,
        student_id: Option<Uuid>,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT * FROM project_submissions
            WHERE content_item_id = $1 AND ($2::uuid IS NULL OR student_id = $2)
            ORDER BY submitted_at DESC
            "#,
        )
        .bind(content_item_id)
        .bind(student_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    /// Grades the submission. A later review overwrites an earlier one.
    pub async fn review(
        self,
        mm: &ModelManager,
        reviewer: &AuthenticatedUser,
        grade: i32,
        feedback: Option<String>,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE project_submissions
            SET status = 'reviewed', grade = $1, feedback = $2, reviewed_by = $3, reviewed_at = now()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(grade)
        .bind(feedback)
        .bind(reviewer.user_id())
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn course_id(&self, mm: &ModelManager) -> DatabaseResult<Uuid> {
        let id = sqlx::query_scalar(
            r#"
            SELECT m.course_id
            FROM content_items ci
            JOIN chapters c ON c.id = ci.chapter_id
            JOIN modules m ON m.id = c.module_id
            WHERE ci.id = $1
            "#,
        )
        .bind(self.content_item_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(id)
    }
}

#[async_trait]
impl HasOwner for ProjectSubmission {
    type OwnerId = Uuid;
    const OVERRIDE: Permission = Permission::ManageAllCourses;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let course_id = self.course_id(mm).await?;
        Ok(Course::trainer_of(mm, course_id).await?.unwrap_or_default())
    }
}
