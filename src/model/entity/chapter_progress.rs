use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// A student's completion flag on one chapter. At most one row per
/// (student, chapter).
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct ChapterProgress {
    id: Uuid,
    student_id: Uuid,
    chapter_id: Uuid,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl ResourceTyped for ChapterProgress {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::ChapterProgress
    }
}

impl ChapterProgress {
    pub fn chapter_id(&self) -> Uuid {
        self.chapter_id
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Upserts the flag. `completed_at` keeps the first completion time and is
    /// cleared when the chapter is reopened.
    pub async fn set(
        mm: &ModelManager,
        student_id: Uuid,
        chapter_id: Uuid,
        completed: bool,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO chapter_progress (id, student_id, chapter_id, completed, completed_at)
            VALUES ($1, $2, $3, $4, CASE WHEN $4 THEN now() END)
            ON CONFLICT (student_id, chapter_id) DO UPDATE
            SET completed = EXCLUDED.completed,
                completed_at = CASE
                    WHEN EXCLUDED.completed THEN COALESCE(chapter_progress.completed_at, now())
                    ELSE NULL
                END,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(chapter_id)
        .bind(completed)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn count_completed_in_course(
        mm: &ModelManager,
        student_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM chapter_progress cp
            JOIN chapters c ON c.id = cp.chapter_id
            JOIN modules m ON m.id = c.module_id
            WHERE m.course_id = $1 AND cp.student_id = $2 AND cp.completed
            "#,
        )
        .bind(course_id)
        .bind(student_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(count)
    }
}
