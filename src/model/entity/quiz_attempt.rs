use crate::model::quiz::{QuizAnswers, QuizScore};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizAttempt {
    id: Uuid,
    student_id: Uuid,
    content_item_id: Uuid,
    #[schema(value_type = Object)]
    answers: Json<QuizAnswers>,
    score: i32,
    max_score: i32,
    percentage: i32,
    passed: bool,
    attempt_number: i32,
    submitted_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct QuizAttemptCreate {
    pub student_id: Uuid,
    pub content_item_id: Uuid,
    pub answers: QuizAnswers,
    pub score: QuizScore,
}

impl ResourceTyped for QuizAttempt {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::QuizAttempt
    }
}

impl QuizAttempt {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn attempt_number(&self) -> i32 {
        self.attempt_number
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn percentage(&self) -> i32 {
        self.percentage
    }

    /// Stores the attempt numbered after the student's previous ones, or
    /// returns `None` once `max_attempts` numbers are taken. Submissions of
    /// one student queue on their enrollment row.
    pub async fn create(
        mm: &ModelManager,
        data: QuizAttemptCreate,
        max_attempts: Option<i32>,
    ) -> DatabaseResult<Option<Self>> {
        let mut tx = mm.executor().begin().await?;

        sqlx::query(
            r#"
            SELECT e.id
            FROM enrollments e
            JOIN modules m ON m.course_id = e.course_id
            JOIN chapters c ON c.module_id = m.id
            JOIN content_items ci ON ci.chapter_id = c.id
            WHERE e.student_id = $1 AND ci.id = $2
            FOR UPDATE OF e
            "#,
        )
        .bind(data.student_id)
        .bind(data.content_item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let row: Option<Self> = sqlx::query_as(
            r#"
            INSERT INTO quiz_attempts
                (id, student_id, content_item_id, answers, score, max_score, percentage, passed, attempt_number)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, next.n
            FROM (
                SELECT COALESCE(MAX(attempt_number), 0) + 1 AS n
                FROM quiz_attempts
                WHERE student_id = $2 AND content_item_id = $3
            ) AS next
            WHERE $9::int4 IS NULL OR next.n <= $9
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.student_id)
        .bind(data.content_item_id)
        .bind(Json(&data.answers))
        .bind(data.score.score)
        .bind(data.score.max_score)
        .bind(data.score.percentage)
        .bind(data.score.passed)
        .bind(max_attempts)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        if row.is_some() {
            tracing::debug!(
                "quiz {} attempt by {}: {}%",
                data.content_item_id,
                data.student_id,
                data.score.percentage
            );
        }
        Ok(row)
    }

    pub async fn count_for(
        mm: &ModelManager,
        student_id: Uuid,
        content_item_id: Uuid,
    ) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quiz_attempts WHERE student_id = $1 AND content_item_id = $2",
        )
        .bind(student_id)
        .bind(content_item_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(count)
    }

    /// Attempts on a quiz, newest first. `student_id` narrows to one student.
    pub async fn list_for(
        mm: &ModelManager,
        content_item_id: Uuid,
        student_id: Option<Uuid>,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT * FROM quiz_attempts
            WHERE content_item_id = $1 AND ($2::uuid IS NULL OR student_id = $2)
            ORDER BY submitted_at DESC, attempt_number DESC
            "#,
        )
        .bind(content_item_id)
        .bind(student_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}
