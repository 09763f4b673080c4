//! Read-only aggregates over enrollments, chapter progress and quiz attempts.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{
    DatabaseResult, ModelManager,
    entity::{Chapter, Course, UserEntity},
};

/// Whole percent of `completed` out of `total`, rounded down. Empty courses
/// report zero.
pub fn completion_percent(completed: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    (completed.min(total) * 100 / total) as i32
}

/// One enrollment with its chapter counts.
#[derive(Debug, Serialize, FromRow, utoipa::ToSchema)]
pub struct ProgressRow {
    pub enrollment_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub course_id: Uuid,
    pub course_title: String,
    pub status: String,
    pub total_chapters: i64,
    pub completed_chapters: i64,
}

impl ProgressRow {
    pub fn percent(&self) -> i32 {
        completion_percent(self.completed_chapters, self.total_chapters)
    }

    /// `student_id` and `course_id` narrow the rows independently.
    pub async fn fetch(
        mm: &ModelManager,
        student_id: Option<Uuid>,
        course_id: Option<Uuid>,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                e.id AS enrollment_id,
                e.student_id,
                u.name AS student_name,
                e.course_id,
                co.title AS course_title,
                e.status,
                (
                    SELECT COUNT(*) FROM chapters c
                    JOIN modules m ON m.id = c.module_id
                    WHERE m.course_id = e.course_id
                ) AS total_chapters,
                (
                    SELECT COUNT(*) FROM chapter_progress cp
                    JOIN chapters c ON c.id = cp.chapter_id
                    JOIN modules m ON m.id = c.module_id
                    WHERE m.course_id = e.course_id
                      AND cp.student_id = e.student_id
                      AND cp.completed
                ) AS completed_chapters
            FROM enrollments e
            JOIN users u ON u.id = e.student_id
            JOIN courses co ON co.id = e.course_id
            WHERE ($1::uuid IS NULL OR e.student_id = $1)
              AND ($2::uuid IS NULL OR e.course_id = $2)
            ORDER BY e.enrolled_at, e.id
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}

#[derive(Debug, Serialize, FromRow, utoipa::ToSchema)]
pub struct EnrollmentCounts {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
    pub dropped: i64,
}

#[derive(Debug, Serialize, FromRow, utoipa::ToSchema)]
pub struct QuizStatsRow {
    pub content_item_id: Uuid,
    pub title: String,
    pub attempts: i64,
    pub students: i64,
    pub average_percentage: f64,
    pub passed: i64,
}

impl EnrollmentCounts {
    pub async fn for_course(mm: &ModelManager, course_id: Option<Uuid>) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'active') AS active,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'dropped') AS dropped
            FROM enrollments
            WHERE $1::uuid IS NULL OR course_id = $1
            "#,
        )
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }
}

impl QuizStatsRow {
    pub async fn for_course(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                ci.id AS content_item_id,
                ci.title,
                COUNT(qa.id) AS attempts,
                COUNT(DISTINCT qa.student_id) AS students,
                COALESCE(AVG(qa.percentage), 0)::float8 AS average_percentage,
                COUNT(qa.id) FILTER (WHERE qa.passed) AS passed
            FROM content_items ci
            JOIN chapters c ON c.id = ci.chapter_id
            JOIN modules m ON m.id = c.module_id
            LEFT JOIN quiz_attempts qa ON qa.content_item_id = ci.id
            WHERE m.course_id = $1 AND ci.content_type = 'quiz'
            GROUP BY ci.id, ci.title, m.order_index, c.order_index, ci.order_index
            ORDER BY m.order_index, c.order_index, ci.order_index
            "#,
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}

/// Platform-wide totals.
#[derive(Debug, Serialize, FromRow, utoipa::ToSchema)]
pub struct PlatformTotals {
    pub users: i64,
    pub domains: i64,
    pub courses: i64,
    pub classes: i64,
    pub quiz_attempts: i64,
    pub pending_submissions: i64,
}

impl PlatformTotals {
    pub async fn fetch(mm: &ModelManager) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM domains) AS domains,
                (SELECT COUNT(*) FROM courses) AS courses,
                (SELECT COUNT(*) FROM classes) AS classes,
                (SELECT COUNT(*) FROM quiz_attempts) AS quiz_attempts,
                (SELECT COUNT(*) FROM project_submissions WHERE status = 'submitted') AS pending_submissions
            "#,
        )
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }
}

/// Per-course report for its trainer and course managers.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseAnalytics {
    pub course_id: Uuid,
    pub enrollments: EnrollmentCounts,
    pub total_chapters: i64,
    pub average_completion: i32,
    pub quiz_attempts: i64,
    pub average_quiz_percentage: f64,
    /// Share of attempts that passed, in percent.
    pub pass_rate: i32,
    pub pending_submissions: i64,
    pub quizzes: Vec<QuizStatsRow>,
}

impl CourseAnalytics {
    pub async fn fetch(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<Self> {
        let enrollments = EnrollmentCounts::for_course(mm, Some(course_id)).await?;
        let progress = ProgressRow::fetch(mm, None, Some(course_id)).await?;
        let quizzes = QuizStatsRow::for_course(mm, course_id).await?;
        let total_chapters = Chapter::count_in_course(mm, course_id).await?;

        let pending_submissions: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM project_submissions ps
            JOIN content_items ci ON ci.id = ps.content_item_id
            JOIN chapters c ON c.id = ci.chapter_id
            JOIN modules m ON m.id = c.module_id
            WHERE m.course_id = $1 AND ps.status = 'submitted'
            "#,
        )
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;

        let percents: Vec<i32> = progress.iter().map(ProgressRow::percent).collect();
        let quiz_attempts: i64 = quizzes.iter().map(|q| q.attempts).sum();
        let passed: i64 = quizzes.iter().map(|q| q.passed).sum();

        Ok(Self {
            course_id,
            enrollments,
            total_chapters,
            average_completion: average(&percents),
            quiz_attempts,
            average_quiz_percentage: weighted_quiz_average(&quizzes),
            pass_rate: completion_percent(passed, quiz_attempts),
            pending_submissions,
            quizzes,
        })
    }
}

/// Platform-wide report for administrators.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PlatformOverview {
    pub users_by_role: BTreeMap<String, i64>,
    pub courses_by_status: BTreeMap<String, i64>,
    pub enrollments: EnrollmentCounts,
    pub totals: PlatformTotals,
}

impl PlatformOverview {
    pub async fn fetch(mm: &ModelManager) -> DatabaseResult<Self> {
        Ok(Self {
            users_by_role: UserEntity::count_by_role(mm).await?.into_iter().collect(),
            courses_by_status: Course::count_by_status(mm).await?.into_iter().collect(),
            enrollments: EnrollmentCounts::for_course(mm, None).await?,
            totals: PlatformTotals::fetch(mm).await?,
        })
    }
}

fn average(values: &[i32]) -> i32 {
    if values.is_empty() {
        return 0;
    }
    (values.iter().map(|v| *v as i64).sum::<i64>() / values.len() as i64) as i32
}

/// Mean percentage over all attempts, not over quizzes.
fn weighted_quiz_average(quizzes: &[QuizStatsRow]) -> f64 {
    let attempts: i64 = quizzes.iter().map(|q| q.attempts).sum();
    if attempts == 0 {
        return 0.0;
    }
    let total: f64 = quizzes
        .iter()
        .map(|q| q.average_percentage * q.attempts as f64)
        .sum();
    total / attempts as f64
}
