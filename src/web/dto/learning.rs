//! Progress, quiz attempts and project submissions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::model::{
    analytics::ProgressRow,
    entity::{ChapterProgress, Enrollment, QuizAttempt},
    quiz::QuizAnswers,
};

use super::courses::ModuleOutline;

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ProgressBody {
    pub completed: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ChapterProgressResponse {
    pub progress: ChapterProgress,
    /// The enrollment after its status was re-derived from progress.
    pub enrollment: Option<Enrollment>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CourseProgressQuery {
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProgressSummary {
    pub enrollment_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub course_id: Uuid,
    pub course_title: String,
    pub status: String,
    pub total_chapters: i64,
    pub completed_chapters: i64,
    pub percent: i32,
}

impl From<ProgressRow> for ProgressSummary {
    fn from(row: ProgressRow) -> Self {
        let percent = row.percent();
        Self {
            enrollment_id: row.enrollment_id,
            student_id: row.student_id,
            student_name: row.student_name,
            course_id: row.course_id,
            course_title: row.course_title,
            status: row.status,
            total_chapters: row.total_chapters,
            completed_chapters: row.completed_chapters,
            percent,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseProgressDetail {
    #[serde(flatten)]
    pub summary: ProgressSummary,
    pub modules: Vec<ModuleOutline>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct AttemptBody {
    /// Selected option indexes per question id.
    #[schema(value_type = Object)]
    pub answers: QuizAnswers,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AttemptResult {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    /// `None` when the quiz has no attempt limit.
    pub attempts_remaining: Option<i64>,
}

pub fn attempts_remaining(max_attempts: Option<i32>, used: i64) -> Option<i64> {
    max_attempts.map(|max| (max as i64 - used).max(0))
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct SubmissionBody {
    #[validate(url(message = "must be a valid URL"))]
    pub submission_url: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub notes: String,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ReviewBody {
    #[validate(range(min = 0, max = 100, message = "must be between 0 and 100"))]
    pub grade: i32,
    pub feedback: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn remaining_attempts() {
        assert_eq!(attempts_remaining(Some(3), 1), Some(2));
        assert_eq!(attempts_remaining(Some(3), 5), Some(0));
        assert_eq!(attempts_remaining(None, 5), None);
    }

    #[test]
    fn grade_range() {
        let body = ReviewBody {
            grade: 101,
            feedback: None,
        };
        assert!(body.validate().is_err());

        let body = ReviewBody {
            grade: 100,
            feedback: Some("great".into()),
        };
        assert!(body.validate().is_ok());
    }

    #[test]
    fn submission_needs_url() {
        let body = SubmissionBody {
            submission_url: "not a url".into(),
            notes: String::new(),
        };
        assert!(body.validate().is_err());
    }
}
