use crate::auth::{Permission, UserRole};
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::{Chapter, Course};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Dropped => "dropped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "dropped" => Some(Self::Dropped),
            _ => None,
        }
    }

    /// Status an enrollment should have given chapter completion. Dropped
    /// enrollments stay dropped.
    pub fn from_progress(current: Self, completed: i64, total: i64) -> Self {
        match current {
            Self::Dropped => Self::Dropped,
            _ if total > 0 && completed >= total => Self::Completed,
            _ => Self::Active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Enrollment {
    id: Uuid,
    student_id: Uuid,
    course_id: Uuid,
    class_id: Option<Uuid>,
    status: String,
    enrolled_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct EnrollmentCreate {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub class_id: Option<Uuid>,
    pub status: EnrollmentStatus,
}

#[derive(Debug, Default, Clone, Deserialize, utoipa::IntoParams)]
pub struct EnrollmentFilter {
    pub course_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
}

impl ResourceTyped for Enrollment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Enrollment
    }
}

impl Enrollment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn class_id(&self) -> Option<Uuid> {
        self.class_id
    }

    pub fn status(&self) -> EnrollmentStatus {
        EnrollmentStatus::parse(&self.status).unwrap_or(EnrollmentStatus::Active)
    }

    pub fn to_update(&self) -> EnrollmentCreate {
        EnrollmentCreate {
            student_id: self.student_id,
            course_id: self.course_id,
            class_id: self.class_id,
            status: self.status(),
        }
    }
}

#[async_trait]
impl CrudRepository<Enrollment, EnrollmentCreate, Uuid> for Enrollment {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: EnrollmentCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO enrollments (id, student_id, course_id, class_id, status)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.student_id)
        .bind(data.course_id)
        .bind(data.class_id)
        .bind(data.status.as_str())
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: EnrollmentCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE enrollments
            SET class_id = $1,
                status = $2,
                completed_at = CASE
                    WHEN $2 = 'completed' THEN COALESCE(completed_at, now())
                    ELSE NULL
                END
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(data.class_id)
        .bind(data.status.as_str())
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM enrollments WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM enrollments WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM enrollments ORDER BY enrolled_at, id LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Enrollment {
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

impl Enrollment {
    pub async fn find_by_student_course(
        mm: &ModelManager,
        student_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM enrollments WHERE student_id = $1 AND course_id = $2")
                .bind(student_id)
                .bind(course_id)
                .fetch_optional(mm.executor())
                .await?;
        Ok(result)
    }

    /// True for active and completed enrollments; dropped students lose access.
    pub async fn is_enrolled(
        mm: &ModelManager,
        student_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<bool> {
        let found: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM enrollments
                WHERE student_id = $1 AND course_id = $2 AND status IN ('active', 'completed')
            )
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(found)
    }

    /// Students only ever see their own rows and trainers only the rows of
    /// courses they own.
    pub async fn list_visible(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        filter: &EnrollmentFilter,
    ) -> DatabaseResult<Vec<Self>> {
        let role = actor.user_role();
        let student = (role == UserRole::Student).then_some(actor.user_id());
        let trainer = (!role.has_permission(Permission::ManageAllCourses) && student.is_none())
            .then_some(actor.user_id());

        let rows = sqlx::query_as(
            r#"
            SELECT e.* FROM enrollments e
            JOIN courses co ON co.id = e.course_id
            WHERE ($1::uuid IS NULL OR e.course_id = $1)
              AND ($2::uuid IS NULL OR e.student_id = $2)
              AND ($3::uuid IS NULL OR e.student_id = $3)
              AND ($4::uuid IS NULL OR co.trainer_id = $4)
            ORDER BY e.enrolled_at, e.id
            "#,
        )
        .bind(filter.course_id)
        .bind(filter.student_id)
        .bind(student)
        .bind(trainer)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }

    /// Enrolls the student into `class_id`, reusing an existing enrollment in
    /// the same course.
    pub async fn assign_class(
        mm: &ModelManager,
        student_id: Uuid,
        course_id: Uuid,
        class_id: Uuid,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO enrollments (id, student_id, course_id, class_id, status)
            VALUES ($1, $2, $3, $4, 'active')
            ON CONFLICT (student_id, course_id) DO UPDATE SET class_id = EXCLUDED.class_id
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(course_id)
        .bind(class_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn detach_class(
        mm: &ModelManager,
        class_id: Uuid,
        student_id: Uuid,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE enrollments SET class_id = NULL WHERE class_id = $1 AND student_id = $2",
        )
        .bind(class_id)
        .bind(student_id)
        .execute(mm.executor())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Re-derives the enrollment status from chapter progress.
    pub async fn sync_completion(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        student_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let Some(enrollment) = Self::find_by_student_course(mm, student_id, course_id).await? else {
            return Ok(None);
        };

        let total = Chapter::count_in_course(mm, course_id).await?;
        let completed = super::ChapterProgress::count_completed_in_course(mm, student_id, course_id).await?;
        let next = EnrollmentStatus::from_progress(enrollment.status(), completed, total);

        if next == enrollment.status() {
            return Ok(Some(enrollment));
        }

        tracing::info!(
            "enrollment {} of student {} is now {}",
            enrollment.id(),
            student_id,
            next.as_str()
        );
        let mut data = enrollment.to_update();
        data.status = next;
        Ok(Some(enrollment.update(mm, actor, data).await?))
    }

    /// Re-derives every live enrollment of a course after its chapters changed.
    pub async fn sync_course(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<()> {
        let students: Vec<Uuid> = sqlx::query_scalar(
            "SELECT student_id FROM enrollments WHERE course_id = $1 AND status <> 'dropped'",
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;

        for student_id in students {
            Self::sync_completion(mm, actor, student_id, course_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn progress_drives_status() {
        use EnrollmentStatus::*;

        assert_eq!(EnrollmentStatus::from_progress(Active, 3, 3), Completed);
        assert_eq!(EnrollmentStatus::from_progress(Active, 2, 3), Active);
        assert_eq!(EnrollmentStatus::from_progress(Completed, 2, 3), Active);
        assert_eq!(EnrollmentStatus::from_progress(Dropped, 3, 3), Dropped);
    }

    #[test]
    fn empty_course_never_completes() {
        assert_eq!(
            EnrollmentStatus::from_progress(EnrollmentStatus::Active, 0, 0),
            EnrollmentStatus::Active
        );
    }

    #[test]
    fn status_strings() {
        for s in [EnrollmentStatus::Active, EnrollmentStatus::Completed, EnrollmentStatus::Dropped] {
            assert_eq!(EnrollmentStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(EnrollmentStatus::parse("paused"), None);
    }
}
