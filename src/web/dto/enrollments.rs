use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::model::entity::EnrollmentStatus;

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct EnrollmentCreateBody {
    pub course_id: Uuid,
    /// Defaults to the caller; only enrollment managers may name someone else.
    pub student_id: Option<Uuid>,
    pub class_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct EnrollmentUpdateBody {
    pub status: Option<EnrollmentStatus>,
    pub class_id: Option<Uuid>,
}
