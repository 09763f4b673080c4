use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::model::entity::{Class, ClassStudentRow};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
#[validate(schema(function = "validate_class_dates"))]
pub struct ClassCreateBody {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,
    pub course_id: Uuid,
    pub trainer_id: Option<Uuid>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct ClassUpdateBody {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: Option<String>,
    pub trainer_id: Option<Uuid>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ClassStudentBody {
    pub student_id: Uuid,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ClassListQuery {
    pub course_id: Option<Uuid>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ClassDetail {
    #[serde(flatten)]
    pub class: Class,
    pub students: Vec<ClassStudentRow>,
}

pub fn dates_in_order(starts_on: Option<NaiveDate>, ends_on: Option<NaiveDate>) -> bool {
    match (starts_on, ends_on) {
        (Some(start), Some(end)) => start <= end,
        _ => true,
    }
}

fn validate_class_dates(body: &ClassCreateBody) -> Result<(), ValidationError> {
    if dates_in_order(body.starts_on, body.ends_on) {
        Ok(())
    } else {
        Err(ValidationError::new("ends_on must not be before starts_on"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn end_before_start_rejected() {
        let body = ClassCreateBody {
            name: "Evening".into(),
            course_id: Uuid::new_v4(),
            trainer_id: None,
            starts_on: NaiveDate::from_ymd_opt(2025, 3, 1),
            ends_on: NaiveDate::from_ymd_opt(2025, 2, 1),
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn open_ended_dates_allowed() {
        assert!(dates_in_order(NaiveDate::from_ymd_opt(2025, 3, 1), None));
        assert!(dates_in_order(None, None));
    }
}
