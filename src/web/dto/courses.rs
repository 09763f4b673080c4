use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::model::{
    DatabaseResult,
    entity::{Course, CourseStatus, ModuleOutlineRow},
};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CourseCreateBody {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub domain_id: Option<Uuid>,
    /// Only course managers may pick the trainer; trainers always own what
    /// they create.
    pub trainer_id: Option<Uuid>,
    pub status: Option<CourseStatus>,
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct CourseUpdateBody {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub domain_id: Option<Uuid>,
    pub trainer_id: Option<Uuid>,
    pub status: Option<CourseStatus>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChapterShort {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    pub order_index: i32,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ModuleOutline {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub chapters: Vec<ChapterShort>,
}

impl TryFrom<ModuleOutlineRow> for ModuleOutline {
    type Error = serde_json::Error;

    fn try_from(value: ModuleOutlineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            title: value.title,
            description: value.description,
            order_index: value.order_index,
            chapters: serde_json::from_value(value.chapters)?,
        })
    }
}

impl ModuleOutline {
    pub fn from_rows(rows: Vec<ModuleOutlineRow>) -> DatabaseResult<Vec<Self>> {
        Ok(rows
            .into_iter()
            .map(ModuleOutline::try_from)
            .collect::<Result<_, _>>()?)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    /// Empty until the caller may study the course.
    pub modules: Vec<ModuleOutline>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn outline_row_parses_chapters() {
        let row = ModuleOutlineRow {
            id: Uuid::new_v4(),
            title: "Basics".into(),
            description: String::new(),
            order_index: 0,
            chapters: serde_json::json!([
                { "id": Uuid::new_v4(), "title": "Intro", "order_index": 0, "completed": true },
                { "id": Uuid::new_v4(), "title": "Setup", "order_index": 1, "completed": false }
            ]),
        };
        let outline = ModuleOutline::try_from(row).unwrap();
        assert_eq!(outline.chapters.len(), 2);
        assert!(outline.chapters[0].completed);
        assert_eq!(outline.chapters[1].order_index, 1);
    }

    #[test]
    fn empty_title_rejected() {
        let body = CourseCreateBody {
            title: String::new(),
            description: String::new(),
            domain_id: None,
            trainer_id: None,
            status: None,
        };
        assert!(body.validate().is_err());
    }
}
