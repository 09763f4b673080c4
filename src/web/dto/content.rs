//! Bodies and views for modules, chapters and content items.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    model::{
        DatabaseResult,
        entity::{Chapter, ContentItem, ContentType},
        quiz::QuizDefinition,
    },
    web::AuthenticatedUser,
};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ReorderBody {
    /// Every sibling id exactly once, in the new order.
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct StructureCreateBody {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Zero-based position; appends when absent.
    #[validate(range(min = 0, message = "must not be negative"))]
    pub order_index: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct ModuleUpdateBody {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub order_index: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct ChapterUpdateBody {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    /// Moves the chapter to another module of the same course.
    pub module_id: Option<Uuid>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub order_index: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ContentCreateBody {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub title: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub body: String,
    #[validate(url(message = "must be a valid URL"))]
    pub url: Option<String>,
    pub quiz: Option<QuizDefinition>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub order_index: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct ContentUpdateBody {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub title: Option<String>,
    pub content_type: Option<ContentType>,
    pub body: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub url: Option<String>,
    pub quiz: Option<QuizDefinition>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub order_index: Option<i32>,
}

/// Only quiz items carry a quiz, and it must be well formed. Links need a URL.
pub fn check_content(
    content_type: ContentType,
    url: Option<&str>,
    quiz: Option<&QuizDefinition>,
) -> Result<(), String> {
    match (content_type, quiz) {
        (ContentType::Quiz, None) => return Err("quiz items need a quiz definition".into()),
        (ContentType::Quiz, Some(q)) => q.validate()?,
        (_, Some(_)) => return Err("only quiz items may carry a quiz definition".into()),
        (_, None) => {}
    }
    if content_type == ContentType::Link && url.is_none() {
        return Err("link items need a url".into());
    }
    Ok(())
}

/// A content item as the caller may see it: students get the quiz without its
/// answer key.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ContentItemView {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub title: String,
    pub content_type: ContentType,
    pub body: String,
    pub url: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub quiz: Option<serde_json::Value>,
    pub order_index: i32,
}

impl ContentItemView {
    pub fn for_actor(item: &ContentItem, actor: &AuthenticatedUser) -> DatabaseResult<Self> {
        let quiz = match item.quiz()? {
            Some(q) if actor.is_student() => Some(serde_json::to_value(q.public_view())?),
            Some(q) => Some(serde_json::to_value(q)?),
            None => None,
        };

        Ok(Self {
            id: item.id(),
            chapter_id: item.chapter_id(),
            title: item.title().to_string(),
            content_type: item.content_type(),
            body: item.body().to_string(),
            url: item.url().map(str::to_string),
            quiz,
            order_index: item.order_index(),
        })
    }

    pub fn for_actor_all(items: &[ContentItem], actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        items.iter().map(|i| Self::for_actor(i, actor)).collect()
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ChapterDetail {
    #[serde(flatten)]
    pub chapter: Chapter,
    pub content: Vec<ContentItemView>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn quiz() -> QuizDefinition {
        serde_json::from_value(serde_json::json!({
            "questions": [{ "id": "q1", "prompt": "?", "options": ["a", "b"], "correct": [1] }]
        }))
        .unwrap()
    }

    #[test]
    fn quiz_items_need_a_valid_quiz() {
        assert!(check_content(ContentType::Quiz, None, None).is_err());
        assert!(check_content(ContentType::Quiz, None, Some(&quiz())).is_ok());

        let mut broken = quiz();
        broken.questions[0].correct = vec![7];
        assert!(check_content(ContentType::Quiz, None, Some(&broken)).is_err());
    }

    #[test]
    fn other_items_reject_quiz() {
        assert!(check_content(ContentType::Text, None, Some(&quiz())).is_err());
        assert!(check_content(ContentType::Text, None, None).is_ok());
    }

    #[test]
    fn links_need_url() {
        assert!(check_content(ContentType::Link, None, None).is_err());
        assert!(check_content(ContentType::Link, Some("https://example.com"), None).is_ok());
    }

    #[test]
    fn negative_position_rejected() {
        let body = StructureCreateBody {
            title: "Intro".into(),
            description: String::new(),
            order_index: Some(-1),
        };
        assert!(body.validate().is_err());
    }
}
