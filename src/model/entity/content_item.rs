use crate::auth::Permission;
use crate::model::access::HasOwner;
use crate::model::ordering::{self, Ordered};
use crate::model::quiz::QuizDefinition;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Video,
    Document,
    Link,
    Quiz,
    Project,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Video => "video",
            Self::Document => "document",
            Self::Link => "link",
            Self::Quiz => "quiz",
            Self::Project => "project",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "video" => Some(Self::Video),
            "document" => Some(Self::Document),
            "link" => Some(Self::Link),
            "quiz" => Some(Self::Quiz),
            "project" => Some(Self::Project),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct ContentItem {
    id: Uuid,
    chapter_id: Uuid,
    title: String,
    content_type: String,
    body: String,
    url: Option<String>,
    #[schema(value_type = Option<Object>)]
    quiz: Option<serde_json::Value>,
    order_index: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ContentItemCreate {
    pub chapter_id: Uuid,
    pub title: String,
    pub content_type: ContentType,
    pub body: String,
    pub url: Option<String>,
    pub quiz: Option<QuizDefinition>,
    pub order_index: Option<i32>,
}

impl ResourceTyped for ContentItem {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::ContentItem
    }
}

impl Ordered for ContentItem {
    const TABLE: &'static str = "content_items";
    const PARENT: &'static str = "chapter_id";
    const PARENT_TABLE: &'static str = "chapters";
}

impl ContentItem {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn chapter_id(&self) -> Uuid {
        self.chapter_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content_type(&self) -> ContentType {
        ContentType::parse(&self.content_type).unwrap_or(ContentType::Text)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn quiz(&self) -> DatabaseResult<Option<QuizDefinition>> {
        match &self.quiz {
            Some(raw) => Ok(Some(serde_json::from_value(raw.clone())?)),
            None => Ok(None),
        }
    }

    pub fn to_update(&self) -> DatabaseResult<ContentItemCreate> {
        Ok(ContentItemCreate {
            chapter_id: self.chapter_id,
            title: self.title.clone(),
            content_type: self.content_type(),
            body: self.body.clone(),
            url: self.url.clone(),
            quiz: self.quiz()?,
            order_index: None,
        })
    }
}

fn quiz_json(quiz: &Option<QuizDefinition>) -> DatabaseResult<Option<serde_json::Value>> {
    Ok(match quiz {
        Some(q) => Some(serde_json::to_value(q)?),
        None => None,
    })
}

#[async_trait]
impl CrudRepository<ContentItem, ContentItemCreate, Uuid> for ContentItem {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: ContentItemCreate,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let quiz = quiz_json(&data.quiz)?;
        let mut tx = mm.executor().begin().await?;

        let idx = ordering::next_index::<ContentItem>(&mut *tx, data.chapter_id).await?;
        sqlx::query(
            r#"
            INSERT INTO content_items (id, chapter_id, title, content_type, body, url, quiz, order_index)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            "#,
        )
        .bind(id)
        .bind(data.chapter_id)
        .bind(&data.title)
        .bind(data.content_type.as_str())
        .bind(&data.body)
        .bind(&data.url)
        .bind(quiz)
        .bind(idx)
        .execute(&mut *tx)
        .await?;

        if data.order_index.is_some() {
            ordering::place::<ContentItem>(&mut *tx, data.chapter_id, id, data.order_index).await?;
        }
        tx.commit().await?;

        Self::find_by_id(mm, actor, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound.into())
    }

    async fn update(
        self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: ContentItemCreate,
    ) -> DatabaseResult<Self> {
        let quiz = quiz_json(&data.quiz)?;
        let mut tx = mm.executor().begin().await?;

        sqlx::query(
            r#"
            UPDATE content_items
            SET title = $1, content_type = $2, body = $3, url = $4, quiz = $5
            WHERE id = $6
            "#,
        )
        .bind(&data.title)
        .bind(data.content_type.as_str())
        .bind(&data.body)
        .bind(&data.url)
        .bind(quiz)
        .bind(self.id)
        .execute(&mut *tx)
        .await?;

        if let Some(position) = data.order_index.filter(|p| *p != self.order_index) {
            ordering::place::<ContentItem>(&mut *tx, self.chapter_id, self.id, Some(position)).await?;
        }
        tx.commit().await?;

        Self::find_by_id(mm, actor, self.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound.into())
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        let mut tx = mm.executor().begin().await?;
        ordering::lock_parent::<ContentItem>(&mut *tx, self.chapter_id).await?;
        sqlx::query("DELETE FROM content_items WHERE id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;
        ordering::resequence::<ContentItem>(&mut *tx, self.chapter_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM content_items WHERE id = $1")
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
        let result = sqlx::query_as(
            "SELECT * FROM content_items ORDER BY chapter_id, order_index LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content_items")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl ContentItem {
    pub async fn all_by_chapter(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        chapter_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM content_items WHERE chapter_id = $1 ORDER BY order_index")
                .bind(chapter_id)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    pub async fn course_id(&self, mm: &ModelManager) -> DatabaseResult<Uuid> {
        let id = sqlx::query_scalar(
            r#"
            SELECT m.course_id
            FROM chapters c
            JOIN modules m ON m.id = c.module_id
            WHERE c.id = $1
            "#,
        )
        .bind(self.chapter_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(id)
    }
}

#[async_trait]
impl HasOwner for ContentItem {
    type OwnerId = Uuid;
    const OVERRIDE: Permission = Permission::ManageAllCourses;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let trainer: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT co.trainer_id
            FROM chapters c
            JOIN modules m ON m.id = c.module_id
            JOIN courses co ON co.id = m.course_id
            WHERE c.id = $1
            "#,
        )
        .bind(self.chapter_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(trainer.unwrap_or_default())
    }
}
