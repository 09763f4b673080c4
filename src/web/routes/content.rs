use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{ContentItem, ContentItemCreate},
        ordering,
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::content::{
            ContentCreateBody, ContentItemView, ContentUpdateBody, ReorderBody, check_content,
        },
        error::ErrorResponse,
        extract::ValidJson,
        guard, middlewares,
        response::ApiResponse,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/api/chapters/{id}/content",
            get(content_list_handler).post(content_create_handler),
        )
        .route("/api/chapters/{id}/content/reorder", post(content_reorder_handler))
        .route(
            "/api/content/{id}",
            get(content_get_handler)
                .patch(content_update_handler)
                .delete(content_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn bad_content(reason: String) -> WebError {
    WebError::resource_bad_request(ContentItem::get_resource_type(), reason)
}

#[utoipa::path(
    get,
    path = "/api/chapters/{id}/content",
    params(("id" = Uuid, Path, description = "Chapter id")),
    description = "Content items of a chapter; students get quizzes without answers",
    responses(
        (status = 200, description = "Content in display order", body = Vec<ContentItemView>),
        (status = 403, description = "You may not study this course", body = ErrorResponse),
        (status = 404, description = "Chapter not found", body = ErrorResponse),
    ),
    tag = "content",
    security(("cookie" = []), ("bearer" = []))
)]
async fn content_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(chapter_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let chapter = guard::fetch_chapter(state.pool(), user, chapter_id).await?;
    let course_id = guard::course_of_chapter(state.pool(), &chapter).await?;
    guard::ensure_can_study(state.pool(), user, course_id).await?;

    let items = ContentItem::all_by_chapter(state.pool(), user, chapter_id)
        .await
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;
    let views = ContentItemView::for_actor_all(&items, user)
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;

    Ok(ApiResponse::ok(views))
}

#[utoipa::path(
    post,
    path = "/api/chapters/{id}/content",
    params(("id" = Uuid, Path, description = "Chapter id")),
    request_body = ContentCreateBody,
    responses(
        (status = 201, description = "Content item created", body = ContentItemView),
        (status = 400, description = "Invalid fields or quiz definition", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Chapter not found", body = ErrorResponse),
    ),
    tag = "content",
    security(("cookie" = []), ("bearer" = []))
)]
async fn content_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(chapter_id): Path<Uuid>,
    ValidJson(payload): ValidJson<ContentCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let chapter = guard::fetch_chapter(state.pool(), user, chapter_id).await?;
    let course_id = guard::course_of_chapter(state.pool(), &chapter).await?;
    guard::authored_course(state.pool(), user, course_id).await?;

    check_content(payload.content_type, payload.url.as_deref(), payload.quiz.as_ref())
        .map_err(bad_content)?;

    let created = ContentItem::create(
        state.pool(),
        user,
        ContentItemCreate {
            chapter_id,
            title: payload.title,
            content_type: payload.content_type,
            body: payload.body,
            url: payload.url,
            quiz: payload.quiz,
            order_index: payload.order_index,
        },
    )
    .await
    .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;

    let view = ContentItemView::for_actor(&created, user)
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;
    Ok(ApiResponse::created(view))
}

#[utoipa::path(
    post,
    path = "/api/chapters/{id}/content/reorder",
    params(("id" = Uuid, Path, description = "Chapter id")),
    request_body = ReorderBody,
    responses(
        (status = 200, description = "Content in its new order", body = Vec<ContentItemView>),
        (status = 400, description = "Ids are not exactly the chapter's items", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
    ),
    tag = "content",
    security(("cookie" = []), ("bearer" = []))
)]
async fn content_reorder_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(chapter_id): Path<Uuid>,
    ValidJson(payload): ValidJson<ReorderBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let chapter = guard::fetch_chapter(state.pool(), user, chapter_id).await?;
    let course_id = guard::course_of_chapter(state.pool(), &chapter).await?;
    guard::authored_course(state.pool(), user, course_id).await?;

    ordering::apply_order::<ContentItem>(state.pool(), chapter_id, &payload.ids)
        .await
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;

    let items = ContentItem::all_by_chapter(state.pool(), user, chapter_id)
        .await
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;
    let views = ContentItemView::for_actor_all(&items, user)
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;

    Ok(ApiResponse::ok(views))
}

#[utoipa::path(
    get,
    path = "/api/content/{id}",
    params(("id" = Uuid, Path, description = "Content item id")),
    responses(
        (status = 200, description = "Content item found", body = ContentItemView),
        (status = 403, description = "You may not study this course", body = ErrorResponse),
        (status = 404, description = "Content item not found", body = ErrorResponse),
    ),
    tag = "content",
    security(("cookie" = []), ("bearer" = []))
)]
async fn content_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let item = guard::fetch_content(state.pool(), user, id).await?;
    let course_id = guard::course_of_content(state.pool(), &item).await?;
    guard::ensure_can_study(state.pool(), user, course_id).await?;

    let view = ContentItemView::for_actor(&item, user)
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;
    Ok(ApiResponse::ok(view))
}

#[utoipa::path(
    patch,
    path = "/api/content/{id}",
    params(("id" = Uuid, Path, description = "Content item id")),
    request_body = ContentUpdateBody,
    responses(
        (status = 200, description = "Content item updated", body = ContentItemView),
        (status = 400, description = "Invalid fields or quiz definition", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Content item not found", body = ErrorResponse),
    ),
    tag = "content",
    security(("cookie" = []), ("bearer" = []))
)]
async fn content_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<ContentUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let item = guard::fetch_content(state.pool(), user, id).await?;
    let course_id = guard::course_of_content(state.pool(), &item).await?;
    guard::authored_course(state.pool(), user, course_id).await?;

    let mut data = item
        .to_update()
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;
    if let Some(content_type) = payload.content_type {
        data.content_type = content_type;
        // Switching away from a quiz drops its definition.
        if content_type != item.content_type() && payload.quiz.is_none() {
            data.quiz = None;
        }
    }
    if let Some(title) = payload.title {
        data.title = title;
    }
    if let Some(body) = payload.body {
        data.body = body;
    }
    if let Some(url) = payload.url {
        data.url = Some(url);
    }
    if let Some(quiz) = payload.quiz {
        data.quiz = Some(quiz);
    }
    data.order_index = payload.order_index;

    check_content(data.content_type, data.url.as_deref(), data.quiz.as_ref()).map_err(bad_content)?;

    let updated = item
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;

    let view = ContentItemView::for_actor(&updated, user)
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;
    Ok(ApiResponse::ok(view))
}

#[utoipa::path(
    delete,
    path = "/api/content/{id}",
    params(("id" = Uuid, Path, description = "Content item id")),
    responses(
        (status = 200, description = "Content item deleted"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Content item not found", body = ErrorResponse),
    ),
    tag = "content",
    security(("cookie" = []), ("bearer" = []))
)]
async fn content_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let item = guard::fetch_content(state.pool(), user, id).await?;
    let course_id = guard::course_of_content(state.pool(), &item).await?;
    guard::authored_course(state.pool(), user, course_id).await?;

    item.delete(state.pool(), user)
        .await
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;

    Ok(ApiResponse::deleted())
}
