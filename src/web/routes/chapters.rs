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
        entity::{Chapter, ChapterCreate, ContentItem, Enrollment},
        ordering,
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::content::{ChapterDetail, ChapterUpdateBody, ContentItemView, ReorderBody, StructureCreateBody},
        error::ErrorResponse,
        extract::ValidJson,
        guard, middlewares,
        response::ApiResponse,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/api/modules/{id}/chapters",
            get(chapter_list_handler).post(chapter_create_handler),
        )
        .route("/api/modules/{id}/chapters/reorder", post(chapter_reorder_handler))
        .route(
            "/api/chapters/{id}",
            get(chapter_get_handler)
                .patch(chapter_update_handler)
                .delete(chapter_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/modules/{id}/chapters",
    params(("id" = Uuid, Path, description = "Module id")),
    responses(
        (status = 200, description = "Chapters in display order", body = Vec<Chapter>),
        (status = 403, description = "You may not study this course", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "chapters",
    security(("cookie" = []), ("bearer" = []))
)]
async fn chapter_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(module_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = guard::fetch_module(state.pool(), user, module_id).await?;
    guard::ensure_can_study(state.pool(), user, module.course_id()).await?;

    let chapters = Chapter::all_by_module(state.pool(), user, module_id)
        .await
        .map_err(|e| WebError::db(Chapter::get_resource_type(), e))?;

    Ok(ApiResponse::ok(chapters))
}

#[utoipa::path(
    post,
    path = "/api/modules/{id}/chapters",
    params(("id" = Uuid, Path, description = "Module id")),
    request_body = StructureCreateBody,
    responses(
        (status = 201, description = "Chapter created", body = Chapter),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "chapters",
    security(("cookie" = []), ("bearer" = []))
)]
async fn chapter_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(module_id): Path<Uuid>,
    ValidJson(payload): ValidJson<StructureCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = guard::fetch_module(state.pool(), user, module_id).await?;
    guard::authored_course(state.pool(), user, module.course_id()).await?;

    let created = Chapter::create(
        state.pool(),
        user,
        ChapterCreate {
            module_id,
            title: payload.title,
            description: payload.description,
            order_index: payload.order_index,
        },
    )
    .await
    .map_err(|e| WebError::db(Chapter::get_resource_type(), e))?;

    Ok(ApiResponse::created(created))
}

#[utoipa::path(
    post,
    path = "/api/modules/{id}/chapters/reorder",
    params(("id" = Uuid, Path, description = "Module id")),
    request_body = ReorderBody,
    responses(
        (status = 200, description = "Chapters in their new order", body = Vec<Chapter>),
        (status = 400, description = "Ids are not exactly the module's chapters", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
    ),
    tag = "chapters",
    security(("cookie" = []), ("bearer" = []))
)]
async fn chapter_reorder_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(module_id): Path<Uuid>,
    ValidJson(payload): ValidJson<ReorderBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = guard::fetch_module(state.pool(), user, module_id).await?;
    guard::authored_course(state.pool(), user, module.course_id()).await?;

    ordering::apply_order::<Chapter>(state.pool(), module_id, &payload.ids)
        .await
        .map_err(|e| WebError::db(Chapter::get_resource_type(), e))?;

    let chapters = Chapter::all_by_module(state.pool(), user, module_id)
        .await
        .map_err(|e| WebError::db(Chapter::get_resource_type(), e))?;

    Ok(ApiResponse::ok(chapters))
}

#[utoipa::path(
    get,
    path = "/api/chapters/{id}",
    params(("id" = Uuid, Path, description = "Chapter id")),
    description = "Chapter with its content items",
    responses(
        (status = 200, description = "Chapter found", body = ChapterDetail),
        (status = 403, description = "You may not study this course", body = ErrorResponse),
        (status = 404, description = "Chapter not found", body = ErrorResponse),
    ),
    tag = "chapters",
    security(("cookie" = []), ("bearer" = []))
)]
async fn chapter_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let chapter = guard::fetch_chapter(state.pool(), user, id).await?;
    let course_id = guard::course_of_chapter(state.pool(), &chapter).await?;
    guard::ensure_can_study(state.pool(), user, course_id).await?;

    let items = ContentItem::all_by_chapter(state.pool(), user, id)
        .await
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;
    let content = ContentItemView::for_actor_all(&items, user)
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?;

    Ok(ApiResponse::ok(ChapterDetail { chapter, content }))
}

#[utoipa::path(
    patch,
    path = "/api/chapters/{id}",
    params(("id" = Uuid, Path, description = "Chapter id")),
    request_body = ChapterUpdateBody,
    description = "Updates a chapter; `module_id` moves it to another module of the same course",
    responses(
        (status = 200, description = "Chapter updated", body = Chapter),
        (status = 400, description = "Target module belongs to another course", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Chapter or module not found", body = ErrorResponse),
    ),
    tag = "chapters",
    security(("cookie" = []), ("bearer" = []))
)]
async fn chapter_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<ChapterUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let chapter = guard::fetch_chapter(state.pool(), user, id).await?;
    let course_id = guard::course_of_chapter(state.pool(), &chapter).await?;
    guard::authored_course(state.pool(), user, course_id).await?;

    let mut data = chapter.to_update();
    if let Some(module_id) = payload.module_id.filter(|m| *m != chapter.module_id()) {
        let target = guard::fetch_module(state.pool(), user, module_id).await?;
        if target.course_id() != course_id {
            return Err(WebError::resource_bad_request(
                Chapter::get_resource_type(),
                "chapters can only move between modules of the same course",
            ));
        }
        data.module_id = module_id;
    }
    if let Some(title) = payload.title {
        data.title = title;
    }
    if let Some(description) = payload.description {
        data.description = description;
    }
    data.order_index = payload.order_index;

    let updated = chapter
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::db(Chapter::get_resource_type(), e))?;

    Ok(ApiResponse::ok(updated))
}

#[utoipa::path(
    delete,
    path = "/api/chapters/{id}",
    params(("id" = Uuid, Path, description = "Chapter id")),
    responses(
        (status = 200, description = "Chapter deleted"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Chapter not found", body = ErrorResponse),
    ),
    tag = "chapters",
    security(("cookie" = []), ("bearer" = []))
)]
async fn chapter_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let chapter = guard::fetch_chapter(state.pool(), user, id).await?;
    let course_id = guard::course_of_chapter(state.pool(), &chapter).await?;
    guard::authored_course(state.pool(), user, course_id).await?;

    chapter
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::db(Chapter::get_resource_type(), e))?;
    Enrollment::sync_course(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::db(Enrollment::get_resource_type(), e))?;

    Ok(ApiResponse::deleted())
}
