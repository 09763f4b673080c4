use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    auth::Permission,
    model::{
        ModelManager, ResourceType, ResourceTyped,
        entity::{
            ContentItem, ContentType, ProjectSubmission, ProjectSubmissionCreate, QuizAttempt,
            QuizAttemptCreate,
        },
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::learning::{AttemptBody, AttemptResult, ReviewBody, SubmissionBody, attempts_remaining},
        error::ErrorResponse,
        extract::ValidJson,
        guard, middlewares,
        response::ApiResponse,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/api/content/{id}/attempts",
            get(attempt_list_handler).post(attempt_create_handler),
        )
        .route(
            "/api/content/{id}/submissions",
            get(submission_list_handler).post(submission_create_handler),
        )
        .route("/api/submissions/{id}/review", patch(submission_review_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn no_attempts_left() -> WebError {
    WebError::resource_conflict(QuizAttempt::get_resource_type(), "no attempts left for this quiz")
}

/// Loads a content item of the given type, answering 400 for any other.
async fn typed_item(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    id: Uuid,
    expected: ContentType,
) -> WebResult<ContentItem> {
    let item = guard::fetch_content(mm, actor, id).await?;
    if item.content_type() != expected {
        return Err(WebError::resource_bad_request(
            ContentItem::get_resource_type(),
            format!("content item is not a {}", expected.as_str()),
        ));
    }
    Ok(item)
}

/// Students read their own rows; staff owning the course read everyone's.
async fn reader_scope(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    item: &ContentItem,
) -> WebResult<Option<Uuid>> {
    if actor.is_student() {
        Ok(Some(actor.user_id()))
    } else {
        guard::ensure_owner(mm, actor, item).await?;
        Ok(None)
    }
}

#[utoipa::path(
    post,
    path = "/api/content/{id}/attempts",
    params(("id" = Uuid, Path, description = "Quiz content item id")),
    request_body = AttemptBody,
    description = "Scores and stores a quiz attempt",
    responses(
        (status = 201, description = "Attempt scored", body = AttemptResult),
        (status = 400, description = "Content item is not a quiz", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Content item not found", body = ErrorResponse),
        (status = 409, description = "No attempts left", body = ErrorResponse),
    ),
    tag = "learning",
    security(("cookie" = []), ("bearer" = []))
)]
async fn attempt_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<AttemptBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let item = typed_item(state.pool(), user, id, ContentType::Quiz).await?;
    let course_id = guard::course_of_content(state.pool(), &item).await?;
    guard::ensure_enrolled_student(state.pool(), user, course_id).await?;

    let quiz = item
        .quiz()
        .map_err(|e| WebError::db(ContentItem::get_resource_type(), e))?
        .ok_or(WebError::resource_bad_request(
            ContentItem::get_resource_type(),
            "quiz item has no quiz definition",
        ))?;

    let used = QuizAttempt::count_for(state.pool(), user.user_id(), id)
        .await
        .map_err(|e| WebError::db(QuizAttempt::get_resource_type(), e))?;
    if quiz.attempts_exhausted(used) {
        return Err(no_attempts_left());
    }

    let score = quiz.score(&payload.answers);
    let attempt = QuizAttempt::create(
        state.pool(),
        QuizAttemptCreate {
            student_id: user.user_id(),
            content_item_id: id,
            answers: payload.answers,
            score,
        },
        quiz.max_attempts,
    )
    .await
    .map_err(|e| WebError::db(QuizAttempt::get_resource_type(), e))?
    .ok_or_else(no_attempts_left)?;

    tracing::info!(
        "quiz attempt #{} on {} by {}: {}%",
        attempt.attempt_number(),
        id,
        user.user_id(),
        attempt.percentage()
    );

    let remaining = attempts_remaining(quiz.max_attempts, attempt.attempt_number() as i64);
    Ok(ApiResponse::created(AttemptResult {
        attempt,
        attempts_remaining: remaining,
    }))
}

#[utoipa::path(
    get,
    path = "/api/content/{id}/attempts",
    params(("id" = Uuid, Path, description = "Quiz content item id")),
    description = "Students get their own attempts, staff owning the course get everyone's",
    responses(
        (status = 200, description = "Attempts, newest first", body = Vec<QuizAttempt>),
        (status = 400, description = "Content item is not a quiz", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Content item not found", body = ErrorResponse),
    ),
    tag = "learning",
    security(("cookie" = []), ("bearer" = []))
)]
async fn attempt_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let item = typed_item(state.pool(), user, id, ContentType::Quiz).await?;
    let student = reader_scope(state.pool(), user, &item).await?;

    let attempts = QuizAttempt::list_for(state.pool(), id, student)
        .await
        .map_err(|e| WebError::db(QuizAttempt::get_resource_type(), e))?;

    Ok(ApiResponse::ok(attempts))
}

#[utoipa::path(
    post,
    path = "/api/content/{id}/submissions",
    params(("id" = Uuid, Path, description = "Project content item id")),
    request_body = SubmissionBody,
    responses(
        (status = 201, description = "Submission stored", body = ProjectSubmission),
        (status = 400, description = "Content item is not a project", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Content item not found", body = ErrorResponse),
    ),
    tag = "learning",
    security(("cookie" = []), ("bearer" = []))
)]
async fn submission_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<SubmissionBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let item = typed_item(state.pool(), user, id, ContentType::Project).await?;
    let course_id = guard::course_of_content(state.pool(), &item).await?;
    guard::ensure_enrolled_student(state.pool(), user, course_id).await?;

    let submission = ProjectSubmission::create(
        state.pool(),
        ProjectSubmissionCreate {
            student_id: user.user_id(),
            content_item_id: id,
            submission_url: payload.submission_url,
            notes: payload.notes,
        },
    )
    .await
    .map_err(|e| WebError::db(ProjectSubmission::get_resource_type(), e))?;

    Ok(ApiResponse::created(submission))
}

#[utoipa::path(
    get,
    path = "/api/content/{id}/submissions",
    params(("id" = Uuid, Path, description = "Project content item id")),
    description = "Students get their own submissions, staff owning the course get everyone's",
    responses(
        (status = 200, description = "Submissions, newest first", body = Vec<ProjectSubmission>),
        (status = 400, description = "Content item is not a project", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Content item not found", body = ErrorResponse),
    ),
    tag = "learning",
    security(("cookie" = []), ("bearer" = []))
)]
async fn submission_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let item = typed_item(state.pool(), user, id, ContentType::Project).await?;
    let student = reader_scope(state.pool(), user, &item).await?;

    let submissions = ProjectSubmission::list_for(state.pool(), id, student)
        .await
        .map_err(|e| WebError::db(ProjectSubmission::get_resource_type(), e))?;

    Ok(ApiResponse::ok(submissions))
}

#[utoipa::path(
    patch,
    path = "/api/submissions/{id}/review",
    params(("id" = Uuid, Path, description = "Submission id")),
    request_body = ReviewBody,
    responses(
        (status = 200, description = "Submission reviewed", body = ProjectSubmission),
        (status = 400, description = "Grade out of range", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse),
    ),
    tag = "learning",
    security(("cookie" = []), ("bearer" = []))
)]
async fn submission_review_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<ReviewBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    guard::ensure_permission(user, Permission::ReviewSubmissions, ResourceType::ProjectSubmission)?;

    let submission = ProjectSubmission::find_by_id(state.pool(), id)
        .await
        .map_err(|e| WebError::db(ProjectSubmission::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(ProjectSubmission::get_resource_type()))?;
    guard::ensure_owner(state.pool(), user, &submission).await?;

    let reviewed = submission
        .review(state.pool(), user, payload.grade, payload.feedback)
        .await
        .map_err(|e| WebError::db(ProjectSubmission::get_resource_type(), e))?;

    tracing::info!("submission {} graded {} by {}", id, payload.grade, user.user_id());
    Ok(ApiResponse::ok(reviewed))
}
