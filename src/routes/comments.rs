use crate::{
    error::{AppError, Result},
    models::{
        comment::*,
        response::{ApiResponse, FailureResponse},
    },
    services::{captcha::CaptchaChallenge, moderation::ModerationOutcome},
    state::AppState,
    utils::{middleware::CommentRequestContext, validation::validate_submission},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

const MAX_RECENT_LIMIT: i64 = 100;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/content/:content_id", get(list_comments).post(submit_comment))
        .route("/content/:content_id/count", get(count_comments))
        .route("/recent", get(recent_comments))
        .route("/user/:user_id/recent", get(recent_comments_by_user))
        .route("/captcha", get(issue_captcha))
        .route(
            "/moderation/:content_id/:session_hash/:action/:comment_id",
            get(moderate_comment),
        )
}

async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<i64>,
    Query(query): Query<ListCommentsQuery>,
) -> Result<Json<ApiResponse<Vec<Comment>>>> {
    let comments = state
        .comment_service
        .list_comments(content_id, query.into(), CommentStatus::Accept)
        .await?;

    Ok(Json(ApiResponse::success(comments)))
}

async fn count_comments(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<i64>,
) -> Result<Json<Value>> {
    let count = state.comment_service.count_accepted(content_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "content_id": content_id, "count": count }
    })))
}

async fn recent_comments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentCommentsQuery>,
) -> Result<Json<ApiResponse<Vec<Comment>>>> {
    let comments = state
        .comment_service
        .list_recent_comments(recent_limit(&query))
        .await?;

    Ok(Json(ApiResponse::success(comments)))
}

async fn recent_comments_by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(query): Query<RecentCommentsQuery>,
) -> Result<Json<ApiResponse<Vec<Comment>>>> {
    let comments = state
        .comment_service
        .list_recent_comments_by_user(user_id, recent_limit(&query))
        .await?;

    Ok(Json(ApiResponse::success(comments)))
}

async fn issue_captcha(State(state): State<Arc<AppState>>) -> Json<ApiResponse<CaptchaChallenge>> {
    Json(ApiResponse::success(state.captcha_service.issue()))
}

async fn submit_comment(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<i64>,
    ctx: CommentRequestContext,
    Json(submission): Json<CommentSubmission>,
) -> Result<Response> {
    if ctx.user.is_none() && !state.moderation_service.has_anonymous_access() {
        return Err(AppError::unauthorized("Authentication required"));
    }

    let captcha = state
        .config
        .captcha_enabled
        .then_some(&state.captcha_service);

    let payload = match validate_submission(&submission, ctx.user.is_some(), captcha) {
        Ok(payload) => payload,
        Err(errors) => {
            tracing::debug!("Rejected comment on content {}: {:?}", content_id, errors);
            let response = (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(FailureResponse::validation(errors)),
            )
                .into_response();
            return Ok(ctx.attach_session(response));
        }
    };

    let submitted = state
        .moderation_service
        .submit(&ctx.submission(), content_id, &payload)
        .await?;

    let body = match submitted.status {
        CommentStatus::Waiting => {
            ApiResponse::success_with_message(submitted, "Your comment is awaiting moderation")
        }
        _ => ApiResponse::success(submitted),
    };

    Ok(ctx.attach_session((StatusCode::CREATED, Json(body)).into_response()))
}

async fn moderate_comment(
    State(state): State<Arc<AppState>>,
    Path((content_id, session_hash, action, comment_id)): Path<(i64, String, String, i64)>,
) -> Result<Response> {
    let action: ModerationAction = action.parse().map_err(AppError::BadRequest)?;

    let outcome = state
        .moderation_service
        .apply_action(content_id, &session_hash, comment_id, action)
        .await?;

    let response = match outcome {
        ModerationOutcome::Applied(status) => Json(json!({
            "success": true,
            "data": { "comment_id": comment_id, "status": status }
        }))
        .into_response(),
        ModerationOutcome::NotProcessed => Json(FailureResponse::not_processed()).into_response(),
    };

    Ok(response)
}

fn recent_limit(query: &RecentCommentsQuery) -> i64 {
    query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT)
}
