use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use tracing::info;

use super::{body, query};
use crate::database::models::views::{ThreadList, ThreadView};
use crate::database::models::{CommentRecord, VoteType};
use crate::database::operations::forum::ThreadFilter;
use crate::error::ApiError;
use crate::forum::{self, NewThread, VoteOutcome, VoteTarget};
use crate::state::AppState;
use crate::types::{CreateCommentRequest, CreateThreadRequest, PageRequest, ThreadQuery, VoteRequest};
use crate::utils::non_blank;

/// GET /api/forum/threads
pub async fn list_threads(
    State(state): State<AppState>,
    params: Result<Query<ThreadQuery>, QueryRejection>,
) -> Result<Json<ThreadList>, ApiError> {
    let params = query(params)?;
    let page = PageRequest::resolve(params.limit, params.offset)?;
    let filter = ThreadFilter {
        municipality_id: non_blank(&params.municipality_id),
        tag: non_blank(&params.tag),
    };

    let list = forum::list_threads(state.pool(), &filter, page).await?;
    info!(
        "GET /api/forum/threads - {} of {} threads",
        list.threads.len(),
        list.pagination.total
    );
    Ok(Json(list))
}

/// GET /api/forum/threads/{municipality_id}
pub async fn threads_for_municipality(
    State(state): State<AppState>,
    Path(municipality_id): Path<String>,
) -> Result<Json<Vec<ThreadView>>, ApiError> {
    let threads = forum::threads_for_municipality(state.pool(), &municipality_id).await?;
    Ok(Json(threads))
}

/// POST /api/forum/threads
pub async fn create_thread(
    State(state): State<AppState>,
    payload: Result<Json<CreateThreadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ThreadView>), ApiError> {
    let req = body(payload)?;
    let missing = || {
        ApiError::validation(
            "Missing required fields: title, content, author, and municipalityId are required",
        )
    };

    let new = NewThread {
        title: non_blank(&req.title).ok_or_else(missing)?,
        content: non_blank(&req.content).ok_or_else(missing)?,
        author: non_blank(&req.author).ok_or_else(missing)?,
        municipality_id: non_blank(&req.municipality_id).ok_or_else(missing)?,
        tags: req.tags,
    };

    let view = forum::create_thread(state.pool(), new).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/forum/comments
pub async fn create_comment(
    State(state): State<AppState>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentRecord>), ApiError> {
    let req = body(payload)?;
    let missing =
        || ApiError::validation("Missing required fields: content, author, and threadId are required");

    let content = non_blank(&req.content).ok_or_else(missing)?;
    let author = non_blank(&req.author).ok_or_else(missing)?;
    let thread_id = non_blank(&req.thread_id).ok_or_else(missing)?;

    let comment = forum::add_comment(state.pool(), content, author, thread_id).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// POST /api/forum/vote
pub async fn cast_vote(
    State(state): State<AppState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteOutcome>, ApiError> {
    let (target, vote_type) = parse_vote(body(payload)?)?;
    Ok(Json(forum::vote(state.pool(), target, vote_type).await?))
}

/// DELETE /api/forum/vote
pub async fn remove_vote(
    State(state): State<AppState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteOutcome>, ApiError> {
    let (target, vote_type) = parse_vote(body(payload)?)?;
    Ok(Json(forum::remove_vote(state.pool(), target, vote_type).await?))
}

// Vote type is checked before the target
fn parse_vote(req: VoteRequest) -> Result<(VoteTarget, VoteType), ApiError> {
    let vote_type: VoteType = req
        .vote_type
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::Validation)?;
    let target = VoteTarget::from_ids(req.thread_id, req.comment_id)?;
    Ok((target, vote_type))
}
