use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt};

use pawclub_http::AppError;

use super::models::{CommentDraft, VoteKind};
use super::repository::{CommentRepository, ThreadError};
use super::tree::render_thread;
use crate::session::{Authenticated, CurrentUser};
use crate::utils::now_ms;

#[derive(Clone)]
pub struct CommentsState {
    pub repo: CommentRepository,
}

pub fn router(state: CommentsState) -> Router {
    Router::new()
        .route("/{book_key}", get(get_roots).post(post_comment))
        .route("/{book_key}/thread", get(get_thread))
        .route("/{book_key}/stream", get(stream_thread))
        .route("/{book_key}/{comment_id}/vote", post(post_vote))
        .with_state(state)
}

impl From<ThreadError> for AppError {
    fn from(err: ThreadError) -> Self {
        let message = err.to_string();
        match err {
            ThreadError::EmptyText => AppError::validation(
                vec![serde_json::json!({"field": "text", "error": "empty"})],
                message,
            ),
            ThreadError::UnknownComment(_) => AppError::not_found(message),
            ThreadError::Store(store_err) => match store_err {
                pawclub_store::StoreError::InvalidPath(_) => {
                    AppError::bad_request(store_err.to_string())
                }
                other => AppError::Internal(anyhow::Error::new(other)),
            },
            ThreadError::Malformed(_) => AppError::Internal(anyhow::anyhow!(message)),
            ThreadError::Encoding(encoding_err) => {
                AppError::Internal(anyhow::Error::new(encoding_err))
            }
        }
    }
}

/// Raw root comments of a book's thread.
async fn get_roots(
    State(state): State<CommentsState>,
    Path(book_key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let roots = state.repo.roots(&book_key).await?;
    Ok(Json(roots))
}

/// The flattened render model for the current viewer.
async fn get_thread(
    State(state): State<CommentsState>,
    Path(book_key): Path<String>,
    CurrentUser(viewer): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let roots = state.repo.roots(&book_key).await?;
    let viewer_id = viewer.as_ref().map(|user| user.id.as_str());
    Ok(Json(render_thread(&roots, viewer_id, now_ms())))
}

/// Server-sent snapshots of the thread: the full root list on connect
/// and again after every change. Closing the connection unsubscribes.
async fn stream_thread(
    State(state): State<CommentsState>,
    Path(book_key): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let snapshots = state.repo.subscribe(&book_key)?;
    let events = snapshots.map(|roots| {
        let event = match serde_json::to_string(&roots) {
            Ok(data) => Event::default().event("snapshot").data(data),
            Err(err) => {
                tracing::warn!(%err, "dropping unencodable thread snapshot");
                Event::default().event("snapshot").data("[]")
            }
        };
        Ok::<_, Infallible>(event)
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Deserialize)]
struct PostCommentBody {
    text: String,
    #[serde(default)]
    parent_path: Vec<String>,
}

async fn post_comment(
    State(state): State<CommentsState>,
    Path(book_key): Path<String>,
    Authenticated(user): Authenticated,
    Json(body): Json<PostCommentBody>,
) -> Result<impl IntoResponse, AppError> {
    let draft = CommentDraft {
        text: body.text,
        author_id: user.id,
        author_name: user.display_name,
        author_avatar: user.avatar_url.unwrap_or_default(),
    };
    let comment = state
        .repo
        .add_comment(&book_key, draft, &body.parent_path)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(Debug, Deserialize)]
struct VoteBody {
    is_like: bool,
    #[serde(default)]
    parent_path: Vec<String>,
}

async fn post_vote(
    State(state): State<CommentsState>,
    Path((book_key, comment_id)): Path<(String, String)>,
    Authenticated(user): Authenticated,
    Json(body): Json<VoteBody>,
) -> Result<impl IntoResponse, AppError> {
    let kind = if body.is_like {
        VoteKind::Like
    } else {
        VoteKind::Dislike
    };
    let comment = state
        .repo
        .toggle_vote(&book_key, &comment_id, &user.id, kind, &body.parent_path)
        .await?;
    Ok(Json(comment))
}
