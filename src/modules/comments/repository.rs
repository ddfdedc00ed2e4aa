use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use pawclub_store::{path, PathStore, StoreError};

use super::models::{Comment, CommentDraft, VoteKind};
use crate::utils::now_ms;

const COMMENTS_ROOT: &str = "comments";

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("comment text must not be empty")]
    EmptyText,

    #[error("comment {0:?} not found")]
    UnknownComment(String),

    #[error("comment record at {0:?} is malformed")]
    Malformed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Encoding(#[from] serde_json::Error),
}

/// Build the storage path of a comment: the book's thread root, one
/// `/{ancestor}/comments` hop per ancestor id, then the comment id.
pub fn comment_path(
    book_key: &str,
    parent_path: &[String],
    comment_id: &str,
) -> Result<String, StoreError> {
    let mut full = path::join(COMMENTS_ROOT, book_key)?;
    for ancestor in parent_path {
        full = path::join(&path::join(&full, ancestor)?, "comments")?;
    }
    path::join(&full, comment_id)
}

fn thread_path(book_key: &str) -> Result<String, StoreError> {
    path::join(COMMENTS_ROOT, book_key)
}

fn generate_comment_id() -> String {
    format!("comment_{}", Uuid::now_v7().simple())
}

fn parse_roots(snapshot: Option<Value>) -> Vec<Comment> {
    let Some(Value::Object(map)) = snapshot else {
        return Vec::new();
    };
    map.into_iter()
        .filter_map(|(id, value)| match serde_json::from_value(value) {
            Ok(comment) => Some(comment),
            Err(err) => {
                tracing::warn!(comment = %id, %err, "skipping malformed comment record");
                None
            }
        })
        .collect()
}

/// Nested comment threads over the path store.
#[derive(Clone)]
pub struct CommentRepository {
    store: Arc<dyn PathStore>,
}

impl CommentRepository {
    pub fn new(store: Arc<dyn PathStore>) -> Self {
        Self { store }
    }

    /// Current root comments of a book, in insertion order.
    pub async fn roots(&self, book_key: &str) -> Result<Vec<Comment>, ThreadError> {
        let snapshot = self.store.get(&thread_path(book_key)?).await?;
        Ok(parse_roots(snapshot))
    }

    /// Live snapshots of a book's root comments: the current state
    /// immediately, then the full new state after every change anywhere
    /// in the thread. Dropping the stream unsubscribes.
    pub fn subscribe(
        &self,
        book_key: &str,
    ) -> Result<impl Stream<Item = Vec<Comment>> + Send + 'static, ThreadError> {
        let snapshots = self.store.watch(&thread_path(book_key)?)?;
        Ok(snapshots.map(parse_roots))
    }

    /// Post a comment (empty `parent_path`) or a reply (ancestor ids,
    /// root first). The record is merge-written so siblings under the
    /// same parent are never clobbered. Returns the stored comment.
    pub async fn add_comment(
        &self,
        book_key: &str,
        draft: CommentDraft,
        parent_path: &[String],
    ) -> Result<Comment, ThreadError> {
        if draft.text.trim().is_empty() {
            return Err(ThreadError::EmptyText);
        }

        let comment = Comment {
            id: generate_comment_id(),
            text: draft.text,
            author_id: draft.author_id,
            author_name: draft.author_name,
            author_avatar: draft.author_avatar,
            created_at: now_ms(),
            likes: Default::default(),
            dislikes: Default::default(),
            comments: Default::default(),
        };

        let full_path = comment_path(book_key, parent_path, &comment.id)?;
        let fields = match serde_json::to_value(&comment)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        self.store.merge(&full_path, fields).await?;
        Ok(comment)
    }

    /// Toggle the viewer's like or dislike on a comment.
    ///
    /// A user holds at most one of {like, dislike}: voting one way
    /// clears the other, and repeating a vote withdraws it. The whole
    /// read-modify-write runs inside one store transaction, so two
    /// concurrent voters cannot drop each other's vote.
    pub async fn toggle_vote(
        &self,
        book_key: &str,
        comment_id: &str,
        user_id: &str,
        kind: VoteKind,
        parent_path: &[String],
    ) -> Result<Comment, ThreadError> {
        let full_path = comment_path(book_key, parent_path, comment_id)?;
        let mut malformed = false;

        let stored = self
            .store
            .transact(&full_path, &mut |current| {
                let value = current?;
                let mut comment: Comment = match serde_json::from_value(value.clone()) {
                    Ok(comment) => comment,
                    Err(_) => {
                        malformed = true;
                        return Some(value);
                    }
                };
                apply_vote(&mut comment, user_id, kind);
                match serde_json::to_value(&comment) {
                    Ok(next) => Some(next),
                    Err(_) => {
                        malformed = true;
                        Some(value)
                    }
                }
            })
            .await?;

        if malformed {
            return Err(ThreadError::Malformed(full_path));
        }
        let value = stored.ok_or_else(|| ThreadError::UnknownComment(comment_id.to_string()))?;
        Ok(serde_json::from_value(value)?)
    }
}

fn apply_vote(comment: &mut Comment, user_id: &str, kind: VoteKind) {
    let (chosen, opposite) = match kind {
        VoteKind::Like => (&mut comment.likes, &mut comment.dislikes),
        VoteKind::Dislike => (&mut comment.dislikes, &mut comment.likes),
    };
    opposite.remove(user_id);
    if !chosen.remove(user_id) {
        chosen.insert(user_id);
    }
}
