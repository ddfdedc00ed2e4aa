//! Flattened render model of a comment thread.
//!
//! UI-independent: each node carries everything a comment card shows
//! (author, relative age, vote counts, the viewer's own vote) plus the
//! ancestor path a reply form needs to hand back to `add_comment`.
//! The walk is an explicit stack, not recursion, so a pathological
//! reply chain cannot exhaust the call stack.

use serde::Serialize;

use super::models::{Comment, VoteKind};
use crate::utils::relative_time;

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: String,
    /// Ancestor comment ids, root first; a reply to this node submits
    /// with `parent_path = path + [id]`.
    pub path: Vec<String>,
    pub depth: usize,
    pub author_name: String,
    pub author_avatar: String,
    pub text: String,
    pub created_at: i64,
    /// Relative age at render time: "3 days ago".
    pub posted: String,
    pub likes: usize,
    pub dislikes: usize,
    /// The viewer's own standing vote, for control highlighting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_vote: Option<VoteKind>,
    /// Reply and vote actions are gated on being signed in; a signed-out
    /// viewer gets a login prompt instead.
    pub can_reply: bool,
    pub can_vote: bool,
}

/// Depth-first flattening of the thread, children in insertion order.
/// `viewer` is the signed-in user id, if any.
pub fn render_thread(roots: &[Comment], viewer: Option<&str>, now_ms: i64) -> Vec<CommentView> {
    let mut views = Vec::new();
    let mut stack: Vec<(&Comment, usize, Vec<String>)> = roots
        .iter()
        .rev()
        .map(|comment| (comment, 0, Vec::new()))
        .collect();

    while let Some((comment, depth, path)) = stack.pop() {
        views.push(view_of(comment, depth, &path, viewer, now_ms));

        if comment.comments.is_empty() {
            continue;
        }
        let mut child_path = path;
        child_path.push(comment.id.clone());
        for child in comment.comments.values().rev() {
            stack.push((child, depth + 1, child_path.clone()));
        }
    }

    views
}

fn view_of(
    comment: &Comment,
    depth: usize,
    path: &[String],
    viewer: Option<&str>,
    now_ms: i64,
) -> CommentView {
    let viewer_vote = viewer.and_then(|user_id| {
        if comment.likes.contains(user_id) {
            Some(VoteKind::Like)
        } else if comment.dislikes.contains(user_id) {
            Some(VoteKind::Dislike)
        } else {
            None
        }
    });
    let signed_in = viewer.is_some();

    CommentView {
        id: comment.id.clone(),
        path: path.to_vec(),
        depth,
        author_name: comment.author_name.clone(),
        author_avatar: comment.author_avatar.clone(),
        text: comment.text.clone(),
        created_at: comment.created_at,
        posted: relative_time(comment.created_at, now_ms),
        likes: comment.likes.len(),
        dislikes: comment.dislikes.len(),
        viewer_vote,
        can_reply: signed_in,
        can_vote: signed_in,
    }
}
