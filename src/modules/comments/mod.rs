pub mod models;
pub mod repository;
pub mod routes;
pub mod tree;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use pawclub_kernel::{InitCtx, Module};
use pawclub_store::PathStore;

use repository::CommentRepository;
use routes::CommentsState;

/// Nested comment threads: one per book, arbitrarily deep replies,
/// per-user like/dislike toggles, and live snapshot streaming.
pub struct CommentsModule {
    state: CommentsState,
}

impl CommentsModule {
    pub fn new(store: Arc<dyn PathStore>) -> Self {
        Self {
            state: CommentsState {
                repo: CommentRepository::new(store),
            },
        }
    }
}

#[async_trait]
impl Module for CommentsModule {
    fn name(&self) -> &'static str {
        "comments"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "comments module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/{book_key}": {
                    "get": {
                        "summary": "Root comments of a book's thread",
                        "tags": ["Comments"],
                        "responses": {"200": {"description": "Root comments in insertion order"}}
                    },
                    "post": {
                        "summary": "Post a comment or reply (signed-in members)",
                        "tags": ["Comments"],
                        "responses": {
                            "201": {"description": "The stored comment"},
                            "401": {"description": "Not signed in"},
                            "422": {"description": "Empty text"}
                        }
                    }
                },
                "/{book_key}/thread": {
                    "get": {
                        "summary": "Flattened render model for the current viewer",
                        "tags": ["Comments"],
                        "responses": {"200": {"description": "Depth-annotated comment views"}}
                    }
                },
                "/{book_key}/stream": {
                    "get": {
                        "summary": "Live thread snapshots over server-sent events",
                        "tags": ["Comments"],
                        "responses": {"200": {"description": "SSE stream of full snapshots"}}
                    }
                },
                "/{book_key}/{comment_id}/vote": {
                    "post": {
                        "summary": "Toggle the viewer's like or dislike",
                        "tags": ["Comments"],
                        "responses": {
                            "200": {"description": "The comment after the toggle"},
                            "404": {"description": "Unknown comment"}
                        }
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "comments module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "comments module stopped");
        Ok(())
    }
}

/// Create a new instance of the comments module.
pub fn create_module(store: Arc<dyn PathStore>) -> Arc<dyn Module> {
    Arc::new(CommentsModule::new(store))
}
