pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use pawclub_kernel::{settings::Settings, InitCtx, Module};
use pawclub_store::PathStore;

use crate::session::RoleGate;
use repository::BookRepository;
use routes::BooksState;

/// Catalog module: book CRUD, paw ratings, downloads, and the list
/// views the site renders from.
pub struct BooksModule {
    state: BooksState,
    gate: RoleGate,
}

impl BooksModule {
    pub fn new(store: Arc<dyn PathStore>, settings: &Settings) -> Self {
        Self {
            state: BooksState {
                repo: BookRepository::new(store),
                page_size: settings.catalog.page_size,
                featured_count: settings.catalog.featured_count,
            },
            gate: RoleGate::from_settings(&settings.session),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            page_size = ctx.settings.catalog.page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone(), self.gate.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books, newest first, with optional search and paging",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "q", "in": "query", "schema": {"type": "string"}},
                            {"name": "page", "in": "query", "schema": {"type": "integer"}},
                            {"name": "per_page", "in": "query", "schema": {"type": "integer"}}
                        ],
                        "responses": {
                            "200": {"description": "Page of books with meta"}
                        }
                    }
                },
                "/page": {
                    "get": {
                        "summary": "Cursor pagination over creation time",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "after", "in": "query", "schema": {"type": "integer"}},
                            {"name": "size", "in": "query", "schema": {"type": "integer"}}
                        ],
                        "responses": {
                            "200": {"description": "Books plus next cursor"}
                        }
                    }
                },
                "/top": {
                    "get": {
                        "summary": "Best-rated books",
                        "tags": ["Books"],
                        "responses": {"200": {"description": "Books ordered by average rating"}}
                    }
                },
                "/{slug}": {
                    "get": {
                        "summary": "Fetch one book by slug",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "The book",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Book"}
                                    }
                                }
                            },
                            "404": {
                                "description": "Unknown slug",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                },
                "/{slug}/rating": {
                    "put": {
                        "summary": "Record the signed-in reader's paw rating (1-5)",
                        "tags": ["Books"],
                        "responses": {
                            "200": {"description": "Updated aggregate"},
                            "401": {"description": "Not signed in"},
                            "422": {"description": "Rating out of range"}
                        }
                    }
                },
                "/admin": {
                    "post": {
                        "summary": "Create a book (admin)",
                        "tags": ["Books"],
                        "responses": {
                            "201": {"description": "Created"},
                            "409": {"description": "Slug already taken"}
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "slug": {"type": "string", "description": "Immutable storage key derived from the title"},
                            "title": {"type": "string"},
                            "author": {"type": "string"},
                            "category": {"type": "string"},
                            "description": {"type": "string"},
                            "pubyear": {"type": "integer"},
                            "week": {"type": "string"},
                            "cover_image": {"type": "string"},
                            "created_at": {"type": "integer", "description": "Epoch milliseconds"},
                            "downloads": {"type": "object", "additionalProperties": {"$ref": "#/components/schemas/Download"}},
                            "ratings": {"type": "object", "additionalProperties": {"type": "integer"}}
                        },
                        "required": ["slug", "title", "author", "created_at"]
                    },
                    "Download": {
                        "type": "object",
                        "properties": {
                            "type": {"type": "string"},
                            "url": {"type": "string"}
                        },
                        "required": ["type", "url"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module.
pub fn create_module(store: Arc<dyn PathStore>, settings: &Settings) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store, settings))
}
