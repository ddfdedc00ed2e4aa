use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use pawclub_http::AppError;

use super::models::{BookDraft, BookPatch, Download};
use super::repository::{BookRepository, CatalogError};
use crate::session::{require_roles, Authenticated, RoleGate};
use crate::utils::{matches_needle, paginate};

#[derive(Clone)]
pub struct BooksState {
    pub repo: BookRepository,
    pub page_size: usize,
    pub featured_count: usize,
}

/// Public catalog routes plus the role-gated admin subtree, mirroring
/// the admin panel of the UI under `/admin`.
pub fn router(state: BooksState, gate: RoleGate) -> Router {
    let admin = Router::new()
        .route("/", post(create_book))
        .route("/{slug}", patch(update_book).delete(delete_book))
        .route("/{slug}/downloads", post(add_download))
        .route("/{slug}/downloads/{resource_id}", delete(remove_download))
        .layer(from_fn_with_state(gate, require_roles));

    Router::new()
        .route("/", get(list_books))
        .route("/page", get(page_books))
        .route("/latest", get(latest_books))
        .route("/top", get(top_books))
        .route("/{slug}", get(get_book))
        .route("/{slug}/rating", get(get_rating).put(put_rating))
        .nest("/admin", admin)
        .with_state(state)
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::RatingOutOfRange(rating) => AppError::validation(
                vec![json!({"field": "rating", "error": "out_of_range", "got": rating})],
                message,
            ),
            CatalogError::UnusableTitle(_) => AppError::validation(
                vec![json!({"field": "title", "error": "unusable"})],
                message,
            ),
            CatalogError::NotFound(_) => AppError::not_found(message),
            CatalogError::SlugTaken(slug) => AppError::conflict(
                vec![json!({"field": "slug", "error": "taken", "slug": slug})],
                message,
            ),
            CatalogError::Store(store_err) => match store_err {
                pawclub_store::StoreError::InvalidPath(_) => {
                    AppError::bad_request(store_err.to_string())
                }
                other => AppError::Internal(anyhow::Error::new(other)),
            },
            CatalogError::Encoding(encoding_err) => {
                AppError::Internal(anyhow::Error::new(encoding_err))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    q: Option<String>,
    page: Option<usize>,
    per_page: Option<usize>,
}

/// Full-fetch list view with in-memory search and slicing. Fine for a
/// catalog of tens to low hundreds of books; the cursor endpoint below
/// is the scalable path.
async fn list_books(
    State(state): State<BooksState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut books = state.repo.list().await?;
    if let Some(needle) = query.q.as_deref() {
        books.retain(|book| {
            matches_needle(&[&book.title, &book.author, &book.category], needle)
        });
    }
    let (page, meta) = paginate(
        &books,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(state.page_size),
    );
    Ok(Json(json!({ "meta": meta, "books": page })))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    after: Option<i64>,
    size: Option<usize>,
}

async fn page_books(
    State(state): State<BooksState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .repo
        .page(query.after, query.size.unwrap_or(state.page_size))
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
struct CountQuery {
    count: Option<usize>,
}

async fn latest_books(
    State(state): State<BooksState>,
    Query(query): Query<CountQuery>,
) -> Result<impl IntoResponse, AppError> {
    let books = state
        .repo
        .latest(query.count.unwrap_or(state.featured_count))
        .await?;
    Ok(Json(books))
}

async fn top_books(
    State(state): State<BooksState>,
    Query(query): Query<CountQuery>,
) -> Result<impl IntoResponse, AppError> {
    let books = state
        .repo
        .top_rated(query.count.unwrap_or(state.featured_count))
        .await?;
    Ok(Json(books))
}

async fn get_book(
    State(state): State<BooksState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    match state.repo.get(&slug).await? {
        Some(book) => Ok(Json(book)),
        None => Err(AppError::not_found(format!("book {slug:?} not found"))),
    }
}

async fn create_book(
    State(state): State<BooksState>,
    Json(draft): Json<BookDraft>,
) -> Result<impl IntoResponse, AppError> {
    let book = state.repo.create(draft).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(state): State<BooksState>,
    Path(slug): Path<String>,
    Json(patch): Json<BookPatch>,
) -> Result<impl IntoResponse, AppError> {
    state.repo.update(&slug, &patch).await?;
    match state.repo.get(&slug).await? {
        Some(book) => Ok(Json(book)),
        None => Err(AppError::not_found(format!("book {slug:?} not found"))),
    }
}

async fn delete_book(
    State(state): State<BooksState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.repo.delete(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_rating(
    State(state): State<BooksState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.repo.rating_stats(&slug).await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
struct RatingBody {
    rating: u8,
}

async fn put_rating(
    State(state): State<BooksState>,
    Path(slug): Path<String>,
    Authenticated(user): Authenticated,
    Json(body): Json<RatingBody>,
) -> Result<impl IntoResponse, AppError> {
    state.repo.set_rating(&slug, &user.id, body.rating).await?;
    let stats = state.repo.rating_stats(&slug).await?;
    Ok(Json(stats))
}

async fn add_download(
    State(state): State<BooksState>,
    Path(slug): Path<String>,
    Json(resource): Json<Download>,
) -> Result<impl IntoResponse, AppError> {
    let resource_id = state.repo.add_download(&slug, resource).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": resource_id }))))
}

async fn remove_download(
    State(state): State<BooksState>,
    Path((slug, resource_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    state.repo.remove_download(&slug, &resource_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
