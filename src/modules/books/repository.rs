use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use pawclub_store::{path, PathStore, StoreError};

use super::models::{Book, BookDraft, BookPatch, Download, RatingStats};
use crate::utils::{now_ms, slugify};

const BOOKS_ROOT: &str = "books";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),

    #[error("book {0:?} not found")]
    NotFound(String),

    #[error("a book with slug {0:?} already exists")]
    SlugTaken(String),

    #[error("title {0:?} does not yield a usable slug")]
    UnusableTitle(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("stored book record is malformed")]
    Encoding(#[from] serde_json::Error),
}

/// One cursor page of the catalog, ordered by creation time ascending.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BookPage {
    pub books: Vec<Book>,
    /// `created_at` of the last record; feed back as the next cursor.
    /// Absent when this page exhausted the catalog.
    pub next_cursor: Option<i64>,
}

/// Catalog CRUD over the path store.
#[derive(Clone)]
pub struct BookRepository {
    store: Arc<dyn PathStore>,
}

impl BookRepository {
    pub fn new(store: Arc<dyn PathStore>) -> Self {
        Self { store }
    }

    fn book_path(slug: &str) -> Result<String, StoreError> {
        path::join(BOOKS_ROOT, slug)
    }

    /// Create a book keyed by the slug derived from its title.
    /// Creation never overwrites: an occupied slug is a conflict.
    pub async fn create(&self, draft: BookDraft) -> Result<Book, CatalogError> {
        let slug = slugify(&draft.title);
        if slug.is_empty() {
            return Err(CatalogError::UnusableTitle(draft.title));
        }
        let book_path = Self::book_path(&slug)?;
        if self.store.get(&book_path).await?.is_some() {
            return Err(CatalogError::SlugTaken(slug));
        }

        let book = Book {
            slug,
            title: draft.title,
            author: draft.author,
            category: draft.category,
            description: draft.description,
            pubyear: draft.pubyear,
            week: draft.week,
            cover_image: draft.cover_image,
            created_at: draft.created_at.unwrap_or_else(now_ms),
            downloads: Default::default(),
            ratings: Default::default(),
        };
        self.store
            .set(&book_path, serde_json::to_value(&book)?)
            .await?;
        Ok(book)
    }

    pub async fn get(&self, slug: &str) -> Result<Option<Book>, CatalogError> {
        match self.store.get(&Self::book_path(slug)?).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Full catalog, newest first. The store's range read is
    /// ascending-only, so the descending view is produced here.
    pub async fn list(&self) -> Result<Vec<Book>, CatalogError> {
        let mut books = match self.store.get(BOOKS_ROOT).await? {
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(_, value)| serde_json::from_value(value))
                .collect::<Result<Vec<Book>, _>>()?,
            _ => Vec::new(),
        };
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(books)
    }

    /// The `count` most recently added books.
    pub async fn latest(&self, count: usize) -> Result<Vec<Book>, CatalogError> {
        let mut books = self.list().await?;
        books.truncate(count);
        Ok(books)
    }

    /// Books ordered by average rating, best first; vote count breaks
    /// ties so a 5.0 from ten readers beats a 5.0 from one.
    pub async fn top_rated(&self, count: usize) -> Result<Vec<Book>, CatalogError> {
        let mut books = self.list().await?;
        books.sort_by(|a, b| {
            let sa = a.rating_stats();
            let sb = b.rating_stats();
            sb.average
                .total_cmp(&sa.average)
                .then_with(|| sb.votes.cmp(&sa.votes))
        });
        books.truncate(count);
        Ok(books)
    }

    /// Merge present patch fields into an existing book. The slug is the
    /// key; the patch type has no way to name it.
    pub async fn update(&self, slug: &str, patch: &BookPatch) -> Result<(), CatalogError> {
        let book_path = Self::book_path(slug)?;
        if self.store.get(&book_path).await?.is_none() {
            return Err(CatalogError::NotFound(slug.to_string()));
        }
        let fields = match serde_json::to_value(patch)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        if fields.is_empty() {
            return Ok(());
        }
        self.store.merge(&book_path, fields).await?;
        Ok(())
    }

    /// Hard delete; there is no tombstone and no undo.
    pub async fn delete(&self, slug: &str) -> Result<(), CatalogError> {
        let book_path = Self::book_path(slug)?;
        if self.store.get(&book_path).await?.is_none() {
            return Err(CatalogError::NotFound(slug.to_string()));
        }
        self.store.delete(&book_path).await?;
        Ok(())
    }

    /// Cursor pagination over creation time: at most `size` records
    /// strictly after `after`, plus the cursor for the following page.
    pub async fn page(
        &self,
        after: Option<i64>,
        size: usize,
    ) -> Result<BookPage, CatalogError> {
        let entries = self
            .store
            .query_range(
                BOOKS_ROOT,
                "created_at",
                after.map(|cursor| cursor as f64),
                Some(size),
            )
            .await?;
        let books = entries
            .into_iter()
            .map(|(_, value)| serde_json::from_value(value))
            .collect::<Result<Vec<Book>, _>>()?;
        let next_cursor = if books.len() == size {
            books.last().map(|book| book.created_at)
        } else {
            None
        };
        Ok(BookPage { books, next_cursor })
    }

    /// Record one user's paw rating. Validates before any write.
    pub async fn set_rating(
        &self,
        slug: &str,
        user_id: &str,
        rating: u8,
    ) -> Result<(), CatalogError> {
        if !(1..=5).contains(&rating) {
            return Err(CatalogError::RatingOutOfRange(rating));
        }
        let book_path = Self::book_path(slug)?;
        if self.store.get(&book_path).await?.is_none() {
            return Err(CatalogError::NotFound(slug.to_string()));
        }
        let rating_path = path::join(&path::join(&book_path, "ratings")?, user_id)?;
        self.store.set(&rating_path, Value::from(rating)).await?;
        Ok(())
    }

    /// Aggregate rating for a book. An absent book or empty map reads as
    /// zero votes rather than an error, mirroring the empty-state UI.
    pub async fn rating_stats(&self, slug: &str) -> Result<RatingStats, CatalogError> {
        let ratings_path = path::join(&Self::book_path(slug)?, "ratings")?;
        let ratings = match self.store.get(&ratings_path).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Default::default(),
        };
        Ok(RatingStats::of(&ratings))
    }

    /// Attach a downloadable resource; returns the generated id.
    pub async fn add_download(
        &self,
        slug: &str,
        resource: Download,
    ) -> Result<String, CatalogError> {
        let book_path = Self::book_path(slug)?;
        if self.store.get(&book_path).await?.is_none() {
            return Err(CatalogError::NotFound(slug.to_string()));
        }
        let resource_id = format!("dl_{}", Uuid::now_v7().simple());
        let resource_path = path::join(&path::join(&book_path, "downloads")?, &resource_id)?;
        self.store
            .set(&resource_path, serde_json::to_value(&resource)?)
            .await?;
        Ok(resource_id)
    }

    pub async fn remove_download(
        &self,
        slug: &str,
        resource_id: &str,
    ) -> Result<(), CatalogError> {
        let book_path = Self::book_path(slug)?;
        if self.store.get(&book_path).await?.is_none() {
            return Err(CatalogError::NotFound(slug.to_string()));
        }
        let resource_path = path::join(&path::join(&book_path, "downloads")?, resource_id)?;
        self.store.delete(&resource_path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawclub_store::MemoryStore;

    fn repo() -> BookRepository {
        BookRepository::new(Arc::new(MemoryStore::new()))
    }

    fn draft(title: &str, created_at: i64) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: "Frank Herbert".into(),
            category: "Science fiction".into(),
            description: "Sand.".into(),
            pubyear: 1965,
            week: "Week 12".into(),
            cover_image: "https://img.example/dune.png".into(),
            created_at: Some(created_at),
        }
    }

    #[tokio::test]
    async fn create_derives_slug_and_roundtrips() {
        let repo = repo();
        let book = repo.create(draft("Dune Messiah", 100)).await.unwrap();
        assert_eq!(book.slug, "dune-messiah");

        let loaded = repo.get("dune-messiah").await.unwrap().unwrap();
        assert_eq!(loaded.title, "Dune Messiah");
        assert_eq!(loaded.created_at, 100);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let repo = repo();
        repo.create(draft("Dune", 100)).await.unwrap();
        let err = repo.create(draft("Dune", 200)).await.unwrap_err();
        assert!(matches!(err, CatalogError::SlugTaken(slug) if slug == "dune"));
    }

    #[tokio::test]
    async fn unusable_title_is_rejected() {
        let repo = repo();
        let err = repo.create(draft("???", 100)).await.unwrap_err();
        assert!(matches!(err, CatalogError::UnusableTitle(_)));
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let repo = repo();
        repo.create(draft("First", 100)).await.unwrap();
        repo.create(draft("Second", 300)).await.unwrap();
        repo.create(draft("Third", 200)).await.unwrap();

        let books = repo.list().await.unwrap();
        let stamps: Vec<i64> = books.iter().map(|b| b.created_at).collect();
        assert_eq!(stamps, vec![300, 200, 100]);
    }

    #[tokio::test]
    async fn delete_removes_from_list_and_get() {
        let repo = repo();
        repo.create(draft("Dune", 100)).await.unwrap();
        repo.create(draft("Hyperion", 200)).await.unwrap();

        repo.delete("dune").await.unwrap();

        assert!(repo.get("dune").await.unwrap().is_none());
        let books = repo.list().await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].slug, "hyperion");

        let err = repo.delete("dune").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_merges_without_touching_other_fields() {
        let repo = repo();
        repo.create(draft("Dune", 100)).await.unwrap();

        let patch = BookPatch {
            week: Some("Week 13".into()),
            ..BookPatch::default()
        };
        repo.update("dune", &patch).await.unwrap();

        let book = repo.get("dune").await.unwrap().unwrap();
        assert_eq!(book.week, "Week 13");
        assert_eq!(book.author, "Frank Herbert");
        assert_eq!(book.created_at, 100);
    }

    #[tokio::test]
    async fn page_walks_the_catalog_in_creation_order() {
        let repo = repo();
        for (title, stamp) in [("A", 100), ("B", 300), ("C", 200), ("D", 400)] {
            repo.create(draft(title, stamp)).await.unwrap();
        }

        let first = repo.page(None, 2).await.unwrap();
        let stamps: Vec<i64> = first.books.iter().map(|b| b.created_at).collect();
        assert_eq!(stamps, vec![100, 200]);
        assert_eq!(first.next_cursor, Some(200));

        let second = repo.page(first.next_cursor, 2).await.unwrap();
        let stamps: Vec<i64> = second.books.iter().map(|b| b.created_at).collect();
        assert_eq!(stamps, vec![300, 400]);

        let third = repo.page(Some(400), 2).await.unwrap();
        assert!(third.books.is_empty());
        assert_eq!(third.next_cursor, None);
    }

    #[tokio::test]
    async fn rating_validation_rejects_out_of_range_without_writing() {
        let repo = repo();
        repo.create(draft("Dune", 100)).await.unwrap();

        for bad in [0u8, 6, 200] {
            let err = repo.set_rating("dune", "u1", bad).await.unwrap_err();
            assert!(matches!(err, CatalogError::RatingOutOfRange(r) if r == bad));
        }
        assert_eq!(repo.rating_stats("dune").await.unwrap().votes, 0);
    }

    #[tokio::test]
    async fn ratings_aggregate_to_sum_over_count() {
        let repo = repo();
        repo.create(draft("Dune", 100)).await.unwrap();
        for (user, rating) in [("u1", 5u8), ("u2", 3), ("u3", 4)] {
            repo.set_rating("dune", user, rating).await.unwrap();
        }

        let stats = repo.rating_stats("dune").await.unwrap();
        assert_eq!(stats.votes, 3);
        assert!((stats.average - 4.0).abs() < f64::EPSILON);

        // Re-voting replaces, not appends.
        repo.set_rating("dune", "u1", 1).await.unwrap();
        let stats = repo.rating_stats("dune").await.unwrap();
        assert_eq!(stats.votes, 3);
        assert_eq!(stats.total, 8);
    }

    #[tokio::test]
    async fn rating_stats_of_unknown_book_are_empty() {
        let repo = repo();
        assert_eq!(repo.rating_stats("ghost").await.unwrap().votes, 0);
    }

    #[tokio::test]
    async fn top_rated_orders_by_average_then_votes() {
        let repo = repo();
        repo.create(draft("Solid", 100)).await.unwrap();
        repo.create(draft("Beloved", 200)).await.unwrap();
        repo.create(draft("Unrated", 300)).await.unwrap();

        repo.set_rating("solid", "u1", 4).await.unwrap();
        repo.set_rating("beloved", "u1", 5).await.unwrap();
        repo.set_rating("beloved", "u2", 5).await.unwrap();

        let top = repo.top_rated(2).await.unwrap();
        let slugs: Vec<&str> = top.iter().map(|b| b.slug.as_str()).collect();
        assert_eq!(slugs, vec!["beloved", "solid"]);
    }

    #[tokio::test]
    async fn downloads_attach_and_detach() {
        let repo = repo();
        repo.create(draft("Dune", 100)).await.unwrap();

        let resource = Download {
            kind: "epub".into(),
            url: "https://files.example/dune.epub".into(),
        };
        let id = repo.add_download("dune", resource.clone()).await.unwrap();

        let book = repo.get("dune").await.unwrap().unwrap();
        assert_eq!(book.downloads.get(&id), Some(&resource));

        repo.remove_download("dune", &id).await.unwrap();
        let book = repo.get("dune").await.unwrap().unwrap();
        assert!(book.downloads.is_empty());
    }
}
