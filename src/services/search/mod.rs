//! Full-text search over the catalog.
//!
//! `FullTextSearch` is the adapter the rest of the service talks to. The
//! actual index lives behind [`SearchIndex`], either an Elasticsearch-compatible
//! server or the in-process [`MemoryIndex`].

use crate::{
    error::{ApiError, Result},
    models::{Book, BookId},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, error};

pub mod elastic;
pub mod memory;
pub mod query;

pub use elastic::ElasticIndex;
pub use memory::MemoryIndex;
pub use query::{MatchOp, Predicate, SearchField, SearchQuery};

/// The document stored in the index for one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedBook {
    pub id: BookId,
    pub title: String,
    pub isbn: String,
    pub author: String,
    pub genre: String,
    pub summary: String,
    pub bio: String,
}

impl IndexedBook {
    pub fn field(&self, field: SearchField) -> &str {
        match field {
            SearchField::Title => &self.title,
            SearchField::Isbn => &self.isbn,
            SearchField::Author => &self.author,
            SearchField::Genre => &self.genre,
            SearchField::Summary => &self.summary,
            SearchField::Bio => &self.bio,
        }
    }
}

impl From<&Book> for IndexedBook {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            isbn: book.isbn.clone(),
            author: book.author.clone(),
            genre: book.genre_name.clone().unwrap_or_default(),
            summary: book.summary.clone(),
            bio: book.bio.clone(),
        }
    }
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Ids of all documents matching `query`. Order is unspecified.
    async fn query(&self, query: &SearchQuery) -> Result<Vec<BookId>>;

    async fn upsert(&self, documents: &[IndexedBook]) -> Result<()>;

    async fn remove(&self, id: BookId) -> Result<()>;
}

#[derive(Clone)]
pub struct FullTextSearch {
    index: Arc<dyn SearchIndex>,
}

impl FullTextSearch {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }

    /// Ids of books whose text fields contain `query`.
    ///
    /// A blank query returns an empty set without touching the index; callers
    /// must read that as "no search filter", not "nothing matched".
    pub async fn search(&self, query: &str) -> Result<HashSet<BookId>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(HashSet::new());
        }

        let ids = self
            .index
            .query(&SearchQuery::catalog_text(query))
            .await
            .map_err(|e| {
                error!("Search index query failed: {}", e);
                ApiError::IndexUnavailable(e.to_string())
            })?;

        debug!("Index returned {} candidates for '{}'", ids.len(), query);
        Ok(ids.into_iter().collect())
    }

    pub async fn index_book(&self, book: &Book) -> Result<()> {
        self.index_books(std::slice::from_ref(book)).await
    }

    pub async fn index_books(&self, books: &[Book]) -> Result<()> {
        let documents: Vec<IndexedBook> = books.iter().map(IndexedBook::from).collect();
        self.index
            .upsert(&documents)
            .await
            .map_err(|e| ApiError::IndexUnavailable(e.to_string()))
    }

    pub async fn remove_book(&self, id: BookId) -> Result<()> {
        self.index
            .remove(id)
            .await
            .map_err(|e| ApiError::IndexUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and always fails, standing in for an unreachable server.
    #[derive(Default)]
    struct DownIndex {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SearchIndex for DownIndex {
        async fn query(&self, _query: &SearchQuery) -> Result<Vec<BookId>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::ExternalServiceError("connection refused".to_string()))
        }

        async fn upsert(&self, _documents: &[IndexedBook]) -> Result<()> {
            Err(ApiError::ExternalServiceError("connection refused".to_string()))
        }

        async fn remove(&self, _id: BookId) -> Result<()> {
            Err(ApiError::ExternalServiceError("connection refused".to_string()))
        }
    }

    fn book(id: BookId, title: &str, genre: Option<&str>) -> Book {
        Book {
            id,
            title: title.to_string(),
            author: "Anon".to_string(),
            isbn: format!("isbn-{}", id),
            genre_id: None,
            genre_name: genre.map(str::to_string),
            summary: String::new(),
            bio: String::new(),
        }
    }

    #[tokio::test]
    async fn test_blank_query_skips_index() {
        let index = Arc::new(DownIndex::default());
        let search = FullTextSearch::new(index.clone());

        assert!(search.search("").await.unwrap().is_empty());
        assert!(search.search("   ").await.unwrap().is_empty());
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_is_index_unavailable() {
        let search = FullTextSearch::new(Arc::new(DownIndex::default()));

        let err = search.search("dune").await.unwrap_err();
        assert!(matches!(err, ApiError::IndexUnavailable(_)));

        let err = search.index_book(&book(1, "Dune", None)).await.unwrap_err();
        assert!(matches!(err, ApiError::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn test_search_matches_genre_name() {
        let search = FullTextSearch::new(Arc::new(MemoryIndex::new()));
        search
            .index_books(&[
                book(1, "Dune", Some("SciFi")),
                book(2, "The Hobbit", Some("Fantasy")),
            ])
            .await
            .unwrap();

        let ids = search.search("scifi").await.unwrap();
        assert_eq!(ids, HashSet::from([1]));

        let ids = search.search("isbn-").await.unwrap();
        assert_eq!(ids, HashSet::from([1, 2]));
    }
}
