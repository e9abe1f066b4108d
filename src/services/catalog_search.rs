use crate::{
    error::{ApiError, Result},
    models::{Book, GenreParam},
    services::{CatalogFilter, FullTextSearch, InterestRecorder},
};
use tracing::{info, warn};
use uuid::Uuid;

/// What to do when the full-text index cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFailurePolicy {
    /// Return `IndexUnavailable` to the caller.
    Fail,
    /// Log and answer from the catalog as if no query had been given.
    SkipSearchFilter,
}

/// The search pipeline: record the query, look up candidates in the index,
/// then resolve them against the live catalog.
#[derive(Clone)]
pub struct CatalogSearch {
    recorder: InterestRecorder,
    full_text: FullTextSearch,
    filter: CatalogFilter,
    on_index_failure: IndexFailurePolicy,
}

impl CatalogSearch {
    pub fn new(
        recorder: InterestRecorder,
        full_text: FullTextSearch,
        filter: CatalogFilter,
        on_index_failure: IndexFailurePolicy,
    ) -> Self {
        Self {
            recorder,
            full_text,
            filter,
            on_index_failure,
        }
    }

    /// Search the catalog on behalf of `user_id`.
    ///
    /// A blank query applies no search filter and is not recorded, so the
    /// result is the plain genre listing.
    pub async fn search(
        &self,
        user_id: Uuid,
        query: &str,
        genre: GenreParam,
    ) -> Result<Vec<Book>> {
        let query = query.trim();
        if query.is_empty() {
            return self.filter.filter(None, genre).await;
        }

        self.recorder.record(user_id, query).await?;

        let candidates = match self.full_text.search(query).await {
            Ok(ids) => Some(ids),
            Err(ApiError::IndexUnavailable(reason))
                if self.on_index_failure == IndexFailurePolicy::SkipSearchFilter =>
            {
                warn!(
                    "Search index unavailable ({}), answering '{}' without the search filter",
                    reason, query
                );
                None
            }
            Err(e) => return Err(e),
        };

        let books = self.filter.filter(candidates.as_ref(), genre).await?;
        info!("Search '{}' returned {} books", query, books.len());
        Ok(books)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{CatalogStore, MemoryStore},
        models::{BookForm, BookId},
        services::search::{IndexedBook, MemoryIndex, SearchIndex, SearchQuery},
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    struct DownIndex;

    #[async_trait]
    impl SearchIndex for DownIndex {
        async fn query(&self, _query: &SearchQuery) -> Result<Vec<BookId>> {
            Err(ApiError::ExternalServiceError("timed out".to_string()))
        }

        async fn upsert(&self, _documents: &[IndexedBook]) -> Result<()> {
            Ok(())
        }

        async fn remove(&self, _id: BookId) -> Result<()> {
            Ok(())
        }
    }

    async fn seeded(
        index: Arc<dyn SearchIndex>,
        policy: IndexFailurePolicy,
    ) -> (CatalogSearch, Arc<MemoryStore>, Vec<Book>) {
        let store = Arc::new(MemoryStore::new());
        let scifi = store.insert_genre("SciFi").unwrap();
        let fantasy = store.insert_genre("Fantasy").unwrap();

        let full_text = FullTextSearch::new(index);
        let mut books = Vec::new();
        for (title, author, genre) in [
            ("Dune", "Frank Herbert", scifi.id),
            ("Dune Messiah", "Frank Herbert", scifi.id),
            ("A Wizard of Earthsea", "Ursula K. Le Guin", fantasy.id),
        ] {
            let form = BookForm {
                title: title.to_string(),
                author: author.to_string(),
                isbn: String::new(),
                genre_id: Some(genre),
                summary: String::new(),
                bio: String::new(),
            };
            let book = store.create_book(&form).await.unwrap();
            full_text.index_book(&book).await.unwrap();
            books.push(book);
        }

        let search = CatalogSearch::new(
            InterestRecorder::new(store.clone()),
            full_text,
            CatalogFilter::new(store.clone()),
            policy,
        );
        (search, store, books)
    }

    #[tokio::test]
    async fn test_query_is_recorded_even_without_matches() {
        let (search, store, _) =
            seeded(Arc::new(MemoryIndex::new()), IndexFailurePolicy::Fail).await;
        let user = Uuid::new_v4();

        let books = search.search(user, "vampires", GenreParam::Any).await.unwrap();
        assert!(books.is_empty());

        let interests = crate::db::InterestStore::interests_for(store.as_ref(), user)
            .await
            .unwrap();
        assert_eq!(interests.len(), 1);
        assert_eq!(interests[0].query, "vampires");
    }

    #[tokio::test]
    async fn test_blank_query_lists_genre_and_records_nothing() {
        let (search, store, books) =
            seeded(Arc::new(MemoryIndex::new()), IndexFailurePolicy::Fail).await;
        let user = Uuid::new_v4();
        let scifi = books[0].genre_id.unwrap();

        let found = search.search(user, "", GenreParam::Id(scifi)).await.unwrap();
        assert_eq!(found, books[..2].to_vec());

        let interests = crate::db::InterestStore::interests_for(store.as_ref(), user)
            .await
            .unwrap();
        assert!(interests.is_empty());
    }

    #[tokio::test]
    async fn test_search_then_genre() {
        let (search, _, books) =
            seeded(Arc::new(MemoryIndex::new()), IndexFailurePolicy::Fail).await;
        let user = Uuid::new_v4();

        let found = search.search(user, "herbert", GenreParam::Any).await.unwrap();
        assert_eq!(found, books[..2].to_vec());

        let fantasy = books[2].genre_id.unwrap();
        let found = search.search(user, "herbert", GenreParam::Id(fantasy)).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_stale_index_entries_are_dropped() {
        let (search, store, books) =
            seeded(Arc::new(MemoryIndex::new()), IndexFailurePolicy::Fail).await;
        store.delete_book(books[1].id).await.unwrap();

        let found = search
            .search(Uuid::new_v4(), "dune", GenreParam::Any)
            .await
            .unwrap();
        assert_eq!(found, vec![books[0].clone()]);
    }

    #[tokio::test]
    async fn test_index_failure_policy() {
        let (strict, _, _) = seeded(Arc::new(DownIndex), IndexFailurePolicy::Fail).await;
        let err = strict
            .search(Uuid::new_v4(), "dune", GenreParam::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::IndexUnavailable(_)));

        let (lenient, _, books) =
            seeded(Arc::new(DownIndex), IndexFailurePolicy::SkipSearchFilter).await;
        let found = lenient
            .search(Uuid::new_v4(), "dune", GenreParam::Any)
            .await
            .unwrap();
        assert_eq!(found, books);
    }
}
