use crate::{
    db::{BookQuery, CatalogStore},
    error::Result,
    models::{Book, BookId, GenreParam},
};
use std::{collections::HashSet, sync::Arc};
use tracing::debug;

/// Narrows the live catalog by candidate ids and genre.
///
/// A genre that does not exist yields an empty list, never an error.
#[derive(Clone)]
pub struct CatalogFilter {
    store: Arc<dyn CatalogStore>,
}

impl CatalogFilter {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Books in `candidates` (all books when `None`) that belong to `genre`,
    /// in primary-key order.
    pub async fn filter(
        &self,
        candidates: Option<&HashSet<BookId>>,
        genre: GenreParam,
    ) -> Result<Vec<Book>> {
        self.select(candidates, genre, false).await
    }

    /// Catalog browsing: optional genre, optionally only books with an audiobook.
    pub async fn list(&self, genre: GenreParam, audiobook_only: bool) -> Result<Vec<Book>> {
        self.select(None, genre, audiobook_only).await
    }

    async fn select(
        &self,
        candidates: Option<&HashSet<BookId>>,
        genre: GenreParam,
        has_audiobook: bool,
    ) -> Result<Vec<Book>> {
        let genre_id = match genre {
            GenreParam::Any => None,
            GenreParam::Unknown => return Ok(Vec::new()),
            GenreParam::Id(id) => match self.store.find_genre(id).await? {
                Some(genre) => Some(genre.id),
                None => {
                    debug!("Genre {} does not exist, filtering to nothing", id);
                    return Ok(Vec::new());
                }
            },
        };

        if candidates.map_or(false, |ids| ids.is_empty()) {
            return Ok(Vec::new());
        }

        let query = BookQuery {
            ids: candidates.map(|ids| {
                let mut ids: Vec<BookId> = ids.iter().copied().collect();
                ids.sort_unstable();
                ids
            }),
            genre_id,
            has_audiobook,
        };
        self.store.list_books(&query).await
    }
}
