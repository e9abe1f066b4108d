//! Persistence seams for the catalog.
//!
//! Services only see these traits. `PgStore` is the production backend and
//! `MemoryStore` backs the test suites and local runs without a database.

use crate::{
    error::Result,
    models::{
        Audiobook, Book, BookForm, BookId, Genre, GenreId, RecentlyViewed, Review, SavedBook,
        UserInterest,
    },
};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Constraints applied when listing books. All present constraints must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub ids: Option<Vec<BookId>>,
    pub genre_id: Option<GenreId>,
    pub has_audiobook: bool,
}

impl BookQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_genre(genre_id: GenreId) -> Self {
        Self {
            genre_id: Some(genre_id),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_genres(&self) -> Result<Vec<Genre>>;

    async fn find_genre(&self, id: GenreId) -> Result<Option<Genre>>;

    /// Books matching `query`, in primary-key order.
    async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>>;

    async fn find_book(&self, id: BookId) -> Result<Option<Book>>;

    async fn create_book(&self, form: &BookForm) -> Result<Book>;

    /// Returns `None` when the book does not exist.
    async fn update_book(&self, id: BookId, form: &BookForm) -> Result<Option<Book>>;

    /// Returns whether a row was deleted.
    async fn delete_book(&self, id: BookId) -> Result<bool>;

    async fn audiobooks_for(&self, book_id: BookId) -> Result<Vec<Audiobook>>;

    async fn moderated_reviews(&self, book_id: BookId) -> Result<Vec<Review>>;
}

#[async_trait]
pub trait InterestStore: Send + Sync {
    async fn insert_interest(&self, user_id: Uuid, query: &str) -> Result<UserInterest>;

    /// Interests of one user, oldest first.
    async fn interests_for(&self, user_id: Uuid) -> Result<Vec<UserInterest>>;

    async fn genre_preferences(&self, user_id: Uuid) -> Result<Vec<String>>;

    /// Atomically swap the user's preference set for `genre_names`.
    async fn replace_genre_preferences(&self, user_id: Uuid, genre_names: &[String])
        -> Result<()>;
}

#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Get-or-create; saving twice keeps a single entry.
    async fn save_book(&self, user_id: Uuid, book_id: BookId) -> Result<()>;

    async fn unsave_book(&self, user_id: Uuid, book_id: BookId) -> Result<bool>;

    async fn is_saved(&self, user_id: Uuid, book_id: BookId) -> Result<bool>;

    async fn saved_books(&self, user_id: Uuid) -> Result<Vec<SavedBook>>;

    /// Get-or-create; the first view timestamp is kept.
    async fn record_view(&self, user_id: Uuid, book_id: BookId) -> Result<()>;

    async fn recently_viewed(
        &self,
        user_id: Uuid,
        genre_id: Option<GenreId>,
    ) -> Result<Vec<RecentlyViewed>>;
}
