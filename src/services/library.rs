use crate::{
    db::{CatalogStore, LibraryStore},
    error::{ApiError, Result},
    models::{Book, BookId, GenreParam, LibraryResponse, RecentlyViewed},
    services::CatalogFilter,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// A user's personal shelf: saved books and what they have looked at.
#[derive(Clone)]
pub struct LibraryService {
    catalog: Arc<dyn CatalogStore>,
    store: Arc<dyn LibraryStore>,
    filter: CatalogFilter,
}

impl LibraryService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        store: Arc<dyn LibraryStore>,
        filter: CatalogFilter,
    ) -> Self {
        Self {
            catalog,
            store,
            filter,
        }
    }

    pub async fn save(&self, user_id: Uuid, book_id: BookId) -> Result<()> {
        self.require_book(book_id).await?;
        self.store.save_book(user_id, book_id).await?;
        info!("User {} saved book {}", user_id, book_id);
        Ok(())
    }

    /// Removing a book that was never saved is not an error.
    pub async fn unsave(&self, user_id: Uuid, book_id: BookId) -> Result<()> {
        self.require_book(book_id).await?;
        if self.store.unsave_book(user_id, book_id).await? {
            info!("User {} unsaved book {}", user_id, book_id);
        }
        Ok(())
    }

    pub async fn read_books(
        &self,
        user_id: Uuid,
        genre: GenreParam,
    ) -> Result<Vec<RecentlyViewed>> {
        let genre_id = match genre {
            GenreParam::Any => None,
            GenreParam::Id(id) => Some(id),
            GenreParam::Unknown => return Ok(Vec::new()),
        };
        self.store.recently_viewed(user_id, genre_id).await
    }

    pub async fn summaries(&self, genre: GenreParam) -> Result<Vec<Book>> {
        self.filter.filter(None, genre).await
    }

    pub async fn library(&self, user_id: Uuid) -> Result<LibraryResponse> {
        Ok(LibraryResponse {
            recently_viewed: self.store.recently_viewed(user_id, None).await?,
            saved_books: self.store.saved_books(user_id).await?,
        })
    }

    async fn require_book(&self, book_id: BookId) -> Result<()> {
        match self.catalog.find_book(book_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(format!("Book {} not found", book_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::MemoryStore, models::BookForm};

    async fn fixture() -> (LibraryService, Arc<MemoryStore>, Vec<Book>) {
        let store = Arc::new(MemoryStore::new());
        let scifi = store.insert_genre("SciFi").unwrap();
        let drama = store.insert_genre("Drama").unwrap();

        let mut books = Vec::new();
        for (title, genre) in [("Dune", scifi.id), ("Hamlet", drama.id)] {
            let form = BookForm {
                title: title.to_string(),
                author: String::new(),
                isbn: String::new(),
                genre_id: Some(genre),
                summary: format!("About {}", title),
                bio: String::new(),
            };
            books.push(store.create_book(&form).await.unwrap());
        }

        let service = LibraryService::new(
            store.clone(),
            store.clone(),
            CatalogFilter::new(store.clone()),
        );
        (service, store, books)
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let (library, _, books) = fixture().await;
        let user = Uuid::new_v4();

        library.save(user, books[0].id).await.unwrap();
        library.save(user, books[0].id).await.unwrap();

        let shelf = library.library(user).await.unwrap();
        assert_eq!(shelf.saved_books.len(), 1);
        assert_eq!(shelf.saved_books[0].book, books[0]);

        library.unsave(user, books[0].id).await.unwrap();
        library.unsave(user, books[0].id).await.unwrap();
        assert!(library.library(user).await.unwrap().saved_books.is_empty());
    }

    #[tokio::test]
    async fn test_save_missing_book() {
        let (library, _, _) = fixture().await;
        let err = library.save(Uuid::new_v4(), 404).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_books_by_genre() {
        let (library, store, books) = fixture().await;
        let user = Uuid::new_v4();
        for book in &books {
            store.record_view(user, book.id).await.unwrap();
        }

        let all = library.read_books(user, GenreParam::Any).await.unwrap();
        assert_eq!(all.len(), 2);

        let drama = books[1].genre_id.unwrap();
        let read = library.read_books(user, GenreParam::Id(drama)).await.unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].book.title, "Hamlet");

        assert!(library
            .read_books(user, GenreParam::Unknown)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_summaries() {
        let (library, _, books) = fixture().await;
        let scifi = books[0].genre_id.unwrap();

        assert_eq!(library.summaries(GenreParam::Any).await.unwrap(), books);
        assert_eq!(
            library.summaries(GenreParam::Id(scifi)).await.unwrap(),
            vec![books[0].clone()]
        );
    }
}
