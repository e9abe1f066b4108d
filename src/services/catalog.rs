use crate::{
    db::{CatalogStore, LibraryStore},
    error::{ApiError, Result},
    models::{Book, BookDetail, BookForm, BookId, BookPatch, Genre, GenreId},
    services::{FullTextSearch, SpeechService},
};
use std::{collections::BTreeSet, sync::Arc};
use tracing::{info, warn};
use uuid::Uuid;

/// Catalog management and the book detail view.
///
/// Writes go to the store first; the search index follows on a best-effort
/// basis and a failed index update only logs.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    library: Arc<dyn LibraryStore>,
    full_text: FullTextSearch,
    speech: SpeechService,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        library: Arc<dyn LibraryStore>,
        full_text: FullTextSearch,
        speech: SpeechService,
    ) -> Self {
        Self {
            store,
            library,
            full_text,
            speech,
        }
    }

    pub async fn list_genres(&self) -> Result<Vec<Genre>> {
        self.store.list_genres().await
    }

    pub async fn get_book(&self, id: BookId) -> Result<Book> {
        self.store
            .find_book(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Book {} not found", id)))
    }

    /// Everything shown for one book. Viewing while signed in adds the book to
    /// the user's recently viewed list.
    pub async fn book_detail(
        &self,
        id: BookId,
        user_id: Option<Uuid>,
        narrator: Option<&str>,
    ) -> Result<BookDetail> {
        let book = self.get_book(id).await?;
        let reviews = self.store.moderated_reviews(id).await?;
        let audiobooks = self.store.audiobooks_for(id).await?;

        let narrators: Vec<String> = audiobooks
            .iter()
            .map(|a| a.narrator.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let selected_narrator = narrator
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let filtered_audiobooks = match &selected_narrator {
            Some(name) => audiobooks
                .iter()
                .filter(|a| &a.narrator == name)
                .cloned()
                .collect(),
            None => audiobooks.clone(),
        };

        let is_saved = match user_id {
            Some(user_id) => {
                self.library.record_view(user_id, id).await?;
                self.library.is_saved(user_id, id).await?
            }
            None => false,
        };

        let audio_file_url = if book.summary.trim().is_empty() {
            None
        } else {
            match self.speech.summary_audio(&book).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Summary audio for book {} unavailable: {}", id, e);
                    None
                }
            }
        };

        Ok(BookDetail {
            book,
            reviews,
            audiobooks,
            narrators,
            selected_narrator,
            filtered_audiobooks,
            is_saved,
            audio_file_url,
        })
    }

    pub async fn create_book(&self, form: BookForm) -> Result<Book> {
        let form = self.validate(form).await?;
        let book = self.store.create_book(&form).await?;
        info!("Created book {} '{}'", book.id, book.title);

        self.sync_index(&book).await;
        Ok(book)
    }

    pub async fn update_book(&self, id: BookId, form: BookForm) -> Result<Book> {
        let form = self.validate(form).await?;
        let book = self
            .store
            .update_book(id, &form)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Book {} not found", id)))?;
        info!("Updated book {}", id);

        self.sync_index(&book).await;
        Ok(book)
    }

    pub async fn patch_book(&self, id: BookId, patch: BookPatch) -> Result<Book> {
        let current = self.get_book(id).await?;
        self.update_book(id, patch.merge_into(&current)).await
    }

    pub async fn delete_book(&self, id: BookId) -> Result<()> {
        if !self.store.delete_book(id).await? {
            return Err(ApiError::NotFound(format!("Book {} not found", id)));
        }
        info!("Deleted book {}", id);

        if let Err(e) = self.full_text.remove_book(id).await {
            warn!("Book {} deleted but still in the search index: {}", id, e);
        }
        Ok(())
    }

    async fn validate(&self, mut form: BookForm) -> Result<BookForm> {
        form.title = form.title.trim().to_string();
        if form.title.is_empty() {
            return Err(ApiError::InvalidInput("Title is required".to_string()));
        }
        if let Some(genre_id) = form.genre_id {
            self.require_genre(genre_id).await?;
        }
        Ok(form)
    }

    async fn require_genre(&self, genre_id: GenreId) -> Result<Genre> {
        self.store
            .find_genre(genre_id)
            .await?
            .ok_or_else(|| ApiError::InvalidInput(format!("Unknown genre id {}", genre_id)))
    }

    async fn sync_index(&self, book: &Book) {
        if let Err(e) = self.full_text.index_book(book).await {
            warn!("Book {} saved but not indexed: {}", book.id, e);
        }
    }
}
