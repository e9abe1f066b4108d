use super::{BookQuery, CatalogStore, InterestStore, LibraryStore};
use crate::{
    error::{ApiError, Result},
    models::{
        Audiobook, Book, BookForm, BookId, Genre, GenreId, RecentlyViewed, Review, SavedBook,
        UserInterest,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::BTreeMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    genres: BTreeMap<GenreId, Genre>,
    books: BTreeMap<BookId, Book>,
    audiobooks: Vec<Audiobook>,
    reviews: Vec<Review>,
    interests: Vec<UserInterest>,
    preferences: Vec<(Uuid, String)>,
    saved: Vec<(Uuid, BookId, DateTime<Utc>)>,
    viewed: Vec<(Uuid, BookId, DateTime<Utc>)>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn genre_name(&self, genre_id: Option<GenreId>) -> Option<String> {
        genre_id.and_then(|id| self.genres.get(&id).map(|g| g.name.clone()))
    }

    fn book_from_form(&self, id: BookId, form: &BookForm) -> Book {
        Book {
            id,
            title: form.title.clone(),
            author: form.author.clone(),
            isbn: form.isbn.clone(),
            genre_id: form.genre_id,
            genre_name: self.genre_name(form.genre_id),
            summary: form.summary.clone(),
            bio: form.bio.clone(),
        }
    }
}

/// Process-local store with the same semantics as the Postgres schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| ApiError::InternalError("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| ApiError::InternalError("memory store lock poisoned".to_string()))
    }

    pub fn insert_genre(&self, name: &str) -> Result<Genre> {
        let mut state = self.write()?;
        let genre = Genre {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    pub fn add_audiobook(
        &self,
        book_id: BookId,
        narrator: &str,
        audio_url: &str,
    ) -> Result<Audiobook> {
        let mut state = self.write()?;
        let audiobook = Audiobook {
            id: state.next_id(),
            book_id,
            narrator: narrator.to_string(),
            audio_url: audio_url.to_string(),
        };
        state.audiobooks.push(audiobook.clone());
        Ok(audiobook)
    }

    pub fn add_review(
        &self,
        book_id: BookId,
        user_id: Uuid,
        rating: i16,
        content: &str,
        is_moderated: bool,
    ) -> Result<Review> {
        let mut state = self.write()?;
        let review = Review {
            id: state.next_id(),
            book_id,
            user_id,
            rating,
            content: content.to_string(),
            is_moderated,
            created_at: Utc::now(),
        };
        state.reviews.push(review.clone());
        Ok(review)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_genres(&self) -> Result<Vec<Genre>> {
        Ok(self.read()?.genres.values().cloned().collect())
    }

    async fn find_genre(&self, id: GenreId) -> Result<Option<Genre>> {
        Ok(self.read()?.genres.get(&id).cloned())
    }

    async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let state = self.read()?;
        let books = state
            .books
            .values()
            .filter(|book| {
                query
                    .ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&book.id))
            })
            .filter(|book| query.genre_id.map_or(true, |g| book.genre_id == Some(g)))
            .filter(|book| {
                !query.has_audiobook || state.audiobooks.iter().any(|a| a.book_id == book.id)
            })
            .cloned()
            .collect();
        Ok(books)
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>> {
        Ok(self.read()?.books.get(&id).cloned())
    }

    async fn create_book(&self, form: &BookForm) -> Result<Book> {
        let mut state = self.write()?;
        let id = state.next_id();
        let book = state.book_from_form(id, form);
        state.books.insert(id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: BookId, form: &BookForm) -> Result<Option<Book>> {
        let mut state = self.write()?;
        if !state.books.contains_key(&id) {
            return Ok(None);
        }
        let book = state.book_from_form(id, form);
        state.books.insert(id, book.clone());
        Ok(Some(book))
    }

    async fn delete_book(&self, id: BookId) -> Result<bool> {
        let mut state = self.write()?;
        let removed = state.books.remove(&id).is_some();
        if removed {
            state.audiobooks.retain(|a| a.book_id != id);
            state.reviews.retain(|r| r.book_id != id);
            state.saved.retain(|(_, book_id, _)| *book_id != id);
            state.viewed.retain(|(_, book_id, _)| *book_id != id);
        }
        Ok(removed)
    }

    async fn audiobooks_for(&self, book_id: BookId) -> Result<Vec<Audiobook>> {
        Ok(self
            .read()?
            .audiobooks
            .iter()
            .filter(|a| a.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn moderated_reviews(&self, book_id: BookId) -> Result<Vec<Review>> {
        Ok(self
            .read()?
            .reviews
            .iter()
            .filter(|r| r.book_id == book_id && r.is_moderated)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl InterestStore for MemoryStore {
    async fn insert_interest(&self, user_id: Uuid, query: &str) -> Result<UserInterest> {
        let mut state = self.write()?;
        let interest = UserInterest {
            id: state.next_id(),
            user_id,
            query: query.to_string(),
            created_at: Utc::now(),
        };
        state.interests.push(interest.clone());
        Ok(interest)
    }

    async fn interests_for(&self, user_id: Uuid) -> Result<Vec<UserInterest>> {
        Ok(self
            .read()?
            .interests
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn genre_preferences(&self, user_id: Uuid) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .read()?
            .preferences
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn replace_genre_preferences(
        &self,
        user_id: Uuid,
        genre_names: &[String],
    ) -> Result<()> {
        let mut state = self.write()?;
        state.preferences.retain(|(user, _)| *user != user_id);
        state
            .preferences
            .extend(genre_names.iter().map(|name| (user_id, name.clone())));
        Ok(())
    }
}

#[async_trait]
impl LibraryStore for MemoryStore {
    async fn save_book(&self, user_id: Uuid, book_id: BookId) -> Result<()> {
        let mut state = self.write()?;
        if !state
            .saved
            .iter()
            .any(|(user, book, _)| *user == user_id && *book == book_id)
        {
            state.saved.push((user_id, book_id, Utc::now()));
        }
        Ok(())
    }

    async fn unsave_book(&self, user_id: Uuid, book_id: BookId) -> Result<bool> {
        let mut state = self.write()?;
        let before = state.saved.len();
        state
            .saved
            .retain(|(user, book, _)| !(*user == user_id && *book == book_id));
        Ok(state.saved.len() != before)
    }

    async fn is_saved(&self, user_id: Uuid, book_id: BookId) -> Result<bool> {
        Ok(self
            .read()?
            .saved
            .iter()
            .any(|(user, book, _)| *user == user_id && *book == book_id))
    }

    async fn saved_books(&self, user_id: Uuid) -> Result<Vec<SavedBook>> {
        let state = self.read()?;
        Ok(state
            .saved
            .iter()
            .filter(|(user, _, _)| *user == user_id)
            .filter_map(|(user, book_id, saved_at)| {
                state.books.get(book_id).map(|book| SavedBook {
                    user_id: *user,
                    book: book.clone(),
                    saved_at: *saved_at,
                })
            })
            .collect())
    }

    async fn record_view(&self, user_id: Uuid, book_id: BookId) -> Result<()> {
        let mut state = self.write()?;
        if !state
            .viewed
            .iter()
            .any(|(user, book, _)| *user == user_id && *book == book_id)
        {
            state.viewed.push((user_id, book_id, Utc::now()));
        }
        Ok(())
    }

    async fn recently_viewed(
        &self,
        user_id: Uuid,
        genre_id: Option<GenreId>,
    ) -> Result<Vec<RecentlyViewed>> {
        let state = self.read()?;
        Ok(state
            .viewed
            .iter()
            .filter(|(user, _, _)| *user == user_id)
            .filter_map(|(user, book_id, viewed_at)| {
                state.books.get(book_id).map(|book| RecentlyViewed {
                    user_id: *user,
                    book: book.clone(),
                    viewed_at: *viewed_at,
                })
            })
            .filter(|entry| genre_id.map_or(true, |g| entry.book.genre_id == Some(g)))
            .collect())
    }
}
