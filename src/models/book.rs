use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

pub type BookId = i64;
pub type GenreId = i64;

/// Accepts `12`, `"12"`, `""` and `null` so HTML-form style payloads work unchanged.
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        String(String),
        Int(i64),
        Null,
    }

    match StringOrInt::deserialize(deserializer)? {
        StringOrInt::String(s) => {
            if s.trim().is_empty() {
                Ok(None)
            } else {
                i64::from_str(s.trim())
                    .map(Some)
                    .map_err(serde::de::Error::custom)
            }
        }
        StringOrInt::Int(i) => Ok(Some(i)),
        StringOrInt::Null => Ok(None),
    }
}

/// A present `genre_id` key, even `null` or `""`, becomes `Some(_)`; only an
/// absent key stays `None` through `#[serde(default)]`.
fn deserialize_genre_change<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_id(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

/// A catalog entry with its genre name joined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub genre_id: Option<GenreId>,
    pub genre_name: Option<String>,
    pub summary: String,
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Audiobook {
    pub id: i64,
    pub book_id: BookId,
    pub narrator: String,
    pub audio_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i64,
    pub book_id: BookId,
    pub user_id: Uuid,
    pub rating: i16,
    pub content: String,
    pub is_moderated: bool,
    pub created_at: DateTime<Utc>,
}

/// Full set of editable book fields, used for create and replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookForm {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub genre_id: Option<GenreId>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub bio: String,
}

/// Partial update; absent fields are left untouched. An explicit `null` or
/// empty `genre_id` clears the genre.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    #[serde(default, deserialize_with = "deserialize_genre_change")]
    pub genre_id: Option<Option<GenreId>>,
    pub summary: Option<String>,
    pub bio: Option<String>,
}

impl BookPatch {
    /// Apply the patch on top of the current values of `book`.
    pub fn merge_into(self, book: &Book) -> BookForm {
        BookForm {
            title: self.title.unwrap_or_else(|| book.title.clone()),
            author: self.author.unwrap_or_else(|| book.author.clone()),
            isbn: self.isbn.unwrap_or_else(|| book.isbn.clone()),
            genre_id: self.genre_id.unwrap_or(book.genre_id),
            summary: self.summary.unwrap_or_else(|| book.summary.clone()),
            bio: self.bio.unwrap_or_else(|| book.bio.clone()),
        }
    }
}
