use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use book::{Audiobook, Book, BookForm, BookId, BookPatch, Genre, GenreId, Review};
pub use interest::UserInterest;
pub use library::{RecentlyViewed, SavedBook};

mod book;
mod interest;
mod library;

/// Genre filter as it arrives from a query string.
///
/// Anything that is not an integer can never match a genre, so it is kept as
/// `Unknown` and filtered to an empty result rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreParam {
    Any,
    Id(GenreId),
    Unknown,
}

impl GenreParam {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => GenreParam::Any,
            Some(value) => value
                .parse::<GenreId>()
                .map(GenreParam::Id)
                .unwrap_or(GenreParam::Unknown),
        }
    }
}

/// Query string for the search endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub genre: Option<String>,
}

/// Query string for catalog browsing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowseParams {
    pub genre: Option<String>,
    pub has_audiobook: Option<String>,
}

impl BrowseParams {
    /// Checkbox semantics: `on`, `true` and `1` enable the filter.
    pub fn audiobook_only(&self) -> bool {
        matches!(
            self.has_audiobook.as_deref().map(str::trim),
            Some("on") | Some("true") | Some("1")
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenreFilterParams {
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailParams {
    pub narrator: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioRequest {
    pub voice: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenreSelection {
    pub genres: Vec<GenreId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub books: Vec<Book>,
    pub genres: Vec<Genre>,
    pub selected_genre: Option<String>,
    pub search_query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub books_by_genre: BTreeMap<String, Vec<Book>>,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookListResponse {
    pub books: Vec<Book>,
    pub genres: Vec<Genre>,
    pub selected_genre: Option<String>,
    pub has_audiobook: bool,
}

/// Everything the detail page shows for one book.
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    pub book: Book,
    pub reviews: Vec<Review>,
    pub audiobooks: Vec<Audiobook>,
    pub narrators: Vec<String>,
    pub selected_narrator: Option<String>,
    pub filtered_audiobooks: Vec<Audiobook>,
    pub is_saved: bool,
    pub audio_file_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryResponse {
    pub recently_viewed: Vec<RecentlyViewed>,
    pub saved_books: Vec<SavedBook>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioResponse {
    pub audio_file_url: String,
    pub voice: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_param_parsing() {
        assert_eq!(GenreParam::parse(None), GenreParam::Any);
        assert_eq!(GenreParam::parse(Some("")), GenreParam::Any);
        assert_eq!(GenreParam::parse(Some(" 4 ")), GenreParam::Id(4));
        assert_eq!(GenreParam::parse(Some("fantasy")), GenreParam::Unknown);
    }

    #[test]
    fn test_audiobook_checkbox() {
        let params = BrowseParams {
            genre: None,
            has_audiobook: Some("on".to_string()),
        };
        assert!(params.audiobook_only());

        let params = BrowseParams {
            genre: None,
            has_audiobook: Some("off".to_string()),
        };
        assert!(!params.audiobook_only());
        assert!(!BrowseParams::default().audiobook_only());
    }
}
