use crate::{
    db::{BookQuery, CatalogStore, InterestStore},
    error::{ApiError, Result},
    models::{Book, Genre, UserInterest},
    services::recommender::RecommendationSource,
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Genre name to live catalog books.
pub type BooksByGenre = BTreeMap<String, Vec<Book>>;

/// Turns external genre suggestions into genre buckets of live catalog books.
///
/// The suggested titles are not looked up; they only decide which genres are
/// shown. Each surfaced genre carries every current book of that genre.
#[derive(Clone)]
pub struct RecommendationService {
    source: Arc<dyn RecommendationSource>,
    catalog: Arc<dyn CatalogStore>,
    interests: Arc<dyn InterestStore>,
}

impl RecommendationService {
    pub fn new(
        source: Arc<dyn RecommendationSource>,
        catalog: Arc<dyn CatalogStore>,
        interests: Arc<dyn InterestStore>,
    ) -> Self {
        Self {
            source,
            catalog,
            interests,
        }
    }

    /// Recommendations for one user from their stored interests and genre preferences.
    pub async fn recommend_for(&self, user_id: Uuid) -> Result<BooksByGenre> {
        let interests = self.interests.interests_for(user_id).await?;
        let genres = self.interests.genre_preferences(user_id).await?;
        debug!(
            "Recommending for user {} from {} interests and {} genres",
            user_id,
            interests.len(),
            genres.len()
        );
        self.recommend(&interests, &genres).await
    }

    pub async fn recommend(
        &self,
        interests: &[UserInterest],
        genre_preferences: &[String],
    ) -> Result<BooksByGenre> {
        let suggestions = self
            .source
            .suggest(interests, genre_preferences)
            .await
            .map_err(|e| {
                error!("Recommendation source failed: {}", e);
                ApiError::RecommendationUnavailable(e.to_string())
            })?;

        if suggestions.is_empty() {
            return Ok(BooksByGenre::new());
        }

        let catalog_genres = self.catalog.list_genres().await?;
        let mut books_by_genre = BooksByGenre::new();

        for (suggested, titles) in &suggestions {
            let Some(genre) = resolve_genre(&catalog_genres, suggested) else {
                debug!("Suggested genre '{}' is not in the catalog", suggested);
                continue;
            };
            if books_by_genre.contains_key(&genre.name) {
                continue;
            }

            let books = self.catalog.list_books(&BookQuery::in_genre(genre.id)).await?;
            if books.is_empty() {
                debug!("Genre '{}' has no books, dropping it", genre.name);
                continue;
            }

            debug!(
                "Surfacing genre '{}' ({} suggested titles, {} books)",
                genre.name,
                titles.len(),
                books.len()
            );
            books_by_genre.insert(genre.name.clone(), books);
        }

        info!(
            "Recommendations cover {} of {} suggested genres",
            books_by_genre.len(),
            suggestions.len()
        );
        Ok(books_by_genre)
    }
}

/// Match a suggested genre name to a catalog genre, ignoring case and surrounding space.
fn resolve_genre<'a>(genres: &'a [Genre], name: &str) -> Option<&'a Genre> {
    let wanted = name.trim().to_lowercase();
    genres.iter().find(|g| g.name.trim().to_lowercase() == wanted)
}
