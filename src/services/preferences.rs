use crate::{
    db::{CatalogStore, InterestStore},
    error::{ApiError, Result},
    models::GenreId,
};
use std::{collections::BTreeSet, sync::Arc};
use tracing::info;
use uuid::Uuid;

/// The genres a user declared interest in. Each selection replaces the last.
#[derive(Clone)]
pub struct GenrePreferences {
    catalog: Arc<dyn CatalogStore>,
    store: Arc<dyn InterestStore>,
}

impl GenrePreferences {
    pub fn new(catalog: Arc<dyn CatalogStore>, store: Arc<dyn InterestStore>) -> Self {
        Self { catalog, store }
    }

    /// Replace the user's preference set with the genres named by `genre_ids`.
    ///
    /// Every id must name an existing genre; nothing is written otherwise.
    pub async fn select_genres(
        &self,
        user_id: Uuid,
        genre_ids: &[GenreId],
    ) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for id in genre_ids {
            let genre = self
                .catalog
                .find_genre(*id)
                .await?
                .ok_or_else(|| ApiError::InvalidInput(format!("Unknown genre id {}", id)))?;
            names.insert(genre.name);
        }

        let names: Vec<String> = names.into_iter().collect();
        self.store.replace_genre_preferences(user_id, &names).await?;
        info!("User {} selected {} genres", user_id, names.len());
        Ok(names)
    }

    /// Current preference set, sorted by name.
    pub async fn preferences(&self, user_id: Uuid) -> Result<Vec<String>> {
        self.store.genre_preferences(user_id).await
    }
}
