use crate::{
    db::InterestStore,
    error::{ApiError, Result},
    models::UserInterest,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Append-only log of what each user searched for.
#[derive(Clone)]
pub struct InterestRecorder {
    store: Arc<dyn InterestStore>,
}

impl InterestRecorder {
    pub fn new(store: Arc<dyn InterestStore>) -> Self {
        Self { store }
    }

    /// Store one interest record. Every call adds a row, duplicates included.
    pub async fn record(&self, user_id: Uuid, query: &str) -> Result<UserInterest> {
        if query.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "Blank queries are not recorded".to_string(),
            ));
        }

        let interest = self.store.insert_interest(user_id, query).await?;
        debug!("Recorded interest {} for user {}", interest.id, user_id);
        Ok(interest)
    }

    /// All interests of a user, oldest first.
    pub async fn history(&self, user_id: Uuid) -> Result<Vec<UserInterest>> {
        self.store.interests_for(user_id).await
    }
}
