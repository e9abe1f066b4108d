use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Book;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedBook {
    pub user_id: Uuid,
    pub book: Book,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentlyViewed {
    pub user_id: Uuid,
    pub book: Book,
    pub viewed_at: DateTime<Utc>,
}
