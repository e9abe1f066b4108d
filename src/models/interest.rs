use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One recorded search submission. Rows are only ever inserted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserInterest {
    pub id: i64,
    pub user_id: Uuid,
    pub query: String,
    pub created_at: DateTime<Utc>,
}
