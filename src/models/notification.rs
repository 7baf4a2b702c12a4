// src/models/notification.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'notifications' table in the database.
/// Delivery is pull-only: rows are read back over the API, nothing is
/// pushed out of the system.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub is_read: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
