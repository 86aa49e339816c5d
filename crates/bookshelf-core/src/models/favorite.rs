use serde::{Deserialize, Serialize};

use super::Book;

/// A book the authenticated user has favorited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Favorite {
    pub id: i64,
    pub book: Book,
    #[serde(default)]
    pub created_at: Option<String>,
}
