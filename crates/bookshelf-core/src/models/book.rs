use serde::{Deserialize, Serialize};

/// A catalog entry as the scraping backend serializes it.
///
/// Most fields are nullable server-side, so everything beyond the core
/// identity is optional. Timestamps are kept as the ISO strings the server
/// sends; nothing in the client does date arithmetic on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub genre: Option<i64>,
    #[serde(default)]
    pub genre_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub rating: i32,
    #[serde(default)]
    pub rating_display: Option<String>,
    #[serde(default)]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub last_scraped: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Book {
    /// Star rating for display, matching the server's `rating_display`
    pub fn rating_stars(&self) -> String {
        let filled = self.rating.clamp(0, 5) as usize;
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }

    pub fn display_genre(&self) -> String {
        self.genre_name.clone().unwrap_or_else(|| "Unknown".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Genre {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub books_count: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Search filters for the catalog listing endpoint.
///
/// Empty filters are omitted from the query string entirely; the backend
/// treats an empty `title=` differently from no title at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookQuery {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl BookQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(title) = self.title.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("title", title.to_string()));
        }
        if let Some(genre) = self.genre.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("genre", genre.to_string()));
        }
        if let Some(year) = self.from_year {
            pairs.push(("fromYear", year.to_string()));
        }
        if let Some(year) = self.to_year {
            pairs.push(("toYear", year.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}
