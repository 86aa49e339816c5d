use serde::{Deserialize, Serialize};

/// Page number assumed when the caller did not ask for one
pub const DEFAULT_PAGE: u32 = 1;

/// Page size assumed when the caller did not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Canonical shape for paginated list responses.
///
/// The backend answers list requests in several shapes depending on the
/// endpoint and its pagination settings; the API layer normalizes all of
/// them to this one (see `api::transform`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
