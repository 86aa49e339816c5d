//! Tagged in-memory cache for API query results.
//!
//! Queries store their result under a key together with the cache tags
//! they provide; mutations invalidate tags so the next read refetches
//! instead of serving a pre-mutation value.

pub mod manager;

pub use manager::{QueryCache, Tag};
