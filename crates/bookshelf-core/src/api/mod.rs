//! REST API client module for the book-catalog service.
//!
//! This module provides the `ApiClient` for the auth, catalog, and
//! favorites endpoints. Requests carry a bearer token resolved through
//! the session's lookup chain, and list responses are normalized to the
//! canonical page shape by `transform`.

pub mod client;
pub mod error;
pub mod transform;

pub use client::ApiClient;
pub use error::ApiError;
pub use transform::normalize_page;
