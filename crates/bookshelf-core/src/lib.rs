//! Core library for the bookshelf client.
//!
//! Implements the session flow of the book-catalog service client:
//!
//! - `auth`: cookie-style credential persistence and the in-memory
//!   session state container
//! - `api`: the REST client with bearer auth, error taxonomy, and
//!   paginated-response normalization
//! - `cache`: the tagged query-result cache backing the API layer
//! - `models`: data structures exchanged with the backend
//! - `config`: base URL and client settings

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, CredentialRecord, CredentialStore, Session, SessionState};
pub use cache::{QueryCache, Tag};
pub use config::Config;
