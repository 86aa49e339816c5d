//! Authentication module for managing the session and its durable mirror.
//!
//! This module provides:
//! - `CredentialStore`: cookie-style persistence for the token and user snapshot
//! - `Session`: the in-memory state container with its mutation actions
//!
//! The session is seeded from the store at bootstrap and mirrors every
//! mutation back into it; stored entries expire after 7 days.

pub mod credentials;
pub mod session;

pub use credentials::{CredentialRecord, CredentialStore, SameSite};
pub use session::{AuthError, Session, SessionState, TokenSource, TOKEN_LOOKUP_ORDER};
