//! In-memory session state, mirrored into the credential store.
//!
//! The session is the authoritative view of authentication for a running
//! client; the credential store is the durable mirror that survives
//! restarts. Every mutation keeps the two giving the same answer to "is
//! this session authenticated" — any partial pair collapses to logged-out.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::credentials::{CredentialRecord, CredentialStore};
use crate::models::User;

/// Where a request token may come from, in lookup order.
///
/// The store fallback covers the window where a process has a persisted
/// token but `initialize_auth` has not run yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Session,
    Store,
}

/// Lookup order for resolving the request token.
pub const TOKEN_LOOKUP_ORDER: [TokenSource; 2] = [TokenSource::Session, TokenSource::Store];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credentials are incomplete: missing {0}")]
    IncompleteCredentials(&'static str),

    #[error("no authenticated user to update")]
    NotAuthenticated,

    #[error("invalid user snapshot: {0}")]
    InvalidSnapshot(#[from] serde_json::Error),
}

/// The observable session state.
///
/// Invariant: `is_authenticated` is exactly "token present AND user
/// present"; no operation leaves one set without the other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
}

/// Session container owning the credential store it mirrors into.
///
/// Constructed explicitly at bootstrap and passed where needed; a fresh
/// session starts logged-out until `initialize_auth` adopts whatever the
/// store holds.
pub struct Session {
    store: CredentialStore,
    state: SessionState,
}

impl Session {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated
    }

    /// Adopt a freshly issued token and user snapshot.
    ///
    /// An empty token or user is rejected before any mutation: a session
    /// must never claim authenticated without both halves. On success the
    /// pair is mirrored into the store; a mirror failure is logged but not
    /// propagated — in-memory state is authoritative while we run, and
    /// store divergence only matters across restarts.
    pub fn set_credentials(&mut self, user: User, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::IncompleteCredentials("token"));
        }
        if user.username.is_empty() {
            return Err(AuthError::IncompleteCredentials("user"));
        }

        self.state = SessionState {
            user: Some(user),
            token: Some(token.to_string()),
            is_authenticated: true,
        };

        let record = CredentialRecord {
            token: self.state.token.clone(),
            user: self.state.user.clone(),
        };
        if let Err(e) = self.store.write(&record) {
            warn!(error = %e, "Failed to mirror credentials to the store");
        }
        debug!(user = %record.user.as_ref().map(|u| u.username.as_str()).unwrap_or(""), "Session credentials set");
        Ok(())
    }

    /// Shallow-merge a partial profile into the current user snapshot and
    /// mirror the merged snapshot. The token is untouched.
    pub fn update_user(&mut self, patch: &Map<String, Value>) -> Result<(), AuthError> {
        let current = self.state.user.as_ref().ok_or(AuthError::NotAuthenticated)?;
        let merged = current.merged_with(patch)?;

        self.state.user = Some(merged.clone());
        if let Err(e) = self.store.store_user(&merged) {
            warn!(error = %e, "Failed to mirror updated user to the store");
        }
        debug!(user = %merged.username, "Session user updated");
        Ok(())
    }

    /// Clear user, token, and the authenticated flag in one transition,
    /// and wipe the store.
    pub fn logout(&mut self) {
        self.state = SessionState::default();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear the credential store");
        }
        debug!("Session cleared");
    }

    /// Seed the session from the credential store.
    ///
    /// Only a complete pair is adopted; a partial or corrupt record resets
    /// both the state and the store to logged-out. Idempotent: repeated
    /// calls against unchanged storage produce identical state.
    pub fn initialize_auth(&mut self) {
        let record = self.store.read();
        if record.is_authenticated() {
            debug!(
                user = %record.user.as_ref().map(|u| u.username.as_str()).unwrap_or(""),
                "Session initialized from stored credentials"
            );
            self.state = SessionState {
                user: record.user,
                token: record.token,
                is_authenticated: true,
            };
        } else {
            let had_partial = record.token.is_some() || record.user.is_some();
            self.state = SessionState::default();
            if had_partial {
                debug!("Stored credentials were partial, resetting to logged-out");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "Failed to clear partial credentials");
                }
            }
        }
    }

    /// Resolve the token to attach to an outgoing request, trying each
    /// source in `TOKEN_LOOKUP_ORDER`.
    pub fn resolve_token(&self) -> Option<String> {
        for source in TOKEN_LOOKUP_ORDER {
            if let Some(token) = self.token_from(source) {
                return Some(token);
            }
        }
        None
    }

    fn token_from(&self, source: TokenSource) -> Option<String> {
        match source {
            TokenSource::Session => self.state.token.clone(),
            TokenSource::Store => self.store.read().token,
        }
    }
}
