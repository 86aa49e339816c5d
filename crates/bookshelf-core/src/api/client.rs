//! HTTP client for the book-catalog service.
//!
//! Every request resolves its bearer token through the session's lookup
//! chain (in-memory state first, credential store as the fallback) and
//! runs through the tagged response cache: queries store their result
//! under the tags they provide, mutations invalidate tags.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::transform::normalize_page;
use super::ApiError;
use crate::auth::Session;
use crate::cache::{QueryCache, Tag};
use crate::models::{
    Book, BookQuery, Favorite, LoginRequest, LoginResponse, Page, RegisterRequest,
    ResetPasswordRequest, User,
};

/// HTTP request timeout in seconds.
/// A transport-level safeguard only; nothing cancels requests early.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Cache key for the profile query
const PROFILE_CACHE_KEY: &str = "profile";

/// Cache key for the favorites query
const FAVORITES_CACHE_KEY: &str = "favorites";

/// API client for the catalog service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<RwLock<Session>>,
    cache: Arc<QueryCache>,
}

impl ApiClient {
    /// Create a client against `base_url`, reading tokens from `session`.
    pub fn new(
        base_url: impl Into<String>,
        session: Arc<RwLock<Session>>,
    ) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            cache: Arc::new(QueryCache::new()),
        })
    }

    /// Drop all cached responses.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn bearer_token(&self) -> Option<String> {
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());
        session.resolve_token()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(token) = self.bearer_token() {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Check if a response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::check_response(req.send().await?).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn send_unit(req: RequestBuilder) -> Result<(), ApiError> {
        Self::check_response(req.send().await?).await?;
        Ok(())
    }

    // ===== Auth =====

    /// Log in and obtain a token plus user snapshot. The cached profile is
    /// invalidated so the next read refetches.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, ApiError> {
        debug!(username = %credentials.username, "Logging in");
        let resp: LoginResponse =
            Self::send_json(self.request(Method::POST, "/api/login/").json(credentials)).await?;
        self.cache.invalidate(&[Tag::User]);
        Ok(resp)
    }

    pub async fn register(&self, payload: &RegisterRequest) -> Result<User, ApiError> {
        Self::send_json(self.request(Method::POST, "/api/register/").json(payload)).await
    }

    /// End the server-side session. Invalidates the cached profile; the
    /// caller is responsible for clearing the local session state.
    pub async fn logout(&self) -> Result<(), ApiError> {
        Self::send_unit(self.request(Method::POST, "/api/logout/")).await?;
        self.cache.invalidate(&[Tag::User]);
        Ok(())
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        if let Some(user) = self.cache.get(PROFILE_CACHE_KEY) {
            return Ok(user);
        }
        let user: User = Self::send_json(self.request(Method::GET, "/api/profile/")).await?;
        self.cache.put(PROFILE_CACHE_KEY, &user, vec![Tag::User]);
        Ok(user)
    }

    /// Replace profile fields server-side; returns the refreshed snapshot.
    pub async fn update_profile(&self, patch: &Value) -> Result<User, ApiError> {
        let user: User =
            Self::send_json(self.request(Method::PUT, "/api/profile/").json(patch)).await?;
        self.cache.invalidate(&[Tag::User]);
        Ok(user)
    }

    pub async fn reset_password(&self, payload: &ResetPasswordRequest) -> Result<(), ApiError> {
        Self::send_unit(self.request(Method::POST, "/api/reset-password/").json(payload)).await
    }

    /// Probe whether the current token is still accepted. 401 means no;
    /// any other failure is passed through.
    pub async fn verify_token(&self) -> Result<bool, ApiError> {
        match Self::send_unit(self.request(Method::GET, "/api/verify-token/")).await {
            Ok(()) => Ok(true),
            Err(ApiError::Unauthorized) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ===== Catalog =====

    /// Search the catalog. The response is normalized to the canonical
    /// page shape whatever the backend's pagination settings produce.
    pub async fn books(&self, query: &BookQuery) -> Result<Page<Book>, ApiError> {
        let pairs = query.to_query_pairs();
        let key = list_cache_key("books", &pairs);
        if let Some(page) = self.cache.get(&key) {
            return Ok(page);
        }

        let raw: Value = Self::send_json(
            self.request(Method::GET, "/scraping/book_list/").query(&pairs),
        )
        .await?;
        let page = normalize_page(raw, query.page, query.limit)?;
        self.cache.put(&key, &page, vec![Tag::Book]);
        Ok(page)
    }

    pub async fn book(&self, id: i64) -> Result<Book, ApiError> {
        let key = format!("book:{id}");
        if let Some(book) = self.cache.get(&key) {
            return Ok(book);
        }
        let book: Book =
            Self::send_json(self.request(Method::GET, &format!("/scraping/books/{id}/"))).await?;
        self.cache.put(&key, &book, vec![Tag::BookId(id)]);
        Ok(book)
    }

    pub async fn recommended(&self, id: i64) -> Result<Vec<Book>, ApiError> {
        let key = format!("recommended:{id}");
        if let Some(books) = self.cache.get(&key) {
            return Ok(books);
        }
        let books: Vec<Book> = Self::send_json(
            self.request(Method::GET, &format!("/scraping/books/{id}/recommended/")),
        )
        .await?;
        self.cache.put(&key, &books, vec![Tag::Book]);
        Ok(books)
    }

    // ===== Favorites =====

    pub async fn favorites(&self) -> Result<Vec<Favorite>, ApiError> {
        if let Some(favorites) = self.cache.get(FAVORITES_CACHE_KEY) {
            return Ok(favorites);
        }
        let favorites: Vec<Favorite> =
            Self::send_json(self.request(Method::GET, "/api/favorites/")).await?;
        self.cache.put(FAVORITES_CACHE_KEY, &favorites, vec![Tag::Favorites]);
        Ok(favorites)
    }

    pub async fn add_favorite(&self, book_id: i64) -> Result<(), ApiError> {
        Self::send_unit(self.request(Method::POST, &format!("/api/favorites/{book_id}/"))).await?;
        self.cache.invalidate(&[Tag::Favorites]);
        Ok(())
    }

    pub async fn remove_favorite(&self, book_id: i64) -> Result<(), ApiError> {
        Self::send_unit(self.request(Method::DELETE, &format!("/api/favorites/{book_id}/")))
            .await?;
        self.cache.invalidate(&[Tag::Favorites]);
        Ok(())
    }
}

/// Cache key for a list query: the endpoint name plus its query pairs, so
/// different filters cache independently.
fn list_cache_key(endpoint: &str, pairs: &[(&'static str, String)]) -> String {
    let query: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{}?{}", endpoint, query.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialStore;
    use tempfile::TempDir;

    fn client_in(dir: &TempDir, base_url: &str) -> ApiClient {
        let store = CredentialStore::new(dir.path().to_path_buf(), false);
        let session = Arc::new(RwLock::new(Session::new(store)));
        ApiClient::new(base_url, session).expect("client should build")
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let dir = TempDir::new().expect("tempdir");
        let client = client_in(&dir, "http://localhost:8000/");
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_bearer_token_uses_store_fallback() {
        let dir = TempDir::new().expect("tempdir");
        let store = CredentialStore::new(dir.path().to_path_buf(), false);
        store.store_token("persisted").expect("store token");

        // session never initialized: the client still finds the token
        let client = client_in(&dir, "http://localhost:8000");
        assert_eq!(client.bearer_token().as_deref(), Some("persisted"));
    }

    #[test]
    fn test_list_cache_key_distinguishes_filters() {
        let a = list_cache_key("books", &[("title", "dune".to_string())]);
        let b = list_cache_key("books", &[("title", "emma".to_string())]);
        let none = list_cache_key("books", &[]);
        assert_ne!(a, b);
        assert_ne!(a, none);
        assert_eq!(none, "books?");
    }
}
