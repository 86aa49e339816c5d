//! Cookie-style credential persistence.
//!
//! The service's web client keeps the auth token and a user snapshot in
//! browser cookies. This store reproduces those semantics over a JSON file
//! in the user cache directory: named entries carrying path, expiry,
//! secure, and same-site attributes, legacy key aliases probed in priority
//! order, and fail-closed reads that purge anything corrupt or expired.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::User;

/// Credential file name in the cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Entry time-to-live in days, matching the web client's cookie max-age
const ENTRY_TTL_DAYS: i64 = 7;

/// Token entry names, probed in priority order. The first is canonical;
/// the rest are names older clients wrote.
const TOKEN_KEYS: [&str; 3] = ["authToken", "auth_token", "token"];

/// User snapshot entry names, probed in priority order.
const USER_KEYS: [&str; 3] = ["userData", "user_data", "user"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// One named entry with its cookie attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
    path: String,
    secure: bool,
    same_site: SameSite,
}

impl Entry {
    fn new(value: String, secure: bool) -> Self {
        Self {
            value,
            expires_at: Utc::now() + Duration::days(ENTRY_TTL_DAYS),
            path: "/".to_string(),
            secure,
            same_site: SameSite::Strict,
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// The persisted credential pair.
///
/// Invariant: the session counts as authenticated only when both the token
/// and the user snapshot are present and non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialRecord {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl CredentialRecord {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty()) && self.user.is_some()
    }
}

/// Durable mirror of the session's token and user snapshot.
pub struct CredentialStore {
    path: PathBuf,
    secure: bool,
}

impl CredentialStore {
    /// Create a store writing to `dir`. `secure` marks new entries the way
    /// the web client sets the cookie secure flag outside local dev.
    pub fn new(dir: PathBuf, secure: bool) -> Self {
        Self {
            path: dir.join(CREDENTIALS_FILE),
            secure,
        }
    }

    /// Read the persisted record.
    ///
    /// Never returns an error: expired entries are purged, an unparsable
    /// user snapshot is purged and reported absent, and an unreadable file
    /// is discarded wholesale. Storage trouble always fails closed to
    /// logged-out.
    pub fn read(&self) -> CredentialRecord {
        let mut entries = self.load_entries();
        let mut dirty = false;

        let token = first_live(&mut entries, &TOKEN_KEYS, &mut dirty)
            .map(|(_, value)| value)
            .filter(|t| !t.is_empty());

        let user = match first_live(&mut entries, &USER_KEYS, &mut dirty) {
            Some((key, raw)) => match decode_user(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(key, error = %e, "Discarding unreadable stored user snapshot");
                    entries.remove(key);
                    dirty = true;
                    None
                }
            },
            None => None,
        };

        if dirty {
            if let Err(e) = self.save_entries(&entries) {
                warn!(error = %e, "Failed to persist credential cleanup");
            }
        }

        CredentialRecord { token, user }
    }

    /// Persist both halves of a record in one write, so a failure cannot
    /// split the pair.
    pub fn write(&self, record: &CredentialRecord) -> Result<()> {
        let mut entries = self.load_entries();
        if let Some(ref token) = record.token {
            entries.insert(TOKEN_KEYS[0].to_string(), Entry::new(token.clone(), self.secure));
        }
        if let Some(ref user) = record.user {
            entries.insert(USER_KEYS[0].to_string(), Entry::new(encode_user(user)?, self.secure));
        }
        self.save_entries(&entries)
    }

    /// Store the token under the canonical key. Legacy keys are never
    /// written, only read.
    pub fn store_token(&self, token: &str) -> Result<()> {
        let mut entries = self.load_entries();
        entries.insert(
            TOKEN_KEYS[0].to_string(),
            Entry::new(token.to_string(), self.secure),
        );
        self.save_entries(&entries)
    }

    /// Store the user snapshot under the canonical key.
    pub fn store_user(&self, user: &User) -> Result<()> {
        let encoded = encode_user(user)?;
        let mut entries = self.load_entries();
        entries.insert(USER_KEYS[0].to_string(), Entry::new(encoded, self.secure));
        self.save_entries(&entries)
    }

    /// Remove the token and user snapshot under every known name,
    /// canonical and legacy alike.
    pub fn clear(&self) -> Result<()> {
        let mut entries = self.load_entries();
        for key in TOKEN_KEYS.iter().chain(USER_KEYS.iter()) {
            entries.remove(*key);
        }
        self.save_entries(&entries)
    }

    fn load_entries(&self) -> BTreeMap<String, Entry> {
        if !self.path.exists() {
            return BTreeMap::new();
        }
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to read credential file");
                return BTreeMap::new();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Credential file is corrupt, discarding it");
                let _ = std::fs::remove_file(&self.path);
                BTreeMap::new()
            }
        }
    }

    fn save_entries(&self, entries: &BTreeMap<String, Entry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create credential directory")?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents).context("Failed to write credential file")?;
        debug!(path = %self.path.display(), "Credential file written");
        Ok(())
    }
}

/// Return the first unexpired value found under `keys`, purging expired
/// entries along the way.
fn first_live(
    entries: &mut BTreeMap<String, Entry>,
    keys: &[&'static str],
    dirty: &mut bool,
) -> Option<(&'static str, String)> {
    for &key in keys {
        let expired = match entries.get(key) {
            Some(entry) if entry.is_expired() => true,
            Some(entry) => return Some((key, entry.value.clone())),
            None => continue,
        };
        if expired {
            debug!(key, "Purging expired credential entry");
            entries.remove(key);
            *dirty = true;
        }
    }
    None
}

fn encode_user(user: &User) -> Result<String> {
    let json = serde_json::to_string(user).context("Failed to serialize user snapshot")?;
    Ok(utf8_percent_encode(&json, NON_ALPHANUMERIC).to_string())
}

fn decode_user(raw: &str) -> Result<User> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .context("Stored user snapshot is not valid UTF-8")?;
    serde_json::from_str(&decoded).context("Stored user snapshot is not valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_user() -> User {
        serde_json::from_value(json!({
            "id": 7,
            "username": "bob",
            "email": "bob@x.com",
            "is_staff": true
        }))
        .expect("sample user should parse")
    }

    fn store_in(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().to_path_buf(), false)
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        let record = CredentialRecord {
            token: Some("tok123".to_string()),
            user: Some(sample_user()),
        };
        store.write(&record).expect("write should succeed");

        let read = store.read();
        assert_eq!(read.token.as_deref(), Some("tok123"));
        assert_eq!(read.user, Some(sample_user()));
        assert!(read.is_authenticated());
    }

    #[test]
    fn test_corrupt_user_snapshot_is_purged() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        store.store_token("tok").expect("store token");

        let mut entries = store.load_entries();
        entries.insert(
            "userData".to_string(),
            Entry::new("%7Bnot-json".to_string(), false),
        );
        store.save_entries(&entries).expect("save entries");

        let read = store.read();
        assert!(read.user.is_none());
        assert_eq!(read.token.as_deref(), Some("tok"));

        // the corrupted entry must be gone from disk
        assert!(!store.load_entries().contains_key("userData"));
    }

    #[test]
    fn test_corrupt_file_is_discarded() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        std::fs::write(dir.path().join(CREDENTIALS_FILE), "{{{{").expect("write garbage");

        let read = store.read();
        assert!(read.token.is_none());
        assert!(read.user.is_none());
        assert!(!dir.path().join(CREDENTIALS_FILE).exists());
    }

    #[test]
    fn test_legacy_token_key_fallback() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);

        let mut entries = BTreeMap::new();
        entries.insert("auth_token".to_string(), Entry::new("legacy".to_string(), false));
        store.save_entries(&entries).expect("save entries");

        assert_eq!(store.read().token.as_deref(), Some("legacy"));
    }

    #[test]
    fn test_canonical_key_wins_over_legacy() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);

        let mut entries = BTreeMap::new();
        entries.insert("token".to_string(), Entry::new("oldest".to_string(), false));
        entries.insert("authToken".to_string(), Entry::new("current".to_string(), false));
        store.save_entries(&entries).expect("save entries");

        assert_eq!(store.read().token.as_deref(), Some("current"));
    }

    #[test]
    fn test_expired_entry_reads_absent_and_is_purged() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);

        let mut expired = Entry::new("tok".to_string(), false);
        expired.expires_at = Utc::now() - Duration::days(1);
        let mut entries = BTreeMap::new();
        entries.insert("authToken".to_string(), expired);
        store.save_entries(&entries).expect("save entries");

        assert!(store.read().token.is_none());
        assert!(!store.load_entries().contains_key("authToken"));
    }

    #[test]
    fn test_clear_removes_all_aliases() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);

        let mut entries = BTreeMap::new();
        for key in TOKEN_KEYS.iter().chain(USER_KEYS.iter()) {
            entries.insert(key.to_string(), Entry::new("v".to_string(), false));
        }
        store.save_entries(&entries).expect("save entries");

        store.clear().expect("clear should succeed");
        assert!(store.load_entries().is_empty());
        assert!(!store.read().is_authenticated());
    }

    #[test]
    fn test_empty_token_is_not_authenticated() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        store.store_token("").expect("store empty token");
        store.store_user(&sample_user()).expect("store user");

        let read = store.read();
        assert!(read.token.is_none());
        assert!(!read.is_authenticated());
    }

    #[test]
    fn test_entries_carry_cookie_attributes() {
        let dir = TempDir::new().expect("tempdir");
        let store = CredentialStore::new(dir.path().to_path_buf(), true);
        store.store_token("tok").expect("store token");

        let entries = store.load_entries();
        let entry = entries.get("authToken").expect("entry present");
        assert!(entry.secure);
        assert_eq!(entry.path, "/");
        assert_eq!(entry.same_site, SameSite::Strict);
        assert!(entry.expires_at > Utc::now() + Duration::days(6));
    }
}
