use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Snapshot of the server-side user record.
///
/// The snapshot is refreshed wholesale from profile responses and never
/// partially trusted: if a stored copy fails to parse, the whole record is
/// treated as absent. Profile fields the server adds without a client
/// release land in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

impl User {
    /// Shallow merge of a partial profile into this snapshot: keys in the
    /// patch overwrite, keys absent from the patch are retained. Unknown
    /// keys end up in `extra`.
    pub fn merged_with(&self, patch: &Map<String, Value>) -> serde_json::Result<User> {
        let mut merged = serde_json::to_value(self)?
            .as_object()
            .cloned()
            .unwrap_or_default();
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(merged))
    }

    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() => format!("{} {}", first, last),
            _ => self.username.clone(),
        }
    }
}

/// Login payload.
///
/// Older web clients send `usernameOrEmail`; the backend only accepts
/// `username`. Deserialization accepts either spelling and serialization
/// always emits `username`, so the remap happens before the request body
/// is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "usernameOrEmail")]
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username_or_email.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_user() -> User {
        serde_json::from_value(json!({
            "id": 7,
            "username": "bob",
            "email": "bob@x.com",
            "is_staff": false
        }))
        .expect("sample user should parse")
    }

    #[test]
    fn test_merge_overwrites_and_retains() {
        let user = sample_user();
        let patch = json!({"email": "new@x.com"});
        let merged = user
            .merged_with(patch.as_object().expect("patch is an object"))
            .expect("merge should succeed");

        assert_eq!(merged.email, "new@x.com");
        assert_eq!(merged.username, "bob");
        assert_eq!(merged.id, 7);
    }

    #[test]
    fn test_merge_keeps_unknown_keys_in_extra() {
        let user = sample_user();
        let patch = json!({"favorite_genre": "horror"});
        let merged = user
            .merged_with(patch.as_object().expect("patch is an object"))
            .expect("merge should succeed");

        assert_eq!(merged.extra.get("favorite_genre"), Some(&json!("horror")));
        assert_eq!(merged.username, "bob");
    }

    #[test]
    fn test_login_request_remaps_username_or_email() {
        let req: LoginRequest = serde_json::from_value(json!({
            "usernameOrEmail": "bob@x.com",
            "password": "p"
        }))
        .expect("legacy field name should deserialize");

        let body = serde_json::to_value(&req).expect("request should serialize");
        assert_eq!(body, json!({"username": "bob@x.com", "password": "p"}));
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user = sample_user();
        assert_eq!(user.display_name(), "bob");
        user.first_name = Some("Bob".to_string());
        user.last_name = Some("Sharp".to_string());
        assert_eq!(user.display_name(), "Bob Sharp");
    }
}
