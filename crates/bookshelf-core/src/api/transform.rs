//! Response-shape normalization for paginated list endpoints.
//!
//! The backend answers list requests in one of three shapes depending on
//! the endpoint's pagination settings: a DRF envelope, a bare array, or an
//! already-canonical object. All three are folded into `Page<T>` here, in
//! a fixed priority order.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiError;
use crate::models::{Page, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};

/// Normalize a raw list response into the canonical page shape.
///
/// `page` and `limit` are whatever the caller asked for; defaults apply
/// when the caller supplied none.
pub fn normalize_page<T: DeserializeOwned>(
    raw: Value,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<Page<T>, ApiError> {
    let page = page.unwrap_or(DEFAULT_PAGE);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);

    // 1. DRF pagination envelope: {"results": [...], "count": n}
    if let Some(results) = raw.get("results") {
        let items = parse_items(results.clone())?;
        let total = raw
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or(items.len() as u64);
        return Ok(Page { items, total, page, limit });
    }

    // 2. Bare array of items
    if raw.is_array() {
        let items: Vec<T> = parse_items(raw)?;
        let total = items.len() as u64;
        return Ok(Page { items, total, page, limit });
    }

    // 3. Already canonical: {"items": [...], "total": n}
    if let Some(items) = raw.get("items") {
        let items = parse_items(items.clone())?;
        let total = raw
            .get("total")
            .or_else(|| raw.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(items.len() as u64);
        return Ok(Page { items, total, page, limit });
    }

    Err(ApiError::InvalidResponse(format!(
        "unrecognized list shape: {}",
        summarize(&raw)
    )))
}

fn parse_items<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("bad list items: {e}")))
}

/// Short description of an unexpected payload for error messages
fn summarize(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().take(5).map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        Value::Array(_) => "array".to_string(),
        other => format!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_drf_envelope() {
        let raw = json!({"results": [{"x": 1}, {"x": 2}], "count": 2});
        let page: Page<Value> = normalize_page(raw, None, None).expect("envelope normalizes");
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 12);
    }

    #[test]
    fn test_bare_array() {
        let raw = json!([{"x": 1}, {"x": 2}, {"x": 3}]);
        let page: Page<Value> = normalize_page(raw, None, None).expect("array normalizes");
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total, 3);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 12);
    }

    #[test]
    fn test_already_canonical() {
        let raw = json!({"items": [{"x": 1}], "total": 40});
        let page: Page<Value> = normalize_page(raw, Some(3), Some(20)).expect("canonical passes");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 40);
        assert_eq!(page.page, 3);
        assert_eq!(page.limit, 20);
    }

    #[test]
    fn test_envelope_takes_priority_over_items() {
        // an envelope that also happens to carry an "items" key
        let raw = json!({"results": [{"x": 1}], "count": 1, "items": []});
        let page: Page<Value> = normalize_page(raw, None, None).expect("envelope wins");
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn test_missing_count_falls_back_to_length() {
        let raw = json!({"results": [{"x": 1}, {"x": 2}]});
        let page: Page<Value> = normalize_page(raw, None, None).expect("normalizes");
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_unrecognized_shape_is_an_error() {
        let raw = json!({"detail": "not a list"});
        let err = normalize_page::<Value>(raw, None, None).expect_err("must fail");
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}
