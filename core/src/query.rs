//! Query-string marshaling for request parameter structs.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::{Result, ZepError};

/// Flatten a parameter struct into ordered query pairs.
///
/// `None` fields are skipped, scalars are stringified and arrays become
/// repeated keys. Anything other than a JSON object is rejected.
pub fn values<T: Serialize>(params: &T) -> Result<Vec<(String, String)>> {
    let value = serde_json::to_value(params).map_err(|e| ZepError::Serialization(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(ZepError::Serialization(
            "query parameters must serialize to an object".to_string(),
        ));
    };

    let mut pairs = Vec::new();
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar(item) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = scalar(other) {
                    pairs.push((key, text));
                }
            }
        }
    }
    Ok(pairs)
}

fn scalar(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        nested => Some(nested.to_string()),
    }
}

/// Append `pairs` to `url`. An empty list leaves the URL without a `?`.
pub fn apply(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in pairs {
        query.append_pair(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Params {
        limit: Option<u32>,
        cursor: Option<u64>,
        asc: bool,
        tags: Vec<&'static str>,
        order_by: Option<&'static str>,
    }

    #[test]
    fn skips_none_and_repeats_arrays() {
        let params = Params {
            limit: Some(5),
            cursor: None,
            asc: true,
            tags: vec!["a", "b"],
            order_by: Some("created_at"),
        };
        let pairs = values(&params).unwrap();
        assert!(pairs.contains(&("limit".to_string(), "5".to_string())));
        assert!(pairs.contains(&("asc".to_string(), "true".to_string())));
        assert!(pairs.contains(&("order_by".to_string(), "created_at".to_string())));
        assert_eq!(pairs.iter().filter(|(key, _)| key == "tags").count(), 2);
        assert!(!pairs.iter().any(|(key, _)| key == "cursor"));
    }

    #[test]
    fn rejects_non_object_params() {
        let err = values(&42u32).unwrap_err();
        assert!(matches!(err, ZepError::Serialization(_)));
    }

    #[test]
    fn apply_encodes_and_omits_empty_query() {
        let mut url = Url::parse("http://localhost:8000/api/v2/users").unwrap();
        apply(&mut url, &[]);
        assert_eq!(url.as_str(), "http://localhost:8000/api/v2/users");

        apply(&mut url, &[("q".to_string(), "a b&c".to_string())]);
        assert_eq!(url.as_str(), "http://localhost:8000/api/v2/users?q=a+b%26c");
    }
}
