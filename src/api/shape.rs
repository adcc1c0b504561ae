//! Tagged response-shape check for API bodies.
//!
//! Route behavior branches on whether a body is a JSON array or a JSON object.
//! Parsing into this sum type first keeps that branching in one place instead
//! of scattering duck-typed checks through the crawler.

use serde_json::{Map, Value};

/// The shape of a parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyShape {
    /// A JSON array of items (paginated collection page).
    List(Vec<Value>),
    /// A single JSON object (dict-style endpoint or single item).
    Object(Map<String, Value>),
    /// Not valid JSON, or a JSON scalar - unusable either way.
    Malformed,
}

impl BodyShape {
    /// Parses a response body into its shape.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Array(items)) => Self::List(items),
            Ok(Value::Object(map)) => Self::Object(map),
            Ok(_) | Err(_) => Self::Malformed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array() {
        let shape = BodyShape::parse(r#"[{"id": 1}, {"id": 2}]"#);
        match shape {
            BodyShape::List(items) => assert_eq!(items.len(), 2),
            other => panic!("expected List, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_array() {
        assert_eq!(BodyShape::parse("[]"), BodyShape::List(vec![]));
    }

    #[test]
    fn test_parse_object() {
        let shape = BodyShape::parse(r#"{"name": "site"}"#);
        assert!(matches!(shape, BodyShape::Object(_)));
    }

    #[test]
    fn test_parse_invalid_json_is_malformed() {
        assert_eq!(BodyShape::parse("<html>not json</html>"), BodyShape::Malformed);
        assert_eq!(BodyShape::parse(""), BodyShape::Malformed);
    }

    #[test]
    fn test_parse_scalar_is_malformed() {
        assert_eq!(BodyShape::parse("42"), BodyShape::Malformed);
        assert_eq!(BodyShape::parse("\"just a string\""), BodyShape::Malformed);
        assert_eq!(BodyShape::parse("null"), BodyShape::Malformed);
    }
}
