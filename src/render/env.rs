//! Per-render context bag.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Extensible context handed to a render pass.
///
/// Rendering pipelines put whatever they know about the document being
/// rendered here; only the source identifier is read back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderEnv(Map<String, Value>);

impl RenderEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object. Anything that is not an object yields an empty env.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    /// Set a field, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Best-effort source-document identifier.
    ///
    /// Checks `currentDocument.uri`, `resourceUri`, `docUri`, `uri` and
    /// `source` in that order; the first non-empty string wins. Falls back to
    /// an empty string.
    pub fn source_identifier(&self) -> String {
        let current_document_uri = self.0.get("currentDocument").and_then(|doc| doc.get("uri"));
        std::iter::once(current_document_uri)
            .chain(
                ["resourceUri", "docUri", "uri", "source"]
                    .iter()
                    .map(|key| self.0.get(*key)),
            )
            .flatten()
            .filter_map(Value::as_str)
            .find(|value| !value.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_env_has_no_source() {
        assert_eq!(RenderEnv::new().source_identifier(), "");
    }

    #[test]
    fn test_priority_order() {
        let env = RenderEnv::new()
            .with("source", "file:///source.md")
            .with("uri", "file:///uri.md")
            .with("docUri", "file:///doc.md")
            .with("resourceUri", "file:///resource.md")
            .with("currentDocument", json!({ "uri": "file:///current.md" }));
        assert_eq!(env.source_identifier(), "file:///current.md");

        let env = RenderEnv::new()
            .with("source", "file:///source.md")
            .with("docUri", "file:///doc.md");
        assert_eq!(env.source_identifier(), "file:///doc.md");
    }

    #[test]
    fn test_empty_and_non_string_values_fall_through() {
        let env = RenderEnv::new()
            .with("currentDocument", json!({ "uri": "" }))
            .with("resourceUri", json!(42))
            .with("uri", json!(null))
            .with("source", "file:///fallback.md");
        assert_eq!(env.source_identifier(), "file:///fallback.md");
    }

    #[test]
    fn test_from_json() {
        let env = RenderEnv::from_json(r#"{"resourceUri": "file:///x.md"}"#);
        assert_eq!(env.source_identifier(), "file:///x.md");
        assert_eq!(RenderEnv::from_json("[1, 2]"), RenderEnv::new());
        assert_eq!(RenderEnv::from_json("not json"), RenderEnv::new());
    }
}
