//! Extension payloads.

use serde::Deserialize;
use serde_json::{Map, Value};

/// `extension` payload: invoke a document-side extension event handler.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionMessage {
    /// Extension uri
    pub uri: String,
    /// Event handler name
    pub name: String,
    /// Run the handler in fast mode
    pub fast_mode: bool,
    /// Handler data; only string values are forwarded
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ExtensionMessage {
    /// Split `data` into forwarded string values and the keys that were
    /// skipped because their value is not a string.
    pub fn string_data(&self) -> (Map<String, Value>, Vec<String>) {
        let mut kept = Map::new();
        let mut skipped = Vec::new();
        for (key, value) in &self.data {
            if value.is_string() {
                kept.insert(key.clone(), value.clone());
            } else {
                skipped.push(key.clone());
            }
        }
        (kept, skipped)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn non_string_data_skipped() {
        let message: ExtensionMessage = serde_json::from_value(json!({
            "uri": "ext:demo:1", "name": "OnPing", "fastMode": false,
            "data": {"a": "x", "b": 2}
        }))
        .expect("parses");

        let (kept, skipped) = message.string_data();
        assert_eq!(kept.len(), 1);
        assert_eq!(skipped, vec!["b".to_string()]);
    }

    #[test]
    fn fast_mode_must_be_bool() {
        let bad = serde_json::from_value::<ExtensionMessage>(json!({
            "uri": "ext:demo:1", "name": "OnPing", "fastMode": "yes"
        }));
        assert!(bad.is_err());
    }
}
