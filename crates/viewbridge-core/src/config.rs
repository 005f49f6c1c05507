//! Bridge and document configuration.

use std::{collections::BTreeSet, time::Duration};

use serde::Deserialize;
use serde_json::Value;
use viewbridge_proto::payloads::build::{AnimationQuality, BuildRequest};

/// Default import source; `{name}` and `{version}` are substituted.
pub const DEFAULT_IMPORT_SOURCE_TEMPLATE: &str =
    "https://arl.assets.apl-alexa.com/packages/{name}/{version}/document.json";

/// Font family handed to the engine when the document names none.
pub const DEFAULT_FONT_FAMILY: &str = "amazon-ember-display";

/// Manager-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Maximum package downloads in flight at once
    pub max_concurrent_downloads: usize,
    /// How long a build waits for mediated extensions to load
    pub extension_load_timeout_ms: u64,
    /// How long a blocking send waits for its reply
    pub blocking_send_timeout_ms: u64,
    /// Source used for imports that carry no explicit source
    pub import_source_template: String,
    /// Fail the build when extension loading times out
    pub abort_on_extension_timeout: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 5,
            extension_load_timeout_ms: 5000,
            blocking_send_timeout_ms: 2000,
            import_source_template: DEFAULT_IMPORT_SOURCE_TEMPLATE.to_string(),
            abort_on_extension_timeout: false,
        }
    }
}

impl BridgeConfig {
    /// Extension load wait as a duration.
    pub fn extension_load_timeout(&self) -> Duration {
        Duration::from_millis(self.extension_load_timeout_ms)
    }

    /// Blocking send wait as a duration.
    pub fn blocking_send_timeout(&self) -> Duration {
        Duration::from_millis(self.blocking_send_timeout_ms)
    }
}

/// Document-level configuration handed to the engine at inflation.
#[derive(Debug, Clone, PartialEq)]
pub struct RootConfig {
    /// Reported agent name
    pub agent_name: String,
    /// Reported agent version
    pub agent_version: String,
    /// Allow `OpenURL` commands
    pub allow_open_url: bool,
    /// Disable video components
    pub disallow_video: bool,
    /// Disable dialogs
    pub disallow_dialog: bool,
    /// Disable edit text components
    pub disallow_edit_text: bool,
    /// Default scroll command duration in milliseconds
    pub scroll_command_duration: u32,
    /// Animation quality hint
    pub animation_quality: AnimationQuality,
    /// Wall-clock time at build, ms since the Unix epoch
    pub utc_time: u64,
    /// Local time adjustment in milliseconds
    pub local_time_adjustment: i64,
    /// Idle timeout used when the document sets none; -1 disables it
    pub default_idle_timeout: i64,
    /// Font family used when the document sets none
    pub default_font_family: String,
    /// Legacy extensions registered for this document
    pub registered_extensions: BTreeSet<String>,
    /// Extensions are loaded through the mediator
    pub mediated_extensions: bool,
}

impl RootConfig {
    /// Configuration for a fresh build.
    pub fn from_build(request: &BuildRequest, utc_time: u64, local_time_adjustment: i64) -> Self {
        Self {
            agent_name: request.agent_name.clone(),
            agent_version: request.agent_version.clone(),
            allow_open_url: request.allow_open_url,
            disallow_video: request.disallow_video,
            disallow_dialog: request.disallow_dialog,
            disallow_edit_text: request.disallow_edit_text,
            scroll_command_duration: request.scroll_command_duration.max(0.0) as u32,
            animation_quality: request.animation_quality,
            utc_time,
            local_time_adjustment,
            default_idle_timeout: -1,
            default_font_family: DEFAULT_FONT_FAMILY.to_string(),
            registered_extensions: BTreeSet::new(),
            mediated_extensions: false,
        }
    }
}

/// Extension the viewhost declared at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportedExtension {
    /// Extension uri
    pub uri: String,
    /// Initialization flags; `Value::Null` when none were given
    pub flags: Value,
}

/// Read the `supportedExtensions` member of a build request.
///
/// Entries are either a uri string or `{uri, flags}`. Flags must be an array,
/// an object or a string; other flag types are dropped with a warning and the
/// extension is kept. Entries without a string uri are skipped.
pub fn parse_supported_extensions(raw: &Value) -> Vec<SupportedExtension> {
    let Value::Array(entries) = raw else {
        return Vec::new();
    };

    let mut supported = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::String(uri) => {
                supported.push(SupportedExtension { uri: uri.clone(), flags: Value::Null });
            },
            Value::Object(fields) => {
                let Some(uri) = fields.get("uri").and_then(Value::as_str) else {
                    tracing::warn!("supported extension entry not formatted correctly");
                    continue;
                };
                let flags = match fields.get("flags") {
                    None => Value::Null,
                    Some(flags @ (Value::Array(_) | Value::Object(_) | Value::String(_))) => {
                        flags.clone()
                    },
                    Some(_) => {
                        tracing::warn!(uri, "supported extension flags not formatted correctly");
                        Value::Null
                    },
                };
                supported.push(SupportedExtension { uri: uri.to_string(), flags });
            },
            _ => tracing::warn!("supported extension entry not formatted correctly"),
        }
    }
    supported
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.max_concurrent_downloads, 5);
        assert_eq!(config.extension_load_timeout(), Duration::from_millis(5000));
        assert!(!config.abort_on_extension_timeout);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: BridgeConfig =
            serde_json::from_value(json!({"max_concurrent_downloads": 2})).expect("parses");
        assert_eq!(config.max_concurrent_downloads, 2);
        assert_eq!(config.blocking_send_timeout_ms, 2000);
        assert_eq!(config.import_source_template, DEFAULT_IMPORT_SOURCE_TEMPLATE);
    }

    #[test]
    fn supported_extension_forms() {
        let parsed = parse_supported_extensions(&json!([
            "aplext:a:1",
            {"uri": "aplext:b:1", "flags": ["x"]},
            {"uri": "aplext:c:1", "flags": 7},
            {"flags": "orphan"},
            42,
        ]));

        let uris: Vec<_> = parsed.iter().map(|e| e.uri.as_str()).collect();
        assert_eq!(uris, ["aplext:a:1", "aplext:b:1", "aplext:c:1"]);
        assert_eq!(parsed[1].flags, json!(["x"]));
        assert_eq!(parsed[2].flags, Value::Null);
    }

    #[test]
    fn non_array_supported_extensions_is_empty() {
        assert!(parse_supported_extensions(&Value::Null).is_empty());
        assert!(parse_supported_extensions(&json!({"uri": "a"})).is_empty());
    }
}
