//! Simulated document content.
//!
//! A document description is JSON:
//!
//! ```json
//! {
//!   "version": "2023.1",
//!   "background": "#FFFFFF",
//!   "supportsResizing": true,
//!   "idleTimeout": 30000,
//!   "imports": [{"name": "alexa-layouts", "version": "1.7.0"}],
//!   "extensions": {"aplext:backstack:10": {"backstackId": "main"}},
//!   "mainTemplate": {"type": "Container", "children": [{"id": "title", "type": "Text"}]}
//! }
//! ```
//!
//! Package bodies are JSON objects and may declare `imports` of their own,
//! which the content then waits on too. A body that is not a JSON object puts
//! the content in an error state.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;
use viewbridge_core::{
    RootConfig,
    engine::{Background, Content, ImportRequest, Metrics},
};

/// Import declared by a document or package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImportSpec {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Explicit source url
    #[serde(default)]
    pub source: Option<String>,
}

/// Parsed document description.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentSpec {
    /// Document version
    pub version: String,
    /// Background color string or gradient object
    pub background: Option<Value>,
    /// Document supports viewport resizing
    pub supports_resizing: bool,
    /// Idle timeout in milliseconds
    pub idle_timeout: Option<i64>,
    /// Direct imports
    pub imports: Vec<ImportSpec>,
    /// Requested extensions and their settings
    pub extensions: BTreeMap<String, Value>,
    /// Component layout inflated by the simulated engine
    pub main_template: Value,
}

impl Default for DocumentSpec {
    fn default() -> Self {
        Self {
            version: "2023.1".to_string(),
            background: None,
            supports_resizing: false,
            idle_timeout: None,
            imports: Vec::new(),
            extensions: BTreeMap::new(),
            main_template: serde_json::json!({ "type": "Container" }),
        }
    }
}

/// [`Content`] backed by a [`DocumentSpec`].
#[derive(Debug, Clone)]
pub struct SimDocument {
    spec: DocumentSpec,
    outstanding: Vec<ImportRequest>,
    loaded: BTreeMap<String, Value>,
    next_request: u32,
    error: bool,
    refreshed: Option<Metrics>,
}

impl SimDocument {
    /// Content for `spec`, waiting on its direct imports.
    pub fn new(spec: DocumentSpec) -> Self {
        let mut document = Self {
            outstanding: Vec::new(),
            loaded: BTreeMap::new(),
            next_request: 0,
            error: false,
            refreshed: None,
            spec,
        };
        let imports = document.spec.imports.clone();
        document.request(&imports);
        document
    }

    /// Parse a document description.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self::new)
    }

    /// Document description.
    pub fn spec(&self) -> &DocumentSpec {
        &self.spec
    }

    /// Names of packages added so far, as `name@version`.
    pub fn loaded_packages(&self) -> Vec<String> {
        self.loaded.keys().cloned().collect()
    }

    /// Metrics of the last refresh.
    pub fn refreshed_with(&self) -> Option<Metrics> {
        self.refreshed
    }

    fn request(&mut self, imports: &[ImportSpec]) {
        for import in imports {
            let key = package_key(&import.name, &import.version);
            let already = self.loaded.contains_key(&key)
                || self.outstanding.iter().any(|r| r.name == import.name && r.version == import.version);
            if already {
                continue;
            }
            self.outstanding.push(ImportRequest {
                id: self.next_request,
                name: import.name.clone(),
                version: import.version.clone(),
                source: import.source.clone(),
            });
            self.next_request += 1;
        }
    }
}

fn package_key(name: &str, version: &str) -> String {
    format!("{name}@{version}")
}

impl Content for SimDocument {
    fn is_waiting(&self) -> bool {
        !self.outstanding.is_empty()
    }

    fn is_error(&self) -> bool {
        self.error
    }

    fn requested_packages(&self) -> Vec<ImportRequest> {
        self.outstanding.clone()
    }

    fn add_package(&mut self, request: &ImportRequest, body: String) {
        let Some(position) = self.outstanding.iter().position(|r| r.id == request.id) else {
            tracing::warn!(name = %request.name, "package was not requested");
            return;
        };
        self.outstanding.remove(position);

        let package = match serde_json::from_str::<Value>(&body) {
            Ok(package @ Value::Object(_)) => package,
            _ => {
                tracing::warn!(name = %request.name, "package body is not a json object");
                self.error = true;
                return;
            },
        };
        let nested: Vec<ImportSpec> = package
            .get("imports")
            .cloned()
            .and_then(|imports| serde_json::from_value(imports).ok())
            .unwrap_or_default();
        self.loaded.insert(package_key(&request.name, &request.version), package);
        self.request(&nested);
    }

    fn document_version(&self) -> String {
        self.spec.version.clone()
    }

    fn refresh(&mut self, metrics: &Metrics, _config: &RootConfig) {
        self.refreshed = Some(*metrics);
    }

    fn requested_extensions(&self) -> BTreeSet<String> {
        self.spec.extensions.keys().cloned().collect()
    }

    fn extension_settings(&self, uri: &str) -> Value {
        self.spec.extensions.get(uri).cloned().unwrap_or(Value::Null)
    }

    fn background(&self, _metrics: &Metrics, _config: &RootConfig) -> Background {
        match &self.spec.background {
            Some(Value::String(color)) => Background::Color(color.clone()),
            Some(gradient @ Value::Object(_)) => Background::Gradient(gradient.clone()),
            _ => Background::None,
        }
    }

    fn supports_resizing(&self) -> bool {
        self.spec.supports_resizing
    }

    fn idle_timeout(&self, config: &RootConfig) -> i64 {
        self.spec.idle_timeout.unwrap_or(config.default_idle_timeout)
    }
}
