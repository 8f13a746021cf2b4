//! Asset caching policies
//!
//! Maps a resource path to the rule that decides whether a fetched response
//! may be written to the cache.
//!
//! ## Configuration
//!
//! Policies come from a JSON document. Each asset maps to either a bare
//! behaviour name or a record:
//!
//! ```json
//! {
//!   "assets": {
//!     "/": "never",
//!     "/test": {"behavior": "method", "methods": ["get"]},
//!     "http://localhost:5000/test/after": {"behavior": "successful"}
//!   },
//!   "default": "successful"
//! }
//! ```
//!
//! Entries that are neither a string nor a record with a string `behavior`
//! are dropped with a warning; a broken entry never stops startup.

use hyper::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

use crate::types::Result;

/// What to do with a fetched response for a given asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBehavior {
    /// Cache every response, including errors
    Always,
    /// Cache complete 2xx responses
    Successful,
    /// Cache responses to the listed request methods
    Method,
    /// Never cache
    Never,
    /// A behaviour name this build does not know; treated as `Successful`
    Unrecognized(String),
}

impl CacheBehavior {
    /// Parse a behaviour name (case-insensitive)
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "always" => Self::Always,
            "successful" => Self::Successful,
            "method" => Self::Method,
            "never" => Self::Never,
            _ => Self::Unrecognized(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Always => "always",
            Self::Successful => "successful",
            Self::Method => "method",
            Self::Never => "never",
            Self::Unrecognized(name) => name,
        }
    }
}

/// A resolved caching rule for one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPolicy {
    pub path: String,
    pub behavior: CacheBehavior,
    /// Upper-cased method names, only meaningful for `CacheBehavior::Method`
    pub methods: HashSet<String>,
}

impl AssetPolicy {
    pub fn new(path: &str, behavior: CacheBehavior) -> Self {
        Self {
            path: path.to_string(),
            behavior,
            methods: HashSet::new(),
        }
    }

    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.methods = methods
            .into_iter()
            .map(|m| m.as_ref().trim().to_ascii_uppercase())
            .collect();
        self
    }

    /// Decide whether a response may be written under this policy.
    ///
    /// A 206 is a fragment of a representation and never counts as a
    /// successful, complete response.
    pub fn permits(&self, status: StatusCode, method: &Method) -> bool {
        match &self.behavior {
            CacheBehavior::Always => true,
            CacheBehavior::Never => false,
            CacheBehavior::Method => self
                .methods
                .contains(&method.as_str().to_ascii_uppercase()),
            CacheBehavior::Successful | CacheBehavior::Unrecognized(_) => {
                status.is_success() && status != StatusCode::PARTIAL_CONTENT
            }
        }
    }
}

/// Shape of the assets configuration file
#[derive(Debug, Default, Deserialize)]
pub struct AssetsFile {
    #[serde(default)]
    pub assets: Map<String, Value>,
    #[serde(default)]
    pub default: Option<Value>,
}

/// Immutable path → policy table
#[derive(Debug, Clone)]
pub struct AssetPolicyTable {
    policies: HashMap<String, AssetPolicy>,
    default: AssetPolicy,
}

impl AssetPolicyTable {
    /// Build a table, dropping malformed entries.
    ///
    /// A malformed `default` falls back to `successful`.
    pub fn from_config(assets: &Map<String, Value>, default: Option<&Value>) -> Self {
        let mut policies = HashMap::new();

        for (raw_path, value) in assets {
            let path = normalize_path(raw_path);
            match parse_entry(&path, value) {
                Some(policy) => {
                    debug!(path = %path, behavior = policy.behavior.name(), "Asset policy loaded");
                    policies.insert(path, policy);
                }
                None => {
                    warn!(path = %raw_path, entry = %value, "Dropping malformed asset policy");
                }
            }
        }

        let default = default
            .and_then(|value| {
                let parsed = parse_entry("*", value);
                if parsed.is_none() {
                    warn!(entry = %value, "Malformed default asset policy, using successful");
                }
                parsed
            })
            .unwrap_or_else(|| AssetPolicy::new("*", CacheBehavior::Successful));

        Self { policies, default }
    }

    /// Parse a JSON document of the `AssetsFile` shape
    pub fn from_json(json: &str) -> Result<Self> {
        let file: AssetsFile = serde_json::from_str(json)?;
        Ok(Self::from_config(&file.assets, file.default.as_ref()))
    }

    /// Load from a file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Replace the fallback policy for unlisted paths
    pub fn with_default(mut self, behavior: CacheBehavior) -> Self {
        self.default = AssetPolicy::new("*", behavior);
        self
    }

    /// Exact-path lookup with fallback to the default policy
    pub fn resolve(&self, path: &str) -> &AssetPolicy {
        self.policies
            .get(&normalize_path(path))
            .unwrap_or(&self.default)
    }

    pub fn default_policy(&self) -> &AssetPolicy {
        &self.default
    }

    /// Listed asset paths, in sorted order
    pub fn asset_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for AssetPolicyTable {
    fn default() -> Self {
        Self::from_config(&Map::new(), None)
    }
}

/// Reduce a path-or-URL to a bare path (no query, no fragment)
fn normalize_path(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(url) = Url::parse(raw) {
        if url.has_host() {
            return url.path().to_string();
        }
    }

    let path = raw
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

fn parse_entry(path: &str, value: &Value) -> Option<AssetPolicy> {
    match value {
        Value::String(name) => Some(AssetPolicy::new(path, CacheBehavior::parse(name))),
        Value::Object(record) => {
            let behavior = CacheBehavior::parse(record.get("behavior")?.as_str()?);
            let methods = match record.get("methods") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Option<Vec<_>>>()?,
                Some(_) => return None,
            };
            Some(AssetPolicy::new(path, behavior).with_methods(methods))
        }
        _ => None,
    }
}
