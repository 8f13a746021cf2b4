//! Configuration for clipway
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::cache::{AssetPolicyTable, CacheBehavior};
use crate::types::{ClipwayError, Result};
use crate::worker::WorkerConfig;

/// clipway - offline edge cache for match clips
#[derive(Parser, Debug, Clone)]
#[command(name = "clipway")]
#[command(about = "Offline-capable edge cache for match clips")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8090")]
    pub listen: SocketAddr,

    /// Origin server the worker fronts
    #[arg(long, env = "ORIGIN_URL", default_value = "http://localhost:5000")]
    pub origin_url: String,

    /// URL probed with HEAD to decide online/offline (defaults to the origin root)
    #[arg(long, env = "PROBE_URL")]
    pub probe_url: Option<String>,

    /// Path that receives video selection submissions
    #[arg(long, env = "SELECTION_ENDPOINT", default_value = "/get_video")]
    pub selection_endpoint: String,

    /// Where to send the browser after a selection
    #[arg(long, env = "SELECTION_REDIRECT", default_value = "/")]
    pub selection_redirect: String,

    /// URL namespace owned by the worker
    #[arg(long, env = "NAMESPACE", default_value = "/client")]
    pub namespace: String,

    /// JSON file with asset caching policies
    #[arg(long, env = "ASSETS")]
    pub assets: Option<PathBuf>,

    /// Behaviour for paths not listed in the assets file
    /// (always, successful, method, never)
    #[arg(long, env = "DEFAULT_BEHAVIOR")]
    pub default_behavior: Option<String>,

    /// Connection probe interval in milliseconds
    #[arg(long, env = "PROBE_INTERVAL_MS", default_value = "10000")]
    pub probe_interval_ms: u64,

    /// Connection probe timeout in milliseconds (kept below the interval)
    #[arg(long, env = "PROBE_TIMEOUT_MS", default_value = "5000")]
    pub probe_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        let origin = Url::parse(&self.origin_url)
            .map_err(|e| format!("ORIGIN_URL is not a valid URL: {}", e))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err("ORIGIN_URL must use http or https".to_string());
        }

        if let Some(probe) = &self.probe_url {
            origin
                .join(probe)
                .map_err(|e| format!("PROBE_URL is not a valid URL: {}", e))?;
        }

        if !self.selection_endpoint.starts_with('/') {
            return Err("SELECTION_ENDPOINT must be a path starting with /".to_string());
        }

        if !self.namespace.starts_with('/') {
            return Err("NAMESPACE must be a path starting with /".to_string());
        }

        if self.probe_interval_ms == 0 {
            return Err("PROBE_INTERVAL_MS must be greater than 0".to_string());
        }

        if let Some(name) = &self.default_behavior {
            if let CacheBehavior::Unrecognized(_) = CacheBehavior::parse(name) {
                return Err(format!("DEFAULT_BEHAVIOR \"{}\" is not a known behaviour", name));
            }
        }

        Ok(())
    }

    pub fn origin(&self) -> Result<Url> {
        Ok(Url::parse(&self.origin_url)?)
    }

    /// Namespace without a trailing slash
    pub fn namespace(&self) -> &str {
        let trimmed = self.namespace.trim_end_matches('/');
        if trimmed.is_empty() {
            "/client"
        } else {
            trimmed
        }
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn worker_config(&self) -> Result<WorkerConfig> {
        let origin_url = self.origin()?;
        let probe_url = match &self.probe_url {
            Some(probe) => origin_url.join(probe)?,
            None => origin_url.clone(),
        };

        Ok(WorkerConfig {
            origin_url,
            probe_url,
            selection_endpoint: self.selection_endpoint.clone(),
            selection_redirect: self.selection_redirect.clone(),
            namespace: self.namespace().to_string(),
            probe_interval: self.probe_interval(),
            probe_timeout: self.probe_timeout(),
        })
    }

    /// Load the asset policy table, applying the default behaviour override
    pub fn asset_policies(&self) -> Result<AssetPolicyTable> {
        let table = match &self.assets {
            Some(path) => AssetPolicyTable::load(path).map_err(|e| {
                ClipwayError::Config(format!("Failed to load assets from {}: {}", path.display(), e))
            })?,
            None => AssetPolicyTable::default(),
        };

        Ok(match &self.default_behavior {
            Some(name) => table.with_default(CacheBehavior::parse(name)),
            None => table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["clipway"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert!(args.validate().is_ok());
        assert_eq!(args.namespace(), "/client");

        let config = args.worker_config().unwrap();
        assert_eq!(config.selection_endpoint, "/get_video");
        assert_eq!(config.probe_interval, Duration::from_millis(10_000));
        assert_eq!(config.probe_url, config.origin_url);
    }

    #[test]
    fn test_probe_url_relative_to_origin() {
        let args = parse(&["--origin-url", "http://scout.local:5000", "--probe-url", "/sw.js"]);
        let config = args.worker_config().unwrap();
        assert_eq!(config.probe_url.as_str(), "http://scout.local:5000/sw.js");
    }

    #[test]
    fn test_validation_errors() {
        assert!(parse(&["--origin-url", "not a url"]).validate().is_err());
        assert!(parse(&["--namespace", "client"]).validate().is_err());
        assert!(parse(&["--probe-interval-ms", "0"]).validate().is_err());
        assert!(parse(&["--default-behavior", "sometimes"]).validate().is_err());
    }

    #[test]
    fn test_default_behavior_override() {
        let args = parse(&["--default-behavior", "never"]);
        let table = args.asset_policies().unwrap();
        assert_eq!(table.resolve("/anything").behavior, CacheBehavior::Never);
    }
}
