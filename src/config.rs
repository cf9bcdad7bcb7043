//! # Configuration Module
//!
//! Environment variable-based configuration for the middleware's fixed
//! endpoints and the placeholder used for requests without a `Host`.
//!
//! ## Environment Variables
//!
//! ### `SPECGUARD_SPEC_PATH`
//!
//! Path the document is served at as JSON. Default: `/spec.json`
//!
//! ### `SPECGUARD_DOCS_PATH`
//!
//! Path of the documentation page. Default: `/`
//!
//! ### `SPECGUARD_SERVE_DOCS`
//!
//! `0`, `false`, `off` or `no` turn the documentation page off; requests to
//! the docs path then go through validation like any other. Default: on
//!
//! ### `SPECGUARD_PLACEHOLDER_HOST` / `SPECGUARD_PLACEHOLDER_SCHEME`
//!
//! Authority and scheme substituted when a request carries neither an
//! absolute URL nor a `Host` header. Defaults: `localhost` / `http`
//!
//! ## Usage
//!
//! ```rust
//! use specguard::config::GuardConfig;
//!
//! let config = GuardConfig::from_env();
//! println!("Spec served at {}", config.spec_json_path);
//! ```

use std::env;
use tracing::warn;

pub const DEFAULT_SPEC_JSON_PATH: &str = "/spec.json";
pub const DEFAULT_DOCS_PATH: &str = "/";
pub const DEFAULT_PLACEHOLDER_HOST: &str = "localhost";
pub const DEFAULT_PLACEHOLDER_SCHEME: &str = "http";

/// Middleware configuration.
///
/// Load this at startup using [`GuardConfig::from_env()`], or build one by
/// hand starting from [`GuardConfig::default()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Where the document is served as JSON (default: `/spec.json`)
    pub spec_json_path: String,
    /// Where the documentation page is served (default: `/`)
    pub docs_path: String,
    /// Whether the documentation page is served at all
    pub serve_docs: bool,
    /// Host substituted for requests without one (default: `localhost`)
    pub placeholder_host: String,
    /// Scheme substituted for requests without one (default: `http`)
    pub placeholder_scheme: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            spec_json_path: DEFAULT_SPEC_JSON_PATH.to_string(),
            docs_path: DEFAULT_DOCS_PATH.to_string(),
            serve_docs: true,
            placeholder_host: DEFAULT_PLACEHOLDER_HOST.to_string(),
            placeholder_scheme: DEFAULT_PLACEHOLDER_SCHEME.to_string(),
        }
    }
}

impl GuardConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("SPECGUARD_SPEC_PATH") {
            if let Some(path) = endpoint_path("SPECGUARD_SPEC_PATH", path) {
                config.spec_json_path = path;
            }
        }
        if let Some(path) = lookup("SPECGUARD_DOCS_PATH") {
            if let Some(path) = endpoint_path("SPECGUARD_DOCS_PATH", path) {
                config.docs_path = path;
            }
        }
        if let Some(val) = lookup("SPECGUARD_SERVE_DOCS") {
            config.serve_docs = !matches!(
                val.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        if let Some(host) = lookup("SPECGUARD_PLACEHOLDER_HOST").filter(|h| !h.trim().is_empty()) {
            config.placeholder_host = host.trim().to_string();
        }
        if let Some(scheme) = lookup("SPECGUARD_PLACEHOLDER_SCHEME").filter(|s| !s.trim().is_empty()) {
            config.placeholder_scheme = scheme.trim().to_ascii_lowercase();
        }

        config
    }

    /// URL the documentation page uses to fetch the document.
    ///
    /// Relative (`./spec.json`) when the page is served from the root, so the
    /// page keeps working behind a path prefix.
    #[must_use]
    pub fn docs_spec_url(&self) -> String {
        if self.docs_path == "/" {
            format!(".{}", self.spec_json_path)
        } else {
            self.spec_json_path.clone()
        }
    }
}

fn endpoint_path(var: &str, value: String) -> Option<String> {
    let value = value.trim().to_string();
    if value.starts_with('/') {
        Some(value)
    } else {
        warn!(var = var, value = %value, "Ignoring endpoint path that does not start with '/'");
        None
    }
}
