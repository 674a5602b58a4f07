// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader and evaluator configuration

use serde::{Deserialize, Serialize};

/// Default snippet registry base URL
pub const DEFAULT_SNIPPETS_API_BASE_URL: &str = "https://registry-api.tscircuit.com/snippets";

/// Default public CDN template, `{specifier}` is substituted
pub const DEFAULT_CDN_URL_TEMPLATE: &str = "https://cdn.jsdelivr.net/npm/{specifier}/+esm";

/// Default private package registry
pub const DEFAULT_PRIVATE_REGISTRY_URL: &str = "https://npm.tscircuit.com";

/// Default private namespace
pub const DEFAULT_PRIVATE_NAMESPACE: &str = "@tsci";

/// Default import recursion ceiling
pub const DEFAULT_MAX_IMPORT_DEPTH: usize = 5;

/// Where and how remote and cached modules are loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderConfig {
    /// Snippet registry base URL
    pub snippets_api_base_url: String,
    /// Bearer token for the snippet registry, falls back to the session token
    pub snippets_token: Option<String>,
    /// Public CDN URL template
    pub cdn_url_template: String,
    /// Private registry base URL
    pub private_registry_url: String,
    /// Session token for the private registry
    pub session_token: Option<String>,
    /// Namespace served by the snippet and private registries
    pub private_namespace: String,
    /// Never go to the network for bare specifiers
    pub disable_network: bool,
    /// Base URL placeholder-marked static assets are served from
    pub asset_base_url: Option<String>,
    /// Package cache directory name
    pub package_cache_dir: String,
    /// Path-alias configuration file
    pub alias_config_file: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            snippets_api_base_url: DEFAULT_SNIPPETS_API_BASE_URL.to_string(),
            snippets_token: None,
            cdn_url_template: DEFAULT_CDN_URL_TEMPLATE.to_string(),
            private_registry_url: DEFAULT_PRIVATE_REGISTRY_URL.to_string(),
            session_token: None,
            private_namespace: DEFAULT_PRIVATE_NAMESPACE.to_string(),
            disable_network: false,
            asset_base_url: None,
            package_cache_dir: "node_modules".to_string(),
            alias_config_file: "tsconfig.json".to_string(),
        }
    }
}

impl LoaderConfig {
    /// Token sent to the snippet registry
    pub fn snippet_bearer(&self) -> Option<&str> {
        self.snippets_token
            .as_deref()
            .or(self.session_token.as_deref())
    }

    /// Public CDN URL for a bare specifier
    pub fn cdn_url(&self, specifier: &str) -> String {
        self.cdn_url_template.replace("{specifier}", specifier)
    }

    /// Whether `specifier` lives in the private namespace
    pub fn is_private(&self, specifier: &str) -> bool {
        specifier
            .strip_prefix(self.private_namespace.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Evaluator options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvalOptions {
    /// Imports nested deeper than this are skipped with a warning
    pub max_import_depth: usize,
    /// Loader configuration
    pub loader: LoaderConfig,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_import_depth: DEFAULT_MAX_IMPORT_DEPTH,
            loader: LoaderConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EvalOptions::default();
        assert_eq!(options.max_import_depth, 5);
        assert_eq!(options.loader.package_cache_dir, "node_modules");
        assert!(!options.loader.disable_network);
    }

    #[test]
    fn test_cdn_url() {
        let config = LoaderConfig::default();
        assert_eq!(
            config.cdn_url("lodash/get"),
            "https://cdn.jsdelivr.net/npm/lodash/get/+esm"
        );
    }

    #[test]
    fn test_private_namespace() {
        let config = LoaderConfig::default();
        assert!(config.is_private("@tsci/seveibar.led"));
        assert!(!config.is_private("@tscircuit/core"));
        assert!(!config.is_private("react"));
    }

    #[test]
    fn test_snippet_bearer_fallback() {
        let mut config = LoaderConfig {
            session_token: Some("session".into()),
            ..LoaderConfig::default()
        };
        assert_eq!(config.snippet_bearer(), Some("session"));
        config.snippets_token = Some("snippet".into());
        assert_eq!(config.snippet_bearer(), Some("snippet"));
    }

    #[test]
    fn test_partial_deserialize() {
        let config: LoaderConfig =
            serde_json::from_str(r#"{"disableNetwork": true, "assetBaseUrl": "https://x/y"}"#).unwrap();
        assert!(config.disable_network);
        assert_eq!(config.asset_base_url.as_deref(), Some("https://x/y"));
        assert_eq!(config.private_namespace, "@tsci");
    }
}
