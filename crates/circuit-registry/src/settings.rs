// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Layered settings: defaults, `~/.circuitrc`, project `.circuitrc`, then
//! `CIRCUIT_*` environment variables.

use circuit_eval::LoaderConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{RegistryError, Result};

/// Settings file name, looked up in the home and project directories.
pub const RC_FILE_NAME: &str = ".circuitrc";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CIRCUIT_";

/// Loader and transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Module loader configuration
    pub loader: LoaderConfig,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Connect timeout in seconds
    pub connect_timeout: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Proxy URL for all requests
    pub proxy: Option<String>,

    /// Keys this crate does not interpret
    pub extra: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            loader: LoaderConfig::default(),
            timeout: 60,
            connect_timeout: 30,
            user_agent: format!("circuit-registry/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from the default locations and the process environment.
    pub fn load() -> Result<Self> {
        let mut files = Vec::new();
        if let Some(home) = dirs::home_dir() {
            files.push(home.join(RC_FILE_NAME));
        }
        files.push(PathBuf::from(RC_FILE_NAME));
        Self::load_from(&files, std::env::vars())
    }

    /// Load settings from `files` in order, then `env`. Missing files are skipped.
    pub fn load_from<I>(files: &[PathBuf], env: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut settings = Settings::default();
        for path in files {
            if path.is_file() {
                settings.merge_from_file(path)?;
            }
        }
        settings.apply_env(env)?;
        Ok(settings)
    }

    fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        debug!("Reading settings from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        self.merge_str(&content)
    }

    /// Merge `key=value` lines. `#` and `;` start comment lines.
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                self.set(key.trim(), value.trim())?;
            }
        }
        Ok(())
    }

    /// Apply `CIRCUIT_*` variables; `CIRCUIT_SESSION_TOKEN` sets `session-token`.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                let name = name.to_lowercase().replace('_', "-");
                self.set(&name, &value)?;
            }
        }
        Ok(())
    }

    /// Set a value by its rc-file key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let loader = &mut self.loader;
        match key {
            "snippets-api-base-url" => loader.snippets_api_base_url = value.to_string(),
            "snippets-token" => loader.snippets_token = non_empty(value),
            "cdn-url" => loader.cdn_url_template = value.to_string(),
            "private-registry-url" => loader.private_registry_url = value.to_string(),
            "session-token" => loader.session_token = non_empty(value),
            "private-namespace" => loader.private_namespace = value.to_string(),
            "disable-network" => loader.disable_network = parse_flag(key, value)?,
            "asset-base-url" => loader.asset_base_url = non_empty(value),
            "package-cache-dir" => loader.package_cache_dir = value.to_string(),
            "alias-config-file" => loader.alias_config_file = value.to_string(),
            "timeout" => self.timeout = parse_secs(key, value)?,
            "connect-timeout" => self.connect_timeout = parse_secs(key, value)?,
            "user-agent" => self.user_agent = value.to_string(),
            "proxy" => self.proxy = non_empty(value),
            _ => {
                self.extra.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Get a value by its rc-file key.
    pub fn get(&self, key: &str) -> Option<String> {
        let loader = &self.loader;
        match key {
            "snippets-api-base-url" => Some(loader.snippets_api_base_url.clone()),
            "snippets-token" => loader.snippets_token.clone(),
            "cdn-url" => Some(loader.cdn_url_template.clone()),
            "private-registry-url" => Some(loader.private_registry_url.clone()),
            "session-token" => loader.session_token.clone(),
            "private-namespace" => Some(loader.private_namespace.clone()),
            "disable-network" => Some(loader.disable_network.to_string()),
            "asset-base-url" => loader.asset_base_url.clone(),
            "package-cache-dir" => Some(loader.package_cache_dir.clone()),
            "alias-config-file" => Some(loader.alias_config_file.clone()),
            "timeout" => Some(self.timeout.to_string()),
            "connect-timeout" => Some(self.connect_timeout.to_string()),
            "user-agent" => Some(self.user_agent.clone()),
            "proxy" => self.proxy.clone(),
            _ => self.extra.get(key).cloned(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> RegistryError {
    RegistryError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_skips_comments() {
        let mut settings = Settings::default();
        settings
            .merge_str("# comment\n; other\n\nsession-token = abc\ncdn-url=https://esm.sh/{specifier}\n")
            .unwrap();
        assert_eq!(settings.loader.session_token.as_deref(), Some("abc"));
        assert_eq!(settings.loader.cdn_url("react"), "https://esm.sh/react");
    }

    #[test]
    fn test_env_overrides_files() {
        let home = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let home_rc = home.path().join(RC_FILE_NAME);
        let project_rc = project.path().join(RC_FILE_NAME);
        std::fs::write(&home_rc, "timeout=10\nsession-token=home\n").unwrap();
        std::fs::write(&project_rc, "session-token=project\n").unwrap();

        let env = vec![
            ("CIRCUIT_DISABLE_NETWORK".to_string(), "true".to_string()),
            ("CIRCUIT_ASSET_BASE_URL".to_string(), "https://x/y".to_string()),
            ("PATH".to_string(), "/bin".to_string()),
        ];
        let missing = project.path().join("absent");
        let settings = Settings::load_from(&[home_rc, project_rc, missing], env).unwrap();

        assert_eq!(settings.timeout, 10);
        assert_eq!(settings.loader.session_token.as_deref(), Some("project"));
        assert!(settings.loader.disable_network);
        assert_eq!(settings.loader.asset_base_url.as_deref(), Some("https://x/y"));
        assert!(settings.extra.is_empty());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set("timeout", "soon"),
            Err(RegistryError::InvalidSetting { .. })
        ));
        assert!(settings.set("disable-network", "maybe").is_err());
    }

    #[test]
    fn test_unknown_keys_kept() {
        let mut settings = Settings::default();
        settings.set("color", "always").unwrap();
        assert_eq!(settings.get("color").as_deref(), Some("always"));
        assert_eq!(settings.get("timeout").as_deref(), Some("60"));
        assert_eq!(settings.get("proxy"), None);
    }
}
