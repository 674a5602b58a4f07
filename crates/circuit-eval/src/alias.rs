// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Path-alias configuration (`compilerOptions.paths` in a tsconfig-style file)

use crate::error::{EvalError, Result};
use crate::path::{collapse, join, normalize_path};
use crate::scan::strip_jsonc;
use crate::vfs::VirtualFileTable;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// A single `paths` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRule {
    /// Alias pattern, `name` or `prefix*suffix`
    pub pattern: String,
    /// Target path templates, in declaration order
    pub targets: Vec<String>,
}

impl AliasRule {
    /// Match a specifier against this rule.
    ///
    /// Returns the text substituted for `*` (empty for exact patterns).
    pub fn matches<'a>(&self, specifier: &'a str) -> Option<&'a str> {
        match self.pattern.split_once('*') {
            None => (self.pattern == specifier).then_some(""),
            Some((prefix, suffix)) => {
                if specifier.len() < prefix.len() + suffix.len() {
                    return None;
                }
                specifier
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_suffix(suffix))
            }
        }
    }
}

/// Parsed path-alias configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathAliasConfig {
    /// Directory alias targets are relative to
    pub base_directory: String,
    /// Rules, exact patterns first, then by longest wildcard prefix
    pub rules: Vec<AliasRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    compiler_options: CompilerOptions,
    #[serde(default)]
    base_directory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerOptions {
    base_url: Option<String>,
    #[serde(default)]
    paths: BTreeMap<String, Vec<String>>,
}

impl PathAliasConfig {
    /// Load the configuration from the file table.
    ///
    /// A missing file disables aliasing; a malformed one is an error.
    pub fn load(files: &VirtualFileTable, config_path: &str) -> Result<Option<Self>> {
        let Some(text) = files.get(config_path) else {
            return Ok(None);
        };
        let config = Self::parse(text).map_err(|reason| EvalError::AliasConfig {
            path: config_path.to_string(),
            reason,
        })?;
        debug!(
            "Loaded {} path alias rules from {}",
            config.rules.len(),
            config_path
        );
        Ok(Some(config))
    }

    /// Parse JSON-with-comments configuration text
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let file: ConfigFile = serde_json::from_str(&strip_jsonc(text)).map_err(|e| e.to_string())?;
        let base = file
            .base_directory
            .or(file.compiler_options.base_url)
            .unwrap_or_default();
        let base_directory = collapse(&normalize_path(&base)).unwrap_or_default();

        // Longest prefix first
        let mut rules: Vec<AliasRule> = file
            .compiler_options
            .paths
            .into_iter()
            .map(|(pattern, targets)| AliasRule { pattern, targets })
            .collect();
        rules.sort_by_key(|rule| {
            let prefix_len = rule.pattern.split('*').next().map_or(0, str::len);
            (rule.pattern.contains('*'), std::cmp::Reverse(prefix_len))
        });

        Ok(Self {
            base_directory,
            rules,
        })
    }

    /// Candidate paths for `specifier`, in the order they should be probed
    pub fn candidates(&self, specifier: &str) -> Vec<String> {
        let mut out = Vec::new();
        for rule in &self.rules {
            let Some(star) = rule.matches(specifier) else {
                continue;
            };
            for target in &rule.targets {
                let expanded = target.replacen('*', star, 1);
                let joined = join(&self.base_directory, &normalize_path(&expanded));
                if let Some(candidate) = collapse(&joined) {
                    if !out.contains(&candidate) {
                        out.push(candidate);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_matching() {
        let exact = AliasRule {
            pattern: "config".into(),
            targets: vec![],
        };
        assert_eq!(exact.matches("config"), Some(""));
        assert_eq!(exact.matches("config/x"), None);

        let wildcard = AliasRule {
            pattern: "@lib/*".into(),
            targets: vec![],
        };
        assert_eq!(wildcard.matches("@lib/x"), Some("x"));
        assert_eq!(wildcard.matches("@lib/a/b"), Some("a/b"));
        assert_eq!(wildcard.matches("@other/x"), None);

        let suffixed = AliasRule {
            pattern: "icons/*.svg".into(),
            targets: vec![],
        };
        assert_eq!(suffixed.matches("icons/led.svg"), Some("led"));
        assert_eq!(suffixed.matches("icons/led.png"), None);
    }

    #[test]
    fn test_parse_with_comments() {
        let text = r#"{
            // project aliases
            "compilerOptions": {
                "baseUrl": "./src",
                "paths": {
                    "@lib/*": ["lib/*", "vendor/*"],
                    "@/*": ["*"],
                },
            },
        }"#;
        let config = PathAliasConfig::parse(text).unwrap();
        assert_eq!(config.base_directory, "src");
        assert_eq!(config.rules[0].pattern, "@lib/*");
        assert_eq!(
            config.candidates("@lib/x"),
            vec!["src/lib/x".to_string(), "src/vendor/x".to_string()]
        );
        assert_eq!(config.candidates("@/a/b"), vec!["src/a/b".to_string()]);
    }

    #[test]
    fn test_missing_file_disables_aliases() {
        let files = VirtualFileTable::new();
        assert_eq!(PathAliasConfig::load(&files, "tsconfig.json").unwrap(), None);
    }

    #[test]
    fn test_invalid_file_is_fatal() {
        let files = VirtualFileTable::from_map([("tsconfig.json", "{ not json")]);
        let err = PathAliasConfig::load(&files, "tsconfig.json").unwrap_err();
        assert!(matches!(err, EvalError::AliasConfig { .. }));
    }
}
