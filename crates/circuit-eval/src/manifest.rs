// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Package manifest (`package.json`) model

use crate::error::{EvalError, Result};
use crate::vfs::VirtualFileTable;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Manifest file name inside a package directory
pub const MANIFEST_FILE: &str = "package.json";

/// Export conditions tried, in order, when an `exports` entry is a condition map
pub const EXPORT_CONDITIONS: &[&str] = &["import", "default", "require", "node", "browser"];

/// The subset of `package.json` used for resolution and diagnostics
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Package name
    pub name: Option<String>,

    /// Main entry point
    pub main: Option<String>,

    /// Module entry point (ES modules)
    pub module: Option<String>,

    /// Exports field (package exports)
    pub exports: Option<serde_json::Value>,

    /// Production dependencies
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Development dependencies
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,

    /// Peer dependencies
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,

    /// Optional dependencies
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Parse manifest text
    pub fn parse(path: &str, text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| EvalError::Manifest {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Read and parse a manifest from the file table, `None` when absent
    pub fn load(files: &VirtualFileTable, path: &str) -> Result<Option<Self>> {
        files.get(path).map(|text| Self::parse(path, text)).transpose()
    }

    /// Check whether any dependency map declares `name`
    pub fn declares(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
            || self.dev_dependencies.contains_key(name)
            || self.peer_dependencies.contains_key(name)
            || self.optional_dependencies.contains_key(name)
    }

    /// Resolve a subpath (`"."` for the package root) through the `exports` map.
    ///
    /// Returns the package-relative target, without a leading `./`.
    pub fn export_target(&self, subpath: &str) -> Option<String> {
        let exports = self.exports.as_ref()?;
        let key = if subpath == "." || subpath.is_empty() {
            ".".to_string()
        } else {
            format!("./{}", subpath.trim_start_matches("./"))
        };

        match exports {
            serde_json::Value::String(target) if key == "." => Some(strip_dot(target)),
            serde_json::Value::Object(map) => {
                let is_subpath_map = map.keys().any(|k| k.starts_with('.'));
                if !is_subpath_map {
                    // Conditions directly at the top level apply to "."
                    return (key == ".").then(|| pick_condition(exports)).flatten();
                }
                if let Some(entry) = map.get(&key) {
                    return pick_condition(entry);
                }
                // Wildcard subpath patterns: "./features/*": "./src/features/*.js"
                for (pattern, entry) in map {
                    let Some((prefix, suffix)) = pattern.split_once('*') else {
                        continue;
                    };
                    if let Some(star) = key
                        .strip_prefix(prefix)
                        .and_then(|rest| rest.strip_suffix(suffix))
                    {
                        return pick_condition(entry).map(|t| t.replace('*', star));
                    }
                }
                None
            }
            _ => None,
        }
    }

    /// The entrypoint the manifest declares for the package root:
    /// `exports["."]`, then `module`, then `main`
    pub fn declared_entrypoint(&self) -> Option<String> {
        self.export_target(".")
            .or_else(|| self.module.as_deref().map(strip_dot))
            .or_else(|| self.main.as_deref().map(strip_dot))
    }
}

/// Pick the first matching condition from an exports entry
fn pick_condition(entry: &serde_json::Value) -> Option<String> {
    match entry {
        serde_json::Value::String(target) => Some(strip_dot(target)),
        serde_json::Value::Object(map) => EXPORT_CONDITIONS
            .iter()
            .filter_map(|condition| map.get(*condition))
            .find_map(pick_condition),
        serde_json::Value::Array(items) => items.iter().find_map(pick_condition),
        _ => None,
    }
}

fn strip_dot(target: &str) -> String {
    target.trim_start_matches("./").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: serde_json::Value) -> PackageManifest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_declares() {
        let m = manifest(json!({
            "dependencies": { "a": "1" },
            "devDependencies": { "b": "1" },
            "peerDependencies": { "c": "1" },
            "optionalDependencies": { "d": "1" }
        }));
        for name in ["a", "b", "c", "d"] {
            assert!(m.declares(name), "{name} should be declared");
        }
        assert!(!m.declares("e"));
    }

    #[test]
    fn test_string_exports() {
        let m = manifest(json!({ "exports": "./dist/index.js" }));
        assert_eq!(m.export_target(".").as_deref(), Some("dist/index.js"));
        assert_eq!(m.export_target("sub"), None);
    }

    #[test]
    fn test_conditional_exports_order() {
        let m = manifest(json!({
            "exports": {
                ".": {
                    "require": "./dist/index.cjs",
                    "import": "./dist/index.mjs"
                },
                "./utils": { "default": "./dist/utils.js" },
                "./icons/*": "./dist/icons/*.js"
            }
        }));
        assert_eq!(m.export_target(".").as_deref(), Some("dist/index.mjs"));
        assert_eq!(m.export_target("utils").as_deref(), Some("dist/utils.js"));
        assert_eq!(m.export_target("icons/led").as_deref(), Some("dist/icons/led.js"));
    }

    #[test]
    fn test_top_level_conditions() {
        let m = manifest(json!({
            "exports": { "node": "./node.js", "browser": "./browser.js" }
        }));
        assert_eq!(m.export_target(".").as_deref(), Some("node.js"));
    }

    #[test]
    fn test_declared_entrypoint_precedence() {
        let m = manifest(json!({ "main": "./main.js", "module": "./module.js" }));
        assert_eq!(m.declared_entrypoint().as_deref(), Some("module.js"));

        let m = manifest(json!({ "main": "main.js" }));
        assert_eq!(m.declared_entrypoint().as_deref(), Some("main.js"));

        let m = manifest(json!({}));
        assert_eq!(m.declared_entrypoint(), None);
    }
}
