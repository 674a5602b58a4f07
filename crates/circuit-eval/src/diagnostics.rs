// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Diagnostics for unresolved packages and runtime failures
//!
//! When a bare specifier cannot be satisfied from the package cache,
//! [`diagnose_package`] explains exactly why. [`enrich_runtime_error`] points
//! a runtime failure at the offending source line.

use crate::error::{EvalError, ExecutionError};
use crate::manifest::{MANIFEST_FILE, PackageManifest};
use crate::module::{PROBE_EXTENSIONS, SourceKind};
use crate::path::{ancestors, extension, join, normalize_path};
use crate::resolver::parse_package_specifier;
use crate::sourcemap::SourceMap;
use crate::vfs::VirtualFileTable;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Why a package-cache import could not be satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureScenario {
    /// The root manifest does not declare the package
    NotDeclared,
    /// No files exist under the package's cache directory
    NotInstalled,
    /// Files exist but the package has no manifest
    MissingManifest,
    /// The declared entrypoint is not a loadable source kind
    UnsupportedEntrypoint,
    /// The declared entrypoint file does not exist
    EntrypointMissing,
    /// The manifest declares no entrypoint and there is no index file
    NoEntrypoint,
}

impl fmt::Display for FailureScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotDeclared => "not declared in package.json",
            Self::NotInstalled => "no files in cache directory",
            Self::MissingManifest => "missing package.json",
            Self::UnsupportedEntrypoint => "unsupported entrypoint",
            Self::EntrypointMissing => "entrypoint missing",
            Self::NoEntrypoint => "no entrypoint",
        };
        f.write_str(label)
    }
}

/// The outcome of diagnosing one unresolved package specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDiagnosis {
    /// Package name (`@scope/name` or `name`)
    pub package: String,
    /// The single scenario that applies
    pub scenario: FailureScenario,
    /// Explanation shown to the user
    pub message: String,
}

impl PackageDiagnosis {
    /// Convert into a resolution error for `specifier`
    pub fn into_error(self, specifier: &str) -> EvalError {
        EvalError::Resolution {
            specifier: specifier.to_string(),
            reason: self.message,
            scenario: Some(self.scenario),
        }
    }
}

/// Check whether files for `specifier`'s package exist under any cache
/// directory visible from `current_dir`
pub fn package_files_present(
    files: &VirtualFileTable,
    specifier: &str,
    current_dir: &str,
    cache_dir: &str,
) -> bool {
    find_package_dir(files, specifier, current_dir, cache_dir).is_some()
}

/// Work out which [`FailureScenario`] applies to an unresolved bare specifier.
///
/// Checks run in a fixed order and the first failing check wins.
pub fn diagnose_package(
    files: &VirtualFileTable,
    specifier: &str,
    current_dir: &str,
    cache_dir: &str,
) -> PackageDiagnosis {
    let (package, subpath) = parse_package_specifier(specifier);
    let diagnosis = |scenario, message: String| PackageDiagnosis {
        package: package.to_string(),
        scenario,
        message,
    };

    // A root manifest that exists but is unreadable cannot confirm declarations
    let declared = match PackageManifest::load(files, MANIFEST_FILE) {
        Ok(Some(root)) => root.declares(package),
        Ok(None) => true,
        Err(_) => false,
    };
    if !declared {
        return diagnosis(
            FailureScenario::NotDeclared,
            format!(
                "Package '{}' is not declared in package.json. Add it to \"dependencies\" and install it.",
                package
            ),
        );
    }

    let Some(package_dir) = find_package_dir(files, specifier, current_dir, cache_dir) else {
        return diagnosis(
            FailureScenario::NotInstalled,
            format!(
                "Package '{}' is declared but no files were found under {}/{}. Install your dependencies.",
                package, cache_dir, package
            ),
        );
    };

    let manifest_path = join(&package_dir, MANIFEST_FILE);
    let manifest = match PackageManifest::load(files, &manifest_path) {
        Ok(Some(manifest)) => manifest,
        Ok(None) | Err(_) => {
            return diagnosis(
                FailureScenario::MissingManifest,
                format!(
                    "{} contains files but no readable {}.",
                    package_dir, MANIFEST_FILE
                ),
            );
        }
    };

    let entrypoint = match subpath {
        Some(sub) => Some(manifest.export_target(sub).unwrap_or_else(|| sub.to_string())),
        None => manifest.declared_entrypoint(),
    };

    let Some(entrypoint) = entrypoint else {
        return diagnosis(
            FailureScenario::NoEntrypoint,
            format!(
                "Package '{}' declares no entrypoint (\"exports\", \"module\" or \"main\") and has no index file.",
                package
            ),
        );
    };

    let entry_path = join(&package_dir, &entrypoint);
    let supported = match extension(&entry_path) {
        Some(_) => matches!(
            SourceKind::from_path(&entry_path),
            Some(SourceKind::Code | SourceKind::Json)
        ),
        None => true,
    };
    if !supported {
        return diagnosis(
            FailureScenario::UnsupportedEntrypoint,
            format!(
                "Entrypoint '{}' of package '{}' is not a supported source file.",
                entrypoint, package
            ),
        );
    }

    diagnosis(
        FailureScenario::EntrypointMissing,
        if exists_with_probing(files, &entry_path) {
            format!(
                "Entrypoint '{}' of package '{}' exists but could not be resolved.",
                entrypoint, package
            )
        } else {
            format!(
                "Entrypoint '{}' declared by package '{}' does not exist.",
                entrypoint, package
            )
        },
    )
}

fn find_package_dir(
    files: &VirtualFileTable,
    specifier: &str,
    current_dir: &str,
    cache_dir: &str,
) -> Option<String> {
    let (package, _) = parse_package_specifier(specifier);
    ancestors(current_dir)
        .into_iter()
        .map(|dir| join(&join(&dir, cache_dir), package))
        .find(|candidate| files.has_files_under(candidate))
}

fn exists_with_probing(files: &VirtualFileTable, path: &str) -> bool {
    files.contains(path)
        || PROBE_EXTENSIONS
            .iter()
            .any(|ext| files.contains(&format!("{}{}", path, ext)))
}

static STACK_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\w@$.\-/:]+?\.(?:tsx|ts|jsx|js|mjs|cjs)):(\d+):(\d+)")
        .expect("valid stack location regex")
});

/// Append the offending source line to a runtime error message.
///
/// Looks for the first `path:line:column` in the stack text that names a
/// known module, reverse-maps it through that module's source map when one
/// was recorded, and appends the line. Returns the message unchanged when
/// nothing matches.
pub fn enrich_runtime_error(
    error: &ExecutionError,
    files: &VirtualFileTable,
    source_maps: &HashMap<String, SourceMap>,
) -> String {
    let Some(stack) = error.stack.as_deref() else {
        return error.message.clone();
    };

    for captures in STACK_LOCATION.captures_iter(stack) {
        let path = normalize_path(&captures[1]);
        let (Ok(line), Ok(column)) = (captures[2].parse::<u32>(), captures[3].parse::<u32>()) else {
            continue;
        };

        if let Some(original) = source_maps.get(&path).and_then(|map| map.lookup(line, column)) {
            let text = original.source_line.or_else(|| {
                source_line(files.get(&normalize_path(&original.source))?, original.line)
            });
            if let Some(text) = text {
                return format_enriched(&error.message, &original.source, original.line, &text);
            }
        }

        if let Some(text) = files.get(&path).and_then(|source| source_line(source, line)) {
            return format_enriched(&error.message, &path, line, &text);
        }
    }

    error.message.clone()
}

fn source_line(source: &str, line: u32) -> Option<String> {
    source
        .lines()
        .nth(line.checked_sub(1)? as usize)
        .map(|l| l.trim_end().to_string())
}

fn format_enriched(message: &str, path: &str, line: u32, text: &str) -> String {
    format!("{}\n\n  at {}:{}\n  > {}", message, path, line, text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str)]) -> VirtualFileTable {
        VirtualFileTable::from_map(entries.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[test]
    fn test_not_declared() {
        let files = table(&[("package.json", r#"{"dependencies": {}}"#)]);
        let d = diagnose_package(&files, "foo", "", "node_modules");
        assert_eq!(d.scenario, FailureScenario::NotDeclared);
        assert_eq!(d.package, "foo");
    }

    #[test]
    fn test_declared_but_not_installed() {
        let files = table(&[("package.json", r#"{"dependencies": {"foo": "^1.0.0"}}"#)]);
        let d = diagnose_package(&files, "foo", "src", "node_modules");
        assert_eq!(d.scenario, FailureScenario::NotInstalled);
        assert!(d.message.contains("no files were found under node_modules/foo"));
    }

    #[test]
    fn test_missing_manifest() {
        let files = table(&[
            ("package.json", r#"{"dependencies": {"foo": "1"}}"#),
            ("node_modules/foo/lib.js", "export {}"),
        ]);
        let d = diagnose_package(&files, "foo", "", "node_modules");
        assert_eq!(d.scenario, FailureScenario::MissingManifest);
    }

    #[test]
    fn test_entrypoint_scenarios() {
        let unsupported = table(&[
            ("node_modules/foo/package.json", r#"{"main": "index.wasm"}"#),
            ("node_modules/foo/index.wasm", ""),
        ]);
        assert_eq!(
            diagnose_package(&unsupported, "foo", "", "node_modules").scenario,
            FailureScenario::UnsupportedEntrypoint
        );

        let missing = table(&[("node_modules/foo/package.json", r#"{"main": "dist/index.js"}"#)]);
        assert_eq!(
            diagnose_package(&missing, "foo", "", "node_modules").scenario,
            FailureScenario::EntrypointMissing
        );

        let none = table(&[("node_modules/foo/package.json", r#"{"name": "foo"}"#)]);
        assert_eq!(
            diagnose_package(&none, "foo", "", "node_modules").scenario,
            FailureScenario::NoEntrypoint
        );
    }

    #[test]
    fn test_nested_cache_dir_and_scoped_package() {
        let files = table(&[
            ("packages/app/node_modules/@acme/parts/package.json", r#"{"main": "gone.js"}"#),
        ]);
        let d = diagnose_package(&files, "@acme/parts/sub", "packages/app/src", "node_modules");
        assert_eq!(d.package, "@acme/parts");
        assert_eq!(d.scenario, FailureScenario::EntrypointMissing);
        assert!(package_files_present(&files, "@acme/parts", "packages/app/src", "node_modules"));
        assert!(!package_files_present(&files, "@acme/parts", "", "node_modules"));
    }

    #[test]
    fn test_scenario_attached_to_error() {
        let files = table(&[("package.json", r#"{"dependencies": {"foo": "1"}}"#)]);
        let err = diagnose_package(&files, "foo", "", "node_modules").into_error("foo");
        assert_eq!(err.scenario(), Some(FailureScenario::NotInstalled));
    }

    #[test]
    fn test_enrich_runtime_error_with_source_line() {
        let files = table(&[("src/board.tsx", "const x = 1\nthrow new Error('boom')\n")]);
        let err = ExecutionError::new("boom").with_stack("Error: boom\n    at src/board.tsx:2:7");
        let msg = enrich_runtime_error(&err, &files, &HashMap::new());
        assert!(msg.starts_with("boom"));
        assert!(msg.contains("at src/board.tsx:2"));
        assert!(msg.contains("> throw new Error('boom')"));
    }

    #[test]
    fn test_enrich_runtime_error_through_source_map() {
        let files = table(&[("board.tsx", "// original\nboom()")]);
        let map = SourceMap::parse(r#"{"sources":["board.tsx"],"mappings":";;AACA"}"#).unwrap();
        let mut maps = HashMap::new();
        maps.insert("board.tsx".to_string(), map);

        let err = ExecutionError::new("boom is not defined").with_stack("at board.tsx:3:1");
        let msg = enrich_runtime_error(&err, &files, &maps);
        assert!(msg.contains("at board.tsx:2"));
        assert!(msg.contains("> boom()"));
    }

    #[test]
    fn test_enrich_without_stack_is_identity() {
        let err = ExecutionError::new("plain");
        assert_eq!(enrich_runtime_error(&err, &VirtualFileTable::new(), &HashMap::new()), "plain");
    }
}
