// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Specifier resolution over the virtual file table
//!
//! Pure lookups: nothing here touches the network or a real filesystem.

use crate::alias::PathAliasConfig;
use crate::error::Result;
use crate::manifest::{MANIFEST_FILE, PackageManifest};
use crate::module::{PROBE_EXTENSIONS, ResolvedModuleId};
use crate::path::{ancestors, is_absolute, is_relative, join, normalize_path, resolve_relative};
use crate::vfs::VirtualFileTable;
use tracing::{debug, trace};

/// Maps raw specifiers to files in a [`VirtualFileTable`]
pub struct SpecifierResolver<'a> {
    files: &'a VirtualFileTable,
    aliases: Option<&'a PathAliasConfig>,
    cache_dir: &'a str,
}

impl<'a> SpecifierResolver<'a> {
    /// Create a resolver
    pub fn new(
        files: &'a VirtualFileTable,
        aliases: Option<&'a PathAliasConfig>,
        cache_dir: &'a str,
    ) -> Self {
        Self {
            files,
            aliases,
            cache_dir,
        }
    }

    /// Resolve `specifier` imported from `current_dir`.
    ///
    /// Returns `Ok(None)` when nothing matches. Errors only when a relative
    /// path climbs above the root or a package manifest is malformed.
    pub fn resolve(&self, specifier: &str, current_dir: &str) -> Result<Option<ResolvedModuleId>> {
        if let Some(aliases) = self.aliases {
            for candidate in aliases.candidates(specifier) {
                if let Some(found) = self.probe(&candidate) {
                    debug!("Resolved '{}' through path alias to {}", specifier, found);
                    return Ok(Some(found));
                }
            }
        }

        if is_relative(specifier) || is_absolute(specifier) {
            let path = resolve_relative(current_dir, specifier)?;
            return Ok(self.probe(&path));
        }

        let verbatim = normalize_path(specifier);
        if self.files.contains(&verbatim) {
            return Ok(Some(ResolvedModuleId::new(verbatim)));
        }
        if let Some(found) = self.probe(&verbatim) {
            return Ok(Some(found));
        }

        self.resolve_package(specifier, current_dir)
    }

    /// Try `path`, `path` plus each probe extension, then `path/index` plus
    /// each probe extension
    pub fn probe(&self, path: &str) -> Option<ResolvedModuleId> {
        let path = path.trim_end_matches('/');
        if !path.is_empty() && self.files.contains(path) {
            return Some(ResolvedModuleId::new(path));
        }
        for ext in PROBE_EXTENSIONS {
            let with_ext = format!("{}{}", path, ext);
            if !path.is_empty() && self.files.contains(&with_ext) {
                return Some(ResolvedModuleId::new(with_ext));
            }
        }
        for ext in PROBE_EXTENSIONS {
            let index = join(path, &format!("index{}", ext));
            if self.files.contains(&index) {
                return Some(ResolvedModuleId::new(index));
            }
        }
        None
    }

    /// Resolve through the package cache, walking from `current_dir` up to
    /// the root
    fn resolve_package(&self, specifier: &str, current_dir: &str) -> Result<Option<ResolvedModuleId>> {
        let (package_name, subpath) = parse_package_specifier(specifier);
        if package_name.is_empty() {
            return Ok(None);
        }

        for dir in ancestors(current_dir) {
            let package_dir = join(&join(&dir, self.cache_dir), package_name);
            trace!("Looking for '{}' in {}", package_name, package_dir);
            if let Some(found) = self.resolve_package_dir(&package_dir, subpath)? {
                debug!("Resolved '{}' from package cache to {}", specifier, found);
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn resolve_package_dir(
        &self,
        package_dir: &str,
        subpath: Option<&str>,
    ) -> Result<Option<ResolvedModuleId>> {
        let manifest = PackageManifest::load(self.files, &join(package_dir, MANIFEST_FILE))?;

        if let Some(sub) = subpath {
            if let Some(target) = manifest.as_ref().and_then(|m| m.export_target(sub)) {
                if let Some(found) = self.probe(&join(package_dir, &target)) {
                    return Ok(Some(found));
                }
            }
            return Ok(self.probe(&join(package_dir, sub)));
        }

        if let Some(manifest) = &manifest {
            let declared = [
                manifest.export_target("."),
                manifest.module.clone(),
                manifest.main.clone(),
            ];
            for entry in declared.into_iter().flatten() {
                let entry = entry.trim_start_matches("./");
                if let Some(found) = self.probe(&join(package_dir, entry)) {
                    return Ok(Some(found));
                }
            }
        }

        // Last resort, with or without a manifest
        Ok(self.probe(package_dir))
    }
}

/// Split a bare specifier into package name and optional subpath.
///
/// Scoped names (`@scope/name`) consume two segments.
pub fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    if specifier.starts_with('@') {
        if let Some(slash_pos) = specifier[1..].find('/') {
            let after_scope = &specifier[slash_pos + 2..];
            if let Some(subpath_pos) = after_scope.find('/') {
                let name_end = slash_pos + 2 + subpath_pos;
                return (&specifier[..name_end], Some(&specifier[name_end + 1..]));
            }
        }
        (specifier, None)
    } else if let Some(slash_pos) = specifier.find('/') {
        (&specifier[..slash_pos], Some(&specifier[slash_pos + 1..]))
    } else {
        (specifier, None)
    }
}
