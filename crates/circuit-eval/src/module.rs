// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module identity and records

use crate::exports::ModuleExports;
use crate::path::{extension, is_url, normalize_path};
use std::fmt;
use std::sync::Arc;

/// Extensions appended to a bare path while probing, in resolution order
pub const PROBE_EXTENSIONS: &[&str] = &[".tsx", ".ts", ".json", ".js", ".jsx"];

/// Extensions compiled and executed as code
pub const CODE_EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs",
];

/// Extensions treated as opaque static assets
pub const STATIC_ASSET_EXTENSIONS: &[&str] = &[
    ".glb", ".gltf", ".obj", ".stl", ".step", ".stp", ".wrl", ".vrml", ".png", ".jpg", ".jpeg",
    ".gif", ".svg", ".webp", ".bin",
];

/// Footprint design files handled by the external converter
pub const FOREIGN_FORMAT_EXTENSIONS: &[&str] = &[".kicad_mod"];

/// How a module's content is turned into exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Structured data, exported as `default`
    Json,
    /// Compiled and executed
    Code,
    /// Opaque asset, exported as a reference handle
    StaticAsset,
    /// Footprint design file, converted by the external converter
    ForeignFormat,
}

impl SourceKind {
    /// Classify a path by extension, `None` for unsupported extensions
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = extension(path)?;
        let ext = ext.as_str();
        if ext == ".json" {
            Some(Self::Json)
        } else if CODE_EXTENSIONS.contains(&ext) {
            Some(Self::Code)
        } else if STATIC_ASSET_EXTENSIONS.contains(&ext) {
            Some(Self::StaticAsset)
        } else if FOREIGN_FORMAT_EXTENSIONS.contains(&ext) {
            Some(Self::ForeignFormat)
        } else {
            None
        }
    }
}

/// Check if a path is TypeScript source
pub fn is_typescript_file(path: &str) -> bool {
    matches!(
        extension(path).as_deref(),
        Some(".ts" | ".tsx" | ".mts" | ".cts")
    )
}

/// Check if a path may contain embedded markup syntax
pub fn is_jsx_file(path: &str) -> bool {
    matches!(extension(path).as_deref(), Some(".jsx" | ".tsx"))
}

/// Canonical identity of a loadable unit: a normalized file path or a URL.
///
/// Two ids are equal iff their normalized string forms are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedModuleId(String);

impl ResolvedModuleId {
    /// Create an id, normalizing file paths (URLs are kept verbatim)
    pub fn new(id: impl AsRef<str>) -> Self {
        let id = id.as_ref();
        if is_url(id) {
            Self(id.to_string())
        } else {
            Self(normalize_path(id))
        }
    }

    /// String form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id points at a remote module
    pub fn is_remote(&self) -> bool {
        is_url(&self.0)
    }

    /// Directory nested imports of this module resolve against
    pub fn directory(&self) -> String {
        match self.0.rfind('/') {
            Some(idx) => self.0[..idx].to_string(),
            None => String::new(),
        }
    }
}

impl fmt::Display for ResolvedModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResolvedModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// An evaluated module
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Module identity
    pub id: ResolvedModuleId,
    /// How the module was loaded
    pub source_kind: SourceKind,
    /// The module's exports
    pub exports: Arc<ModuleExports>,
}
