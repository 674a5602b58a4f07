// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Virtual file table and pluggable filesystem handlers

use crate::error::{EvalError, Result};
use crate::path::normalize_path;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// In-memory file table keyed by normalized path.
///
/// Keys are normalized on every insert and lookup.
#[derive(Debug, Clone, Default)]
pub struct VirtualFileTable {
    files: BTreeMap<String, String>,
}

impl VirtualFileTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from host-supplied, possibly un-normalized paths
    pub fn from_map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut table = Self::new();
        for (path, content) in entries {
            table.insert(path.as_ref(), content);
        }
        table
    }

    /// Snapshot every file a filesystem handler exposes
    pub fn from_fs(fs: &dyn FileSystem) -> Result<Self> {
        let mut table = Self::new();
        for path in fs.list_files()? {
            if let Some(content) = fs.read_file(&path)? {
                table.insert(&path, content);
            }
        }
        debug!("Snapshotted {} files from filesystem handler", table.len());
        Ok(table)
    }

    /// Insert or replace a file
    pub fn insert(&mut self, path: &str, content: impl Into<String>) {
        self.files.insert(normalize_path(path), content.into());
    }

    /// Read a file
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(&normalize_path(path)).map(String::as_str)
    }

    /// Check whether a file exists
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    /// Check whether any file lives under `dir`
    pub fn has_files_under(&self, dir: &str) -> bool {
        let prefix = format!("{}/", normalize_path(dir).trim_end_matches('/'));
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }

    /// All file paths, sorted
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A pluggable, read-only filesystem handler
pub trait FileSystem: Send + Sync {
    /// Read one file, `None` when it does not exist
    fn read_file(&self, path: &str) -> Result<Option<String>>;

    /// List every readable file path
    fn list_files(&self) -> Result<Vec<String>>;
}

/// Filesystem handler over a host-supplied map
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<String, String>,
}

impl MemoryFs {
    /// Create a handler over `files`
    pub fn new(files: BTreeMap<String, String>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|(path, content)| (normalize_path(&path), content))
                .collect(),
        }
    }
}

impl FileSystem for MemoryFs {
    fn read_file(&self, path: &str) -> Result<Option<String>> {
        Ok(self.files.get(&normalize_path(path)).cloned())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }
}

/// Filesystem handler over a directory on disk.
///
/// Hidden directories are skipped. Files that are not valid UTF-8 are read
/// lossily so binary assets still get an entry.
#[derive(Debug, Clone)]
pub struct DirectoryFs {
    root: PathBuf,
}

impl DirectoryFs {
    /// Create a handler rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSystem for DirectoryFs {
    fn read_file(&self, path: &str) -> Result<Option<String>> {
        let full = self.root.join(normalize_path(path));
        if !full.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(&full)?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root).into_iter().filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        });
        for entry in walker {
            let entry = entry.map_err(|e| EvalError::Io(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                files.push(normalize_path(&relative.to_string_lossy()));
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_keys() {
        let table = VirtualFileTable::from_map([("./src/a.tsx", "a"), ("\\lib\\b.ts", "b")]);
        assert_eq!(table.get("src/a.tsx"), Some("a"));
        assert_eq!(table.get("/src/a.tsx"), Some("a"));
        assert_eq!(table.get("lib/b.ts"), Some("b"));
        assert!(table.contains("./lib/b.ts"));
    }

    #[test]
    fn test_has_files_under() {
        let table = VirtualFileTable::from_map([
            ("node_modules/foo/index.js", ""),
            ("node_modules/foobar/index.js", ""),
        ]);
        assert!(table.has_files_under("node_modules/foo"));
        assert!(!table.has_files_under("node_modules/fo"));
        assert!(!table.has_files_under("node_modules/baz"));
    }

    #[test]
    fn test_memory_fs_snapshot() {
        let mut files = BTreeMap::new();
        files.insert("./index.tsx".to_string(), "x".to_string());
        let fs = MemoryFs::new(files);
        let table = VirtualFileTable::from_fs(&fs).unwrap();
        assert_eq!(table.get("index.tsx"), Some("x"));
    }

    #[test]
    fn test_directory_fs_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("src/board.tsx"), "board").unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();

        let fs = DirectoryFs::new(dir.path());
        let table = VirtualFileTable::from_fs(&fs).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("src/board.tsx"), Some("board"));
    }
}
