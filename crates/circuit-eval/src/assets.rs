// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Static asset reference handles

use crate::path::{extension, normalize_path};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// File content marking an asset served from the configured base URL
pub const STATIC_ASSET_PLACEHOLDER: &str = "__STATIC_ASSET__";

/// Prefixes of content that already is an external reference
pub const EXTERNAL_REFERENCE_PREFIXES: &[&str] = &["http://", "https://", "blob:", "data:"];

const BLOB_PREFIX: &str = "blob:circuit-eval/";

/// Process-local store backing `blob:` reference handles
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    blobs: Arc<DashMap<String, Arc<str>>>,
}

impl BlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store content, returning its handle (without extension fragment)
    pub fn insert(&self, content: &str) -> String {
        let url = format!("{}{}", BLOB_PREFIX, Uuid::new_v4());
        self.blobs.insert(url.clone(), Arc::from(content));
        url
    }

    /// Look up a handle; any `#` fragment is ignored
    pub fn get(&self, handle: &str) -> Option<Arc<str>> {
        let key = handle.split('#').next().unwrap_or(handle);
        self.blobs.get(key).map(|entry| entry.value().clone())
    }

    /// Drop a handle's content
    pub fn revoke(&self, handle: &str) -> bool {
        let key = handle.split('#').next().unwrap_or(handle);
        self.blobs.remove(key).is_some()
    }

    /// Drop every stored blob
    pub fn clear(&self) {
        self.blobs.clear();
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

/// Handles created during one run, revoked when the run is dropped
#[derive(Debug)]
pub(crate) struct BlobLease {
    store: BlobStore,
    handles: Vec<String>,
}

impl BlobLease {
    pub(crate) fn new(store: BlobStore) -> Self {
        Self {
            store,
            handles: Vec::new(),
        }
    }

    /// Remember `handle` if it points into this lease's store
    pub(crate) fn track(&mut self, handle: &str) {
        if handle.starts_with(BLOB_PREFIX) {
            self.handles.push(handle.to_string());
        }
    }
}

impl Drop for BlobLease {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            self.store.revoke(&handle);
        }
    }
}

/// Build the reference handle for a static asset at `path`.
///
/// Placeholder-marked content maps to `base_url` plus the path. Content that
/// already is an external reference is kept, with the extension fragment
/// appended. Anything else is stored in `blobs`.
pub fn reference_handle(
    path: &str,
    content: &str,
    base_url: Option<&str>,
    blobs: &BlobStore,
) -> String {
    let path = normalize_path(path);
    let trimmed = content.trim();

    if trimmed == STATIC_ASSET_PLACEHOLDER {
        return match base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), path),
            None => format!("/{}", path),
        };
    }

    let fragment = extension_fragment(&path);
    if EXTERNAL_REFERENCE_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
    {
        return format!("{}{}", trimmed, fragment);
    }

    format!("{}{}", blobs.insert(content), fragment)
}

fn extension_fragment(path: &str) -> String {
    match extension(path) {
        Some(ext) => format!("#ext={}", ext.trim_start_matches('.')),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_uses_base_url() {
        let blobs = BlobStore::new();
        assert_eq!(
            reference_handle("assets/m.glb", "__STATIC_ASSET__", Some("https://x/y"), &blobs),
            "https://x/y/assets/m.glb"
        );
        assert_eq!(
            reference_handle("./assets/m.glb", "__STATIC_ASSET__\n", Some("https://x/y/"), &blobs),
            "https://x/y/assets/m.glb"
        );
        assert_eq!(
            reference_handle("assets/m.glb", "__STATIC_ASSET__", None, &blobs),
            "/assets/m.glb"
        );
        assert!(blobs.is_empty());
    }

    #[test]
    fn test_external_reference_kept() {
        let blobs = BlobStore::new();
        assert_eq!(
            reference_handle("m.step", "https://cdn.example/m.step", None, &blobs),
            "https://cdn.example/m.step#ext=step"
        );
        assert_eq!(
            reference_handle("m.stl", "blob:abc", None, &blobs),
            "blob:abc#ext=stl"
        );
    }

    #[test]
    fn test_raw_content_becomes_blob() {
        let blobs = BlobStore::new();
        let handle = reference_handle("model.obj", "v 0 0 0", None, &blobs);
        assert!(handle.starts_with("blob:circuit-eval/"));
        assert!(handle.ends_with("#ext=obj"));
        assert_eq!(blobs.get(&handle).as_deref(), Some("v 0 0 0"));
        assert!(blobs.revoke(&handle));
        assert!(blobs.get(&handle).is_none());
    }

    #[test]
    fn test_lease_revokes_on_drop() {
        let blobs = BlobStore::new();
        let kept = blobs.insert("shared");
        {
            let mut lease = BlobLease::new(blobs.clone());
            lease.track(&reference_handle("a.obj", "v 1 0 0", None, &blobs));
            lease.track(&reference_handle("b.stl", "https://cdn.example/b.stl", None, &blobs));
            assert_eq!(blobs.len(), 2);
        }
        assert_eq!(blobs.len(), 1);
        assert!(blobs.get(&kept).is_some());
    }
}
