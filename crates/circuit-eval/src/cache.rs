// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Run-scoped exports cache

use crate::module::ModuleRecord;
use dashmap::DashMap;

/// Evaluated modules of one run.
///
/// Every record is stored under its resolved id. Bare specifiers and
/// pre-supplied modules are additionally stored under the specifier text.
#[derive(Debug, Default)]
pub struct ModuleCache {
    records: DashMap<String, ModuleRecord>,
}

impl ModuleCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a record by resolved id or specifier key
    pub fn get(&self, key: &str) -> Option<ModuleRecord> {
        self.records.get(key).map(|entry| entry.clone())
    }

    /// Store a record under its id
    pub fn set(&self, record: ModuleRecord) {
        self.records.insert(record.id.as_str().to_string(), record);
    }

    /// Store a record under an additional specifier key
    pub fn alias(&self, specifier: &str, record: ModuleRecord) {
        self.records.insert(specifier.to_string(), record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exports::ModuleExports;
    use crate::module::{ResolvedModuleId, SourceKind};
    use std::sync::Arc;

    fn record(id: &str) -> ModuleRecord {
        ModuleRecord {
            id: ResolvedModuleId::new(id),
            source_kind: SourceKind::Code,
            exports: Arc::new(ModuleExports::new(id)),
        }
    }

    #[test]
    fn test_set_and_alias() {
        let cache = ModuleCache::new();
        let rec = record("node_modules/foo/index.js");
        cache.set(rec.clone());
        cache.alias("foo", rec);

        let via_specifier = cache.get("foo").unwrap();
        assert_eq!(via_specifier.id.as_str(), "node_modules/foo/index.js");
        assert!(cache.get("node_modules/foo/index.js").is_some());
        assert!(cache.get("node_modules/foo").is_none());
    }
}
