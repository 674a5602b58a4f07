// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host-supplied resolver fallback

use crate::error::Result;
use async_trait::async_trait;

/// Source text supplied by a [`ResolveHook`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookedModule {
    /// Module id; a URL or a path, used for nested relative imports
    pub id: String,
    /// Code to compile
    pub source: String,
}

/// Resolves bare specifiers when network resolution is disabled
#[async_trait]
pub trait ResolveHook: Send + Sync {
    /// Resolve `specifier` imported from `importer`, `None` to decline
    async fn resolve(&self, specifier: &str, importer: &str) -> Result<Option<HookedModule>>;
}
