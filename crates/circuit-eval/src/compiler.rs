// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiler and execution interfaces
//!
//! Source-to-executable compilation is an external collaborator. A compiled
//! module body runs against an explicit [`ModuleContext`] holding its exports,
//! a scoped `require` and the live component-tree engine.

use crate::cache::ModuleCache;
use crate::engine::ComponentEngine;
use crate::error::{EvalError, ExecutionError};
use crate::exports::ModuleExports;
use crate::module::ResolvedModuleId;
use crate::path::normalize_path;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Turns source text into an executable module
pub trait ModuleCompiler: Send + Sync {
    /// Compile `source`, which was loaded from `path`
    fn compile(&self, source: &str, path: &str) -> Result<Arc<dyn CompiledModule>, ExecutionError>;
}

/// An executable module body
pub trait CompiledModule: Send + Sync {
    /// Run the module's top-level code
    fn run(&self, ctx: &mut ModuleContext<'_>) -> Result<(), ExecutionError>;

    /// Source map JSON for the compiled output, if the compiler produced one
    fn source_map(&self) -> Option<&str> {
        None
    }
}

/// Converts footprint design files into values
pub trait FootprintConverter: Send + Sync {
    /// Convert `source`, loaded from `path`
    fn convert(&self, source: &str, path: &str) -> Result<Value, ExecutionError>;
}

/// Scoped lookup of already-evaluated modules
#[derive(Clone, Copy)]
pub struct Require<'a> {
    importer: &'a ResolvedModuleId,
    resolutions: &'a HashMap<String, ResolvedModuleId>,
    cache: &'a ModuleCache,
}

impl<'a> Require<'a> {
    /// Create a lookup for `importer`
    pub fn new(
        importer: &'a ResolvedModuleId,
        resolutions: &'a HashMap<String, ResolvedModuleId>,
        cache: &'a ModuleCache,
    ) -> Self {
        Self {
            importer,
            resolutions,
            cache,
        }
    }

    /// Exports for `specifier`.
    ///
    /// Looks first at what the importer's own imports resolved to, then at
    /// the specifier text, then at the specifier taken as a resolved id.
    pub fn exports(&self, specifier: &str) -> Result<Arc<ModuleExports>, EvalError> {
        let record = self
            .resolutions
            .get(specifier)
            .and_then(|id| self.cache.get(id.as_str()))
            .or_else(|| self.cache.get(specifier))
            .or_else(|| self.cache.get(&normalize_path(specifier)));

        match record {
            Some(record) => Ok(record.exports),
            None => Err(EvalError::RequireNotFound {
                specifier: specifier.to_string(),
                importer: self.importer.to_string(),
            }),
        }
    }
}

/// Everything a module body can reach while it runs
pub struct ModuleContext<'a> {
    id: &'a ResolvedModuleId,
    /// Exports the module is producing
    pub exports: &'a mut ModuleExports,
    /// The live component-tree engine
    pub engine: &'a mut dyn ComponentEngine,
    require: Require<'a>,
    logs: &'a mut Vec<String>,
}

impl<'a> ModuleContext<'a> {
    /// Create a context
    pub fn new(
        id: &'a ResolvedModuleId,
        exports: &'a mut ModuleExports,
        engine: &'a mut dyn ComponentEngine,
        require: Require<'a>,
        logs: &'a mut Vec<String>,
    ) -> Self {
        Self {
            id,
            exports,
            engine,
            require,
            logs,
        }
    }

    /// Id of the running module
    pub fn module_id(&self) -> &ResolvedModuleId {
        self.id
    }

    /// Exports of an imported module
    pub fn require(&self, specifier: &str) -> Result<Arc<ModuleExports>, ExecutionError> {
        Ok(self.require.exports(specifier)?)
    }

    /// A single binding of an imported module
    pub fn import(&self, specifier: &str, name: &str) -> Result<Value, ExecutionError> {
        Ok(self.require(specifier)?.get(name)?)
    }

    /// Record a line of console output
    pub fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!(module = %self.id, "{}", line);
        self.logs.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TreeEngine;
    use crate::module::{ModuleRecord, SourceKind};

    fn cache_with(id: &str, name: &str, value: Value) -> ModuleCache {
        let mut exports = ModuleExports::new(id);
        exports.set(name, value);
        let cache = ModuleCache::new();
        cache.set(ModuleRecord {
            id: ResolvedModuleId::new(id),
            source_kind: SourceKind::Code,
            exports: Arc::new(exports),
        });
        cache
    }

    #[test]
    fn test_require_via_resolutions() {
        let cache = cache_with("src/led.tsx", "Led", Value::from("led"));
        let importer = ResolvedModuleId::new("src/board.tsx");
        let mut resolutions = HashMap::new();
        resolutions.insert("./led".to_string(), ResolvedModuleId::new("src/led.tsx"));

        let require = Require::new(&importer, &resolutions, &cache);
        assert!(require.exports("./led").is_ok());
        assert!(require.exports("src/led.tsx").is_ok());

        let err = require.exports("./missing").unwrap_err();
        assert!(matches!(err, EvalError::RequireNotFound { ref importer, .. } if importer == "src/board.tsx"));
    }

    #[test]
    fn test_context_import_and_log() {
        let cache = cache_with("lib.ts", "x", Value::Number(2.0));
        let id = ResolvedModuleId::new("index.tsx");
        let resolutions = HashMap::new();
        let mut exports = ModuleExports::new("index.tsx");
        let mut engine = TreeEngine::new();
        let mut logs = Vec::new();

        let mut ctx = ModuleContext::new(
            &id,
            &mut exports,
            &mut engine,
            Require::new(&id, &resolutions, &cache),
            &mut logs,
        );
        assert_eq!(ctx.import("lib.ts", "x").unwrap(), Value::Number(2.0));
        let err = ctx.import("lib.ts", "y").unwrap_err();
        assert_eq!(err.message, "'y' is not exported from 'lib.ts'");
        ctx.log("hello");
        ctx.exports.set("done", Value::Bool(true));

        assert_eq!(logs, vec!["hello".to_string()]);
        assert!(exports.has("done"));
    }
}
