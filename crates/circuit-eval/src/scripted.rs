// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! A compiler backed by native closures
//!
//! Each module path is bound to a Rust closure that plays the role of the
//! module's compiled body. Hosts use it to expose native modules; tests use
//! it in place of a real source compiler.

use crate::compiler::{CompiledModule, ModuleCompiler, ModuleContext};
use crate::error::ExecutionError;
use crate::module::ResolvedModuleId;
use std::collections::HashMap;
use std::sync::Arc;

type ScriptFn = dyn Fn(&mut ModuleContext<'_>) -> Result<(), ExecutionError> + Send + Sync;

/// Compiler that maps module paths to closures
#[derive(Clone, Default)]
pub struct ScriptedCompiler {
    modules: HashMap<ResolvedModuleId, Arc<ScriptedModule>>,
    fallback: Option<Arc<ScriptedModule>>,
}

impl ScriptedCompiler {
    /// Create a compiler with no modules
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `path` to `body`
    pub fn module<F>(mut self, path: &str, body: F) -> Self
    where
        F: Fn(&mut ModuleContext<'_>) -> Result<(), ExecutionError> + Send + Sync + 'static,
    {
        self.modules.insert(
            ResolvedModuleId::new(path),
            Arc::new(ScriptedModule {
                body: Arc::new(body),
                source_map: None,
            }),
        );
        self
    }

    /// Attach a source map to an already bound path
    pub fn source_map(mut self, path: &str, map: impl Into<String>) -> Self {
        if let Some(module) = self.modules.get_mut(&ResolvedModuleId::new(path)) {
            *module = Arc::new(ScriptedModule {
                body: module.body.clone(),
                source_map: Some(map.into()),
            });
        }
        self
    }

    /// Body used for paths without a binding; by default they fail to compile
    pub fn fallback<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut ModuleContext<'_>) -> Result<(), ExecutionError> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(ScriptedModule {
            body: Arc::new(body),
            source_map: None,
        }));
        self
    }
}

impl ModuleCompiler for ScriptedCompiler {
    fn compile(&self, _source: &str, path: &str) -> Result<Arc<dyn CompiledModule>, ExecutionError> {
        let module = self
            .modules
            .get(&ResolvedModuleId::new(path))
            .or(self.fallback.as_ref())
            .ok_or_else(|| ExecutionError::new(format!("no compiled body for '{}'", path)))?;
        Ok(module.clone() as Arc<dyn CompiledModule>)
    }
}

struct ScriptedModule {
    body: Arc<ScriptFn>,
    source_map: Option<String>,
}

impl CompiledModule for ScriptedModule {
    fn run(&self, ctx: &mut ModuleContext<'_>) -> Result<(), ExecutionError> {
        (self.body)(ctx)
    }

    fn source_map(&self) -> Option<&str> {
        self.source_map.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_path_fails_to_compile() {
        let compiler = ScriptedCompiler::new().module("./a.tsx", |_| Ok(()));
        assert!(compiler.compile("", "a.tsx").is_ok());
        let err = compiler.compile("", "b.tsx").err().unwrap();
        assert_eq!(err.message, "no compiled body for 'b.tsx'");

        let compiler = compiler.fallback(|_| Ok(()));
        assert!(compiler.compile("", "b.tsx").is_ok());
    }

    #[test]
    fn test_source_map_attached() {
        let compiler = ScriptedCompiler::new()
            .module("a.tsx", |_| Ok(()))
            .source_map("a.tsx", "{}");
        let module = compiler.compile("", "a.tsx").unwrap();
        assert_eq!(module.source_map(), Some("{}"));
    }
}
