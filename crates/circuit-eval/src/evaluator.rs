// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module graph evaluation
//!
//! [`ModuleGraph::import_path`] resolves, loads and evaluates one specifier,
//! evaluating its own imports first. Evaluation is strictly sequential: the
//! only suspension points are remote loads.

use crate::alias::PathAliasConfig;
use crate::assets::{BlobLease, BlobStore, reference_handle};
use crate::cache::ModuleCache;
use crate::compiler::{CompiledModule, FootprintConverter, ModuleCompiler, ModuleContext, Require};
use crate::config::{EvalOptions, LoaderConfig};
use crate::diagnostics::{diagnose_package, enrich_runtime_error, package_files_present};
use crate::engine::ComponentEngine;
use crate::entry::{EntrySpec, prepare_entry, prepare_inline_entry};
use crate::error::{EvalError, ExecutionError, Result};
use crate::exports::ModuleExports;
use crate::fetch::{Fetch, NoNetwork};
use crate::hook::ResolveHook;
use crate::loader::{LoadedSource, RemoteLoader, join_url, load_local};
use crate::module::{ModuleRecord, ResolvedModuleId, SourceKind};
use crate::path::{is_absolute, is_relative, is_url};
use crate::resolver::SpecifierResolver;
use crate::scan::scan_module;
use crate::sourcemap::SourceMap;
use crate::value::Value;
use crate::vfs::VirtualFileTable;
use futures::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// State of one execution run
pub struct ExecutionContext {
    files: VirtualFileTable,
    cache: ModuleCache,
    aliases: Option<PathAliasConfig>,
    stack: Vec<ResolvedModuleId>,
    in_progress: HashSet<ResolvedModuleId>,
    engine: Box<dyn ComponentEngine>,
    logs: Vec<String>,
    source_maps: HashMap<String, SourceMap>,
    synthetic: HashMap<ResolvedModuleId, Arc<dyn CompiledModule>>,
    blobs: Option<BlobLease>,
}

impl ExecutionContext {
    /// Create a run over `files`, parsing the path-alias configuration once
    pub fn new(
        files: VirtualFileTable,
        engine: Box<dyn ComponentEngine>,
        config: &LoaderConfig,
    ) -> Result<Self> {
        let aliases = PathAliasConfig::load(&files, &config.alias_config_file)?;
        Ok(Self {
            files,
            cache: ModuleCache::new(),
            aliases,
            stack: Vec::new(),
            in_progress: HashSet::new(),
            engine,
            logs: Vec::new(),
            source_maps: HashMap::new(),
            synthetic: HashMap::new(),
            blobs: None,
        })
    }

    /// The run's file table
    pub fn files(&self) -> &VirtualFileTable {
        &self.files
    }

    /// The component-tree engine
    pub fn engine(&self) -> &dyn ComponentEngine {
        self.engine.as_ref()
    }

    /// The component-tree engine, mutably
    pub fn engine_mut(&mut self) -> &mut dyn ComponentEngine {
        self.engine.as_mut()
    }

    /// Console output accumulated so far
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Exports of an evaluated module, by resolved id or bare specifier
    pub fn exports(&self, key: &str) -> Option<Arc<ModuleExports>> {
        self.cache.get(key).map(|record| record.exports)
    }

    /// Register ready-made exports under a bare specifier
    pub fn provide(&mut self, specifier: &str, exports: ModuleExports) {
        let record = ModuleRecord {
            id: ResolvedModuleId::new(specifier),
            source_kind: SourceKind::Code,
            exports: Arc::new(exports),
        };
        self.cache.alias(specifier, record);
    }

    /// Modules currently being evaluated, outermost first
    pub fn import_stack(&self) -> &[ResolvedModuleId] {
        &self.stack
    }

    /// Write a generated module; `module` runs instead of compiling `source`
    pub(crate) fn add_synthetic_module(
        &mut self,
        path: &str,
        source: String,
        module: Option<Arc<dyn CompiledModule>>,
    ) {
        self.files.insert(path, source);
        if let Some(module) = module {
            self.synthetic.insert(ResolvedModuleId::new(path), module);
        }
    }
}

/// Where a specifier points, decided before anything is loaded
enum Target {
    Local(ResolvedModuleId),
    Url(String),
    Remote,
    Hook(EvalError),
}

/// Resolves, loads and evaluates module graphs
pub struct ModuleGraph {
    compiler: Arc<dyn ModuleCompiler>,
    fetch: Arc<dyn Fetch>,
    footprints: Option<Arc<dyn FootprintConverter>>,
    hook: Option<Arc<dyn ResolveHook>>,
    options: EvalOptions,
    blobs: BlobStore,
}

impl ModuleGraph {
    /// Create an evaluator with no network access and default options
    pub fn new(compiler: Arc<dyn ModuleCompiler>) -> Self {
        Self {
            compiler,
            fetch: Arc::new(NoNetwork),
            footprints: None,
            hook: None,
            options: EvalOptions::default(),
            blobs: BlobStore::new(),
        }
    }

    /// Set the network transport
    pub fn with_fetch(mut self, fetch: Arc<dyn Fetch>) -> Self {
        self.fetch = fetch;
        self
    }

    /// Set the footprint converter
    pub fn with_footprint_converter(mut self, converter: Arc<dyn FootprintConverter>) -> Self {
        self.footprints = Some(converter);
        self
    }

    /// Set the custom resolver fallback
    pub fn with_resolve_hook(mut self, hook: Arc<dyn ResolveHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Set evaluator options
    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    /// Evaluator options
    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Evaluator options, mutably
    pub fn options_mut(&mut self) -> &mut EvalOptions {
        &mut self.options
    }

    /// Blob store backing static asset handles.
    ///
    /// Handles created by a run live until its [`ExecutionContext`] is dropped.
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Evaluate inline entry source
    pub async fn execute_source(&self, ctx: &mut ExecutionContext, source: &str) -> Result<ResolvedModuleId> {
        let entry = prepare_inline_entry(ctx, source);
        self.run_entry(ctx, &entry).await
    }

    /// Evaluate the entry described by `spec`, synthesizing one if needed
    pub async fn execute_entry(&self, ctx: &mut ExecutionContext, spec: &EntrySpec) -> Result<ResolvedModuleId> {
        let entry = prepare_entry(ctx, spec)?;
        self.run_entry(ctx, &entry).await
    }

    async fn run_entry(&self, ctx: &mut ExecutionContext, entry: &str) -> Result<ResolvedModuleId> {
        info!("Evaluating entry {}", entry);
        self.import_path(entry, ctx, 0, "")
            .await?
            .ok_or_else(|| EvalError::EntryPoint(format!("'{}' was not evaluated", entry)))
    }

    /// Resolve and evaluate `specifier` imported from directory `cwd`.
    ///
    /// Returns the resolved id, or `None` when the depth guard skipped it.
    /// Exports are afterwards available through [`ExecutionContext::exports`].
    pub fn import_path<'a>(
        &'a self,
        specifier: &'a str,
        ctx: &'a mut ExecutionContext,
        depth: usize,
        cwd: &'a str,
    ) -> BoxFuture<'a, Result<Option<ResolvedModuleId>>> {
        async move {
            if depth > self.options.max_import_depth {
                warn!(
                    "Import depth {} exceeds {}, skipping '{}' from '{}'",
                    depth, self.options.max_import_depth, specifier, cwd
                );
                return Ok(None);
            }

            let bare = !is_relative(specifier) && !is_absolute(specifier) && !is_url(specifier);
            if bare {
                if let Some(record) = ctx.cache.get(specifier) {
                    debug!("Cache hit for '{}'", specifier);
                    return Ok(Some(record.id));
                }
            }

            let target = self.target(specifier, ctx, cwd)?;
            let known = match &target {
                Target::Local(id) => ctx.cache.get(id.as_str()),
                Target::Url(url) => ctx.cache.get(url),
                Target::Remote | Target::Hook(_) => None,
            };
            if let Some(record) = known {
                debug!("Cache hit for {}", record.id);
                if bare {
                    ctx.cache.alias(specifier, record.clone());
                }
                return Ok(Some(record.id));
            }

            let loaded = self.load(specifier, target, &ctx.files, cwd).await?;
            if let Some(record) = ctx.cache.get(loaded.id.as_str()) {
                if bare {
                    ctx.cache.alias(specifier, record.clone());
                }
                return Ok(Some(record.id));
            }

            if ctx.in_progress.contains(&loaded.id) {
                let start = ctx.stack.iter().position(|id| *id == loaded.id).unwrap_or(0);
                let mut chain: Vec<String> = ctx.stack[start..].iter().map(ToString::to_string).collect();
                chain.push(loaded.id.to_string());
                warn!("Circular import: {}", chain.join(" -> "));
                return Err(EvalError::CycleDetected { chain });
            }

            ctx.stack.push(loaded.id.clone());
            ctx.in_progress.insert(loaded.id.clone());
            let result = self.evaluate(specifier, &loaded, ctx, depth).await;
            ctx.stack.pop();
            ctx.in_progress.remove(&loaded.id);

            let record = result?;
            ctx.cache.set(record.clone());
            if bare {
                ctx.cache.alias(specifier, record);
            }
            Ok(Some(loaded.id))
        }
        .boxed()
    }

    fn target(&self, specifier: &str, ctx: &ExecutionContext, cwd: &str) -> Result<Target> {
        let loader = &self.options.loader;
        let local_path = is_relative(specifier) || is_absolute(specifier);

        if is_url(specifier) {
            return Ok(Target::Url(specifier.to_string()));
        }
        if is_url(cwd) {
            if local_path {
                return Ok(Target::Url(join_url(cwd, specifier)?));
            }
            return self.remote_or_hook(specifier, ctx, "");
        }

        let resolver = SpecifierResolver::new(&ctx.files, ctx.aliases.as_ref(), &loader.package_cache_dir);
        if let Some(id) = resolver.resolve(specifier, cwd)? {
            return Ok(Target::Local(id));
        }
        if local_path {
            return Err(EvalError::resolution(
                specifier,
                format!(
                    "no file matches from '{}'",
                    if cwd.is_empty() { "<root>" } else { cwd }
                ),
            ));
        }

        // Local package files that exist but did not resolve are a broken install
        if package_files_present(&ctx.files, specifier, cwd, &loader.package_cache_dir) {
            return Err(diagnose_package(&ctx.files, specifier, cwd, &loader.package_cache_dir).into_error(specifier));
        }
        self.remote_or_hook(specifier, ctx, cwd)
    }

    fn remote_or_hook(&self, specifier: &str, ctx: &ExecutionContext, cwd: &str) -> Result<Target> {
        let loader = &self.options.loader;
        if !loader.disable_network {
            return Ok(Target::Remote);
        }
        let diagnosis = diagnose_package(&ctx.files, specifier, cwd, &loader.package_cache_dir).into_error(specifier);
        if self.hook.is_some() {
            return Ok(Target::Hook(diagnosis));
        }
        Err(diagnosis)
    }

    async fn load(
        &self,
        specifier: &str,
        target: Target,
        files: &VirtualFileTable,
        cwd: &str,
    ) -> Result<LoadedSource> {
        let remote = RemoteLoader::new(&self.options.loader, self.fetch.as_ref());
        match target {
            Target::Local(id) => load_local(files, &id),
            Target::Url(url) => remote.load_url(&url).await,
            Target::Remote => remote.load(specifier).await,
            Target::Hook(diagnosis) => {
                let Some(hook) = &self.hook else {
                    return Err(diagnosis);
                };
                match hook.resolve(specifier, cwd).await? {
                    Some(module) => {
                        debug!("Resolve hook supplied '{}' as {}", specifier, module.id);
                        let id = ResolvedModuleId::new(&module.id);
                        Ok(LoadedSource {
                            kind: SourceKind::Code,
                            directory: id.directory(),
                            id,
                            content: module.source,
                        })
                    }
                    None => Err(diagnosis),
                }
            }
        }
    }

    #[instrument(level = "debug", skip_all, fields(module = %loaded.id))]
    async fn evaluate(
        &self,
        specifier: &str,
        loaded: &LoadedSource,
        ctx: &mut ExecutionContext,
        depth: usize,
    ) -> Result<ModuleRecord> {
        let id = loaded.id.as_str();
        let exports = match loaded.kind {
            SourceKind::Json => {
                let json: serde_json::Value = serde_json::from_str(&loaded.content).map_err(|e| EvalError::Json {
                    path: id.to_string(),
                    reason: e.to_string(),
                })?;
                ModuleExports::with_default(id, Value::from_json(&json))
            }
            SourceKind::StaticAsset => {
                let handle = reference_handle(
                    id,
                    &loaded.content,
                    self.options.loader.asset_base_url.as_deref(),
                    &self.blobs,
                );
                ctx.blobs
                    .get_or_insert_with(|| BlobLease::new(self.blobs.clone()))
                    .track(&handle);
                ModuleExports::with_default(id, Value::String(handle))
            }
            SourceKind::ForeignFormat => {
                let converter = self.footprints.as_ref().ok_or_else(|| EvalError::Evaluation {
                    specifier: specifier.to_string(),
                    message: "no footprint converter is configured".to_string(),
                    logs: ctx.logs.clone(),
                })?;
                let footprint = converter
                    .convert(&loaded.content, id)
                    .map_err(|e| self.evaluation_error(specifier, &e, ctx))?;
                let mut exports = ModuleExports::new(id);
                exports.set_es_module(true);
                exports.set("footprint", footprint);
                exports
            }
            SourceKind::Code => self.evaluate_code(specifier, loaded, ctx, depth).await?,
        };

        Ok(ModuleRecord {
            id: loaded.id.clone(),
            source_kind: loaded.kind,
            exports: Arc::new(exports),
        })
    }

    async fn evaluate_code(
        &self,
        specifier: &str,
        loaded: &LoadedSource,
        ctx: &mut ExecutionContext,
        depth: usize,
    ) -> Result<ModuleExports> {
        let syntax = scan_module(&loaded.content);

        // Dependencies first, in source order
        let mut resolutions = HashMap::new();
        for import in syntax.runtime_imports() {
            if let Some(dep) = self
                .import_path(&import.specifier, ctx, depth + 1, &loaded.directory)
                .await?
            {
                resolutions.insert(import.specifier.clone(), dep);
            }
        }

        let module = match ctx.synthetic.get(&loaded.id) {
            Some(module) => module.clone(),
            None => self
                .compiler
                .compile(&loaded.content, loaded.id.as_str())
                .map_err(|e| self.evaluation_error(specifier, &e, ctx))?,
        };
        if let Some(map) = module.source_map() {
            match SourceMap::parse(map) {
                Ok(map) => {
                    ctx.source_maps.insert(loaded.id.to_string(), map);
                }
                Err(e) => debug!("Ignoring unreadable source map for {}: {}", loaded.id, e),
            }
        }

        let mut exports = ModuleExports::new(loaded.id.as_str());
        exports.set_type_exports(syntax.type_exports.clone());
        exports.set_es_module(syntax.has_module_syntax || loaded.id.is_remote());

        let outcome = {
            let ExecutionContext {
                cache, engine, logs, ..
            } = &mut *ctx;
            let require = Require::new(&loaded.id, &resolutions, cache);
            let mut module_ctx = ModuleContext::new(&loaded.id, &mut exports, engine.as_mut(), require, logs);
            module.run(&mut module_ctx)
        };
        outcome.map_err(|e| self.evaluation_error(specifier, &e, ctx))?;

        debug!("Evaluated {} ({} exports)", loaded.id, exports.names().len());
        Ok(exports)
    }

    fn evaluation_error(&self, specifier: &str, error: &ExecutionError, ctx: &ExecutionContext) -> EvalError {
        EvalError::Evaluation {
            specifier: specifier.to_string(),
            message: enrich_runtime_error(error, &ctx.files, &ctx.source_maps),
            logs: ctx.logs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::FailureScenario;
    use crate::engine::TreeEngine;
    use crate::fetch::{FetchError, FetchRequest, FetchResponse};
    use crate::hook::HookedModule;
    use crate::scripted::ScriptedCompiler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context(files: &[(&str, &str)]) -> ExecutionContext {
        ExecutionContext::new(
            VirtualFileTable::from_map(files.iter().map(|(k, v)| (k.to_string(), v.to_string()))),
            Box::new(TreeEngine::new()),
            &LoaderConfig::default(),
        )
        .unwrap()
    }

    fn offline(compiler: ScriptedCompiler) -> ModuleGraph {
        let mut options = EvalOptions::default();
        options.loader.disable_network = true;
        ModuleGraph::new(Arc::new(compiler)).with_options(options)
    }

    #[tokio::test]
    async fn test_memoized_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let compiler = ScriptedCompiler::new()
            .module("a.tsx", move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                ctx.exports.set("value", Value::Number(1.0));
                Ok(())
            })
            .module("b.tsx", |ctx| {
                ctx.exports.set("b", ctx.import("./a", "value")?);
                Ok(())
            })
            .module("c.tsx", |ctx| {
                ctx.exports.set("c", ctx.import("./a.tsx", "value")?);
                Ok(())
            })
            .module("index.tsx", |_| Ok(()));

        let mut ctx = context(&[
            ("a.tsx", "export const value = 1"),
            ("b.tsx", "import { value } from './a'\nexport const b = value"),
            ("c.tsx", "import { value } from './a.tsx'\nexport const c = value"),
        ]);
        let graph = offline(compiler);
        graph
            .execute_source(&mut ctx, "import './b'\nimport './c'")
            .await
            .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.exports("c.tsx").unwrap().get("c").unwrap(), Value::Number(1.0));
    }

    #[tokio::test]
    async fn test_dependencies_evaluate_first_in_order() {
        let order: Arc<std::sync::Mutex<Vec<&'static str>>> = Arc::default();
        let compiler = ["x.ts", "y.ts", "index.tsx"]
            .into_iter()
            .fold(ScriptedCompiler::new(), |compiler, path| {
                let order = order.clone();
                compiler.module(path, move |_| {
                    order.lock().map_err(|_| ExecutionError::new("poisoned"))?.push(path);
                    Ok(())
                })
            });
        let mut ctx = context(&[("x.ts", ""), ("y.ts", "import './x'")]);
        offline(compiler)
            .execute_source(&mut ctx, "import './y'\nimport './x'")
            .await
            .unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["x.ts", "y.ts", "index.tsx"]);
    }

    #[tokio::test]
    async fn test_cycle_chain_is_exact() {
        let compiler = ScriptedCompiler::new()
            .module("a.tsx", |_| Ok(()))
            .module("b.tsx", |_| Ok(()));
        let mut ctx = context(&[
            ("a.tsx", "import { b } from './b.tsx'"),
            ("b.tsx", "import { a } from './a.tsx'"),
        ]);
        let err = offline(compiler)
            .execute_source(&mut ctx, "import './a.tsx'")
            .await
            .unwrap_err();
        assert!(err.is_cycle());
        assert_eq!(err.to_string(), "Circular dependency detected: a.tsx -> b.tsx -> a.tsx");
        assert!(ctx.import_stack().is_empty());
    }

    #[tokio::test]
    async fn test_type_only_cycle_succeeds() {
        let compiler = ScriptedCompiler::new()
            .module("a.tsx", |ctx| {
                ctx.exports.set("A", Value::from("a"));
                Ok(())
            })
            .module("types.ts", |_| Ok(()))
            .module("index.tsx", |_| Ok(()));
        let mut ctx = context(&[
            ("a.tsx", "import type { T } from './types'\nexport const A = 'a'"),
            ("types.ts", "import { A } from './a'\nexport type T = typeof A"),
        ]);
        offline(compiler)
            .execute_source(&mut ctx, "import { A } from './a'")
            .await
            .unwrap();
        // The type-only edge was never followed
        assert!(ctx.exports("types.ts").is_none());
    }

    #[tokio::test]
    async fn test_failure_wraps_specifier_and_logs_and_allows_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        let compiler = ScriptedCompiler::new()
            .module("flaky.tsx", move |ctx| {
                ctx.log("starting");
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(ExecutionError::new("boom").with_stack("at flaky.tsx:2:1"));
                }
                Ok(())
            });
        let mut ctx = context(&[("flaky.tsx", "const a = 1\nthrow new Error('boom')")]);
        let graph = offline(compiler);

        let err = graph.import_path("./flaky", &mut ctx, 0, "").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Eval error in './flaky': boom"));
        assert!(msg.contains("> throw new Error('boom')"));
        assert!(msg.ends_with("Logs:\nstarting"));
        assert!(ctx.import_stack().is_empty());

        // Nothing was cached, so the module is evaluated again
        let id = graph.import_path("./flaky", &mut ctx, 0, "").await.unwrap();
        assert_eq!(id.map(|id| id.to_string()).as_deref(), Some("flaky.tsx"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_depth_guard_skips_branch() {
        let compiler = ScriptedCompiler::new().module("m.ts", |_| Ok(()));
        let mut ctx = context(&[("m.ts", "")]);
        let graph = offline(compiler);
        assert_eq!(graph.import_path("./m", &mut ctx, 6, "").await.unwrap(), None);
        assert!(ctx.exports("m.ts").is_none());
        assert!(graph.import_path("./m", &mut ctx, 5, "").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_json_asset_and_unsupported() {
        let mut ctx = context(&[
            ("data.json", r#"{"pins": 2}"#),
            ("assets/m.glb", "__STATIC_ASSET__"),
            ("notes.txt", "hello"),
        ]);
        let mut graph = offline(ScriptedCompiler::new());
        graph.options_mut().loader.asset_base_url = Some("https://x/y".to_string());

        graph.import_path("./data.json", &mut ctx, 0, "").await.unwrap();
        let data = ctx.exports("data.json").unwrap().get("default").unwrap();
        assert_eq!(data.to_json(), Some(serde_json::json!({"pins": 2})));

        graph.import_path("./assets/m.glb", &mut ctx, 0, "").await.unwrap();
        assert_eq!(
            ctx.exports("assets/m.glb").unwrap().get("default").unwrap(),
            Value::from("https://x/y/assets/m.glb")
        );

        let err = graph.import_path("./notes.txt", &mut ctx, 0, "").await.unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedExtension { .. }));
    }

    #[tokio::test]
    async fn test_blobs_released_with_their_run() {
        let graph = offline(ScriptedCompiler::new());
        for _ in 0..3 {
            let mut ctx = context(&[("m.obj", "v 0 0 0")]);
            graph.import_path("./m.obj", &mut ctx, 0, "").await.unwrap();
            let Value::String(handle) = ctx.exports("m.obj").unwrap().get("default").unwrap() else {
                panic!("expected a blob handle");
            };
            assert!(graph.blobs().get(&handle).is_some());
            assert_eq!(graph.blobs().len(), 1);
        }
        assert!(graph.blobs().is_empty());
    }

    #[tokio::test]
    async fn test_missing_relative_file() {
        let mut ctx = context(&[]);
        let err = offline(ScriptedCompiler::new())
            .import_path("./gone", &mut ctx, 0, "src")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no file matches from 'src'"));
    }

    #[tokio::test]
    async fn test_not_installed_scenario() {
        let mut ctx = context(&[("package.json", r#"{"dependencies": {"foo": "1.0.0"}}"#)]);
        let err = offline(ScriptedCompiler::new())
            .import_path("foo", &mut ctx, 0, "")
            .await
            .unwrap_err();
        assert_eq!(err.scenario(), Some(FailureScenario::NotInstalled));
    }

    #[tokio::test]
    async fn test_provided_modules_short_circuit() {
        let compiler = ScriptedCompiler::new().module("index.tsx", |ctx| {
            ctx.exports.set("v", ctx.import("@tscircuit/core", "version")?);
            Ok(())
        });
        let mut ctx = context(&[]);
        let mut core = ModuleExports::new("@tscircuit/core");
        core.set("version", Value::from("1.0"));
        ctx.provide("@tscircuit/core", core);

        offline(compiler)
            .execute_source(&mut ctx, "import { version } from '@tscircuit/core'")
            .await
            .unwrap();
        assert_eq!(ctx.exports("index.tsx").unwrap().get("v").unwrap(), Value::from("1.0"));
    }

    struct CannedFetch;

    #[async_trait]
    impl Fetch for CannedFetch {
        async fn fetch(&self, request: FetchRequest) -> std::result::Result<FetchResponse, FetchError> {
            match request.url.as_str() {
                "https://cdn.jsdelivr.net/npm/left-pad/+esm" => Ok(FetchResponse::ok(
                    "https://cdn.jsdelivr.net/npm/left-pad@1.3.0/+esm",
                    "import './util.js'\nexport default 1",
                )),
                "https://cdn.jsdelivr.net/npm/left-pad@1.3.0/util.js" => Ok(FetchResponse::ok(
                    "https://cdn.jsdelivr.net/npm/left-pad@1.3.0/util.js",
                    "export const pad = 1",
                )),
                other => Err(FetchError::new(format!("unexpected {}", other))),
            }
        }
    }

    #[tokio::test]
    async fn test_remote_package_and_nested_relative() {
        let compiler = ScriptedCompiler::new()
            .module("https://cdn.jsdelivr.net/npm/left-pad@1.3.0/+esm", |ctx| {
                ctx.exports.set("default", Value::Number(1.0));
                Ok(())
            })
            .module("https://cdn.jsdelivr.net/npm/left-pad@1.3.0/util.js", |_| Ok(()));
        let mut ctx = context(&[]);
        let graph = ModuleGraph::new(Arc::new(compiler)).with_fetch(Arc::new(CannedFetch));

        let id = graph.import_path("left-pad", &mut ctx, 0, "").await.unwrap().unwrap();
        assert_eq!(id.as_str(), "https://cdn.jsdelivr.net/npm/left-pad@1.3.0/+esm");
        assert!(ctx.exports("left-pad").unwrap().is_es_module());
        assert!(ctx.exports("https://cdn.jsdelivr.net/npm/left-pad@1.3.0/util.js").is_some());
    }

    struct FixedHook;

    #[async_trait]
    impl ResolveHook for FixedHook {
        async fn resolve(&self, specifier: &str, _importer: &str) -> Result<Option<HookedModule>> {
            Ok((specifier == "hooked").then(|| HookedModule {
                id: "virtual/hooked.js".to_string(),
                source: "export const ok = true".to_string(),
            }))
        }
    }

    #[tokio::test]
    async fn test_resolve_hook_when_offline() {
        let compiler = ScriptedCompiler::new().module("virtual/hooked.js", |ctx| {
            ctx.exports.set("ok", Value::Bool(true));
            Ok(())
        });
        let mut ctx = context(&[("package.json", r#"{"dependencies": {"hooked": "1", "other": "1"}}"#)]);
        let graph = offline(compiler).with_resolve_hook(Arc::new(FixedHook));

        graph.import_path("hooked", &mut ctx, 0, "").await.unwrap();
        assert_eq!(ctx.exports("hooked").unwrap().get("ok").unwrap(), Value::Bool(true));

        let err = graph.import_path("other", &mut ctx, 0, "").await.unwrap_err();
        assert_eq!(err.scenario(), Some(FailureScenario::NotInstalled));
    }
}
