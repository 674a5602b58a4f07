// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Worker construction options

use circuit_eval::{
    EngineFactory, EvalOptions, Fetch, FootprintConverter, LoaderConfig, ModuleCompiler,
    ModuleExports, NoNetwork, ResolveHook, TreeEngine,
};
use std::sync::Arc;

/// Everything a worker is built from
#[derive(Clone)]
pub struct WorkerOptions {
    /// Compiles module sources
    pub compiler: Arc<dyn ModuleCompiler>,
    /// Creates the component-tree engine for each run
    pub engine_factory: EngineFactory,
    /// Converts footprint design files
    pub footprint_converter: Option<Arc<dyn FootprintConverter>>,
    /// Fallback resolver for bare specifiers
    pub resolve_hook: Option<Arc<dyn ResolveHook>>,
    /// Network transport. With the fetch proxy enabled it runs on the host.
    pub fetch: Arc<dyn Fetch>,
    /// Evaluator options
    pub eval: EvalOptions,
    /// Relay network requests through the host
    pub enable_fetch_proxy: bool,
    /// Echo module console output through tracing
    pub verbose: bool,
    /// Modules available to every run under a bare specifier
    pub provided: Vec<(String, ModuleExports)>,
}

impl WorkerOptions {
    /// Options with the reference engine, no network and default settings
    pub fn new(compiler: Arc<dyn ModuleCompiler>) -> Self {
        Self {
            compiler,
            engine_factory: TreeEngine::factory(),
            footprint_converter: None,
            resolve_hook: None,
            fetch: Arc::new(NoNetwork),
            eval: EvalOptions::default(),
            enable_fetch_proxy: false,
            verbose: false,
            provided: Vec::new(),
        }
    }

    /// Set the engine factory
    pub fn with_engine_factory(mut self, factory: EngineFactory) -> Self {
        self.engine_factory = factory;
        self
    }

    /// Set the network transport
    pub fn with_fetch(mut self, fetch: Arc<dyn Fetch>) -> Self {
        self.fetch = fetch;
        self
    }

    /// Relay network requests through the host
    pub fn with_fetch_proxy(mut self, enabled: bool) -> Self {
        self.enable_fetch_proxy = enabled;
        self
    }

    /// Set the loader configuration
    pub fn with_loader_config(mut self, loader: LoaderConfig) -> Self {
        self.eval.loader = loader;
        self
    }

    /// Set the footprint converter
    pub fn with_footprint_converter(mut self, converter: Arc<dyn FootprintConverter>) -> Self {
        self.footprint_converter = Some(converter);
        self
    }

    /// Set the fallback resolver
    pub fn with_resolve_hook(mut self, hook: Arc<dyn ResolveHook>) -> Self {
        self.resolve_hook = Some(hook);
        self
    }

    /// Make `exports` importable as `specifier` in every run
    pub fn provide(mut self, specifier: impl Into<String>, exports: ModuleExports) -> Self {
        self.provided.push((specifier.into(), exports));
        self
    }

    /// Echo module console output
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
