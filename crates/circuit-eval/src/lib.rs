// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # circuit-eval
//!
//! Module resolution and on-demand evaluation for untrusted circuit
//! description sources.
//!
//! Given a file table and an entry, this crate:
//!
//! - resolves import specifiers (path aliases, relative paths, package cache
//!   directories, remote registries and CDNs)
//! - loads content and dispatches on its kind (code, JSON, static assets,
//!   footprint files)
//! - evaluates the import graph depth-first, exactly once per module, with
//!   cycle detection
//! - explains package-cache failures and points runtime errors at the
//!   offending source line
//!
//! Compilation and the component-tree engine are external collaborators,
//! plugged in through [`ModuleCompiler`] and [`ComponentEngine`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use circuit_eval::{EntrySpec, ExecutionContext, ModuleGraph, TreeEngine, VirtualFileTable};
//!
//! let files = VirtualFileTable::from_map([("board.tsx", source)]);
//! let graph = ModuleGraph::new(compiler);
//! let mut ctx = ExecutionContext::new(files, Box::new(TreeEngine::new()), &graph.options().loader)?;
//! graph.execute_entry(&mut ctx, &EntrySpec::main_component("board.tsx")).await?;
//! let circuit = ctx.engine().circuit_json()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alias;
pub mod assets;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod entry;
pub mod error;
pub mod evaluator;
pub mod exports;
pub mod fetch;
pub mod hook;
pub mod loader;
pub mod manifest;
pub mod module;
pub mod path;
pub mod resolver;
pub mod scan;
pub mod scripted;
pub mod sourcemap;
pub mod value;
pub mod vfs;

// Re-exports
pub use alias::PathAliasConfig;
pub use assets::{BlobStore, STATIC_ASSET_PLACEHOLDER};
pub use compiler::{CompiledModule, FootprintConverter, ModuleCompiler, ModuleContext};
pub use config::{EvalOptions, LoaderConfig};
pub use diagnostics::{FailureScenario, PackageDiagnosis};
pub use engine::{ComponentEngine, EngineEvent, EngineFactory, TreeEngine};
pub use entry::{EntrySpec, SYNTHETIC_ENTRY_PATH};
pub use error::{EvalError, ExecutionError, ExportAccessError, Result};
pub use evaluator::{ExecutionContext, ModuleGraph};
pub use exports::ModuleExports;
pub use fetch::{Fetch, FetchError, FetchRequest, FetchResponse, NoNetwork};
pub use hook::{HookedModule, ResolveHook};
pub use module::{ModuleRecord, ResolvedModuleId, SourceKind};
pub use resolver::SpecifierResolver;
pub use scripted::ScriptedCompiler;
pub use value::{Element, ElementType, Function, Value};
pub use vfs::{DirectoryFs, FileSystem, MemoryFs, VirtualFileTable};
