// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # circuit-sandbox
//!
//! Sandboxed module resolution and evaluation for circuit description
//! sources.
//!
//! - [`eval`]: resolver, loader, module graph evaluator and diagnostics
//! - [`registry`]: HTTP transport and layered settings
//! - [`worker`]: the isolated worker and its host control surface
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use circuit_sandbox::{init_tracing, worker_options, CircuitWorker, Settings};
//!
//! init_tracing(false);
//! let options = worker_options(compiler, &Settings::load()?)?;
//! let worker = CircuitWorker::spawn(options)?;
//! worker.execute(source).await?;
//! worker.render_until_settled().await?;
//! let circuit = worker.get_circuit_json().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use circuit_eval as eval;
pub use circuit_registry as registry;
pub use circuit_worker as worker;

pub use circuit_eval::{EntrySpec, EvalError, ModuleCompiler};
pub use circuit_registry::{HttpFetch, Settings};
pub use circuit_worker::{CircuitWorker, ExecuteRequest, WorkerError, WorkerOptions, WorkerSupervisor};

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber.
///
/// `circuit=debug` when `verbose`, `circuit=warn` otherwise; `RUST_LOG`
/// overrides both. Does nothing if a subscriber is already installed.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "circuit=debug" } else { "circuit=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Worker options using the HTTP transport and loader configuration from
/// `settings`
pub fn worker_options(
    compiler: Arc<dyn ModuleCompiler>,
    settings: &Settings,
) -> registry::Result<WorkerOptions> {
    let fetch = HttpFetch::new(settings)?;
    Ok(WorkerOptions::new(compiler)
        .with_fetch(Arc::new(fetch))
        .with_loader_config(settings.loader.clone()))
}
