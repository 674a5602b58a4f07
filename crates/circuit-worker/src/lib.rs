// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # circuit-worker
//!
//! Runs circuit evaluation in an isolated worker and exposes a narrow async
//! control surface to the host.
//!
//! - [`CircuitWorker`] is the host handle: execute, render, read the
//!   circuit, subscribe to engine events, configure, kill.
//! - [`WorkerSupervisor`] keeps a single active worker per host.
//! - Component trees cross the boundary structurally ([`marshal`]);
//!   callbacks stay on the host and are invoked by id ([`listeners`]).
//! - With the fetch proxy enabled, network requests made inside the worker
//!   are performed by the host.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
mod fetch_proxy;
pub mod host;
pub mod listeners;
pub mod marshal;
pub mod options;
pub mod protocol;
pub mod supervisor;
mod worker;

pub use error::{Result, WorkerError};
pub use host::{CircuitWorker, ExecuteRequest, FileSource};
pub use listeners::{Listener, ListenerId};
pub use options::WorkerOptions;
pub use protocol::{ComponentFactory, ComponentInput};
pub use supervisor::WorkerSupervisor;
pub use worker::WORKER_THREAD_NAME;
