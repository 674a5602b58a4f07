// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the worker boundary

use circuit_eval::EvalError;
use thiserror::Error;

/// Result type for worker operations
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Errors surfaced to the host
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// The worker was killed; no further calls are accepted
    #[error("Worker has been killed")]
    Killed,

    /// The worker stopped without answering
    #[error("Worker disconnected before replying")]
    Disconnected,

    /// Resolution or evaluation inside the worker failed
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// A value could not cross the boundary
    #[error("Cannot marshal value: {0}")]
    Marshal(String),

    /// The worker thread could not be started
    #[error("Failed to spawn worker: {0}")]
    Spawn(String),

    /// Rendering was requested before anything was executed
    #[error("Nothing has been executed in this worker yet")]
    NotExecuted,
}
