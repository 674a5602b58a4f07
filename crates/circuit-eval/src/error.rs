// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for module resolution and evaluation

use crate::diagnostics::FailureScenario;
use thiserror::Error;

/// Result type for evaluation operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while resolving, loading or evaluating a module graph
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// Specifier could not be mapped to content
    #[error("Cannot resolve '{specifier}': {reason}")]
    Resolution {
        /// Module specifier
        specifier: String,
        /// Human-readable explanation
        reason: String,
        /// Package-cache failure scenario, when one applies
        scenario: Option<FailureScenario>,
    },

    /// Circular import detected
    #[error("Circular dependency detected: {}", .chain.join(" -> "))]
    CycleDetected {
        /// Modules forming the cycle, first and last entries are the same module
        chain: Vec<String>,
    },

    /// The compiler or the module body failed
    #[error("Eval error in '{specifier}': {message}{}", format_logs(.logs))]
    Evaluation {
        /// Module specifier being evaluated
        specifier: String,
        /// Underlying error message
        message: String,
        /// Log output accumulated during the run
        logs: Vec<String>,
    },

    /// Attribute access on a module's exports failed
    #[error(transparent)]
    ExportAccess(#[from] ExportAccessError),

    /// A module asked for something that has not been evaluated
    #[error("Module '{specifier}' not found while evaluating '{importer}' (it was not imported before use)")]
    RequireNotFound {
        /// Requested specifier
        specifier: String,
        /// Module performing the lookup
        importer: String,
    },

    /// Network fetch from a registry, CDN or snippet source failed
    #[error("Failed to fetch '{specifier}' (tried {}): {message}", .urls.join(", "))]
    Transport {
        /// Specifier being fetched
        specifier: String,
        /// Every URL attempted, in order
        urls: Vec<String>,
        /// Last underlying error
        message: String,
    },

    /// The resolved file has an extension no loader handles
    #[error("Unsupported file extension '{extension}' for '{path}'")]
    UnsupportedExtension {
        /// Resolved path
        path: String,
        /// Offending extension
        extension: String,
    },

    /// Relative path walked above the root of the file table
    #[error("Path '{0}' escapes the project root")]
    PathEscapesRoot(String),

    /// Path-alias configuration is malformed
    #[error("Failed to parse path alias configuration '{path}': {reason}")]
    AliasConfig {
        /// Configuration file path
        path: String,
        /// Parse failure
        reason: String,
    },

    /// Package manifest is malformed
    #[error("Invalid package manifest '{path}': {reason}")]
    Manifest {
        /// Manifest path
        path: String,
        /// Parse failure
        reason: String,
    },

    /// JSON module could not be parsed
    #[error("Invalid JSON in '{path}': {reason}")]
    Json {
        /// JSON file path
        path: String,
        /// Parse failure
        reason: String,
    },

    /// Entry-point could not be determined or synthesised
    #[error("Entrypoint error: {0}")]
    EntryPoint(String),

    /// Component-tree engine failure
    #[error("Engine error: {0}")]
    Engine(String),

    /// Filesystem handler failure
    #[error("File system error: {0}")]
    Io(String),
}

impl EvalError {
    /// Create a resolution failure without a package-cache scenario
    pub fn resolution(specifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            specifier: specifier.into(),
            reason: reason.into(),
            scenario: None,
        }
    }

    /// Create an engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Package-cache scenario attached to a resolution failure
    pub fn scenario(&self) -> Option<FailureScenario> {
        match self {
            Self::Resolution { scenario, .. } => *scenario,
            _ => None,
        }
    }

    /// Whether this error reports a circular import
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::CycleDetected { .. })
    }
}

impl From<std::io::Error> for EvalError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

fn format_logs(logs: &[String]) -> String {
    if logs.is_empty() {
        return String::new();
    }
    format!("\n\nLogs:\n{}", logs.join("\n"))
}

/// Errors raised when a consumer reads a name a module did not produce
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportAccessError {
    /// The name was declared, but only as a type
    #[error(
        "'{name}' is exported from '{module}' as a type only; use `export type {{ {name} }}` / `import type {{ {name} }}` instead of importing it as a value"
    )]
    TypeOnlyExport {
        /// Module id
        module: String,
        /// Requested name
        name: String,
    },

    /// The name does not exist at all
    #[error("'{name}' is not exported from '{module}'")]
    MissingExport {
        /// Module id
        module: String,
        /// Requested name
        name: String,
    },
}

/// Failure raised by a compiled module body while it runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecutionError {
    /// Error message
    pub message: String,
    /// Stack trace text, as produced by the executing runtime
    pub stack: Option<String>,
}

impl ExecutionError {
    /// Create an execution error without a stack
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    /// Attach stack trace text
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl From<EvalError> for ExecutionError {
    fn from(err: EvalError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<ExportAccessError> for ExecutionError {
    fn from(err: ExportAccessError) -> Self {
        Self::new(err.to_string())
    }
}
