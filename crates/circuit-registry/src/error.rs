// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for circuit-registry.

use thiserror::Error;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Registry and settings errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// HTTP client error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// IO error while reading settings
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A settings value could not be applied
    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidSetting { key: String, value: String },
}
