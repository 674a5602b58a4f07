// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # circuit-registry
//!
//! Network transport for the module loader: an HTTP [`Fetch`] implementation
//! and the layered [`Settings`] that configure it.
//!
//! [`Fetch`]: circuit_eval::Fetch

#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod settings;

pub use client::HttpFetch;
pub use error::{RegistryError, Result};
pub use settings::Settings;
