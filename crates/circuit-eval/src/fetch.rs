// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Network transport interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// An outbound HTTP request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Target URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body
    pub body: Option<String>,
}

impl FetchRequest {
    /// A `GET` request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a bearer credential when one is given
    pub fn with_bearer(self, token: Option<&str>) -> Self {
        match token {
            Some(token) => self.with_header("Authorization", format!("Bearer {}", token)),
            None => self,
        }
    }
}

/// A completed HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub url: String,
    /// Status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: String,
}

impl FetchResponse {
    /// A `200 OK` response
    pub fn ok(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Check for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchError {
    /// Error message
    pub message: String,
}

impl FetchError {
    /// Create a fetch error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Performs HTTP requests on behalf of the loader
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Perform a request
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// Transport that refuses every request
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNetwork;

#[async_trait]
impl Fetch for NoNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        Err(FetchError::new(format!(
            "network access is not available (requested {})",
            request.url
        )))
    }
}
