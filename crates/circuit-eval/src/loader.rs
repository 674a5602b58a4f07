// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Content loading from the file table and remote sources

use crate::config::LoaderConfig;
use crate::error::{EvalError, Result};
use crate::fetch::{Fetch, FetchRequest};
use crate::module::{ResolvedModuleId, SourceKind};
use crate::path::extension;
use crate::vfs::VirtualFileTable;
use tracing::{debug, info, warn};
use url::Url;

/// Raw content ready for evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSource {
    /// Module identity
    pub id: ResolvedModuleId,
    /// How the content is evaluated
    pub kind: SourceKind,
    /// Raw text
    pub content: String,
    /// Directory nested relative imports resolve against
    pub directory: String,
}

impl LoadedSource {
    /// Wrap remote content fetched from `url`
    pub fn remote(url: &str, content: String) -> Self {
        let id = ResolvedModuleId::new(url);
        Self {
            kind: remote_kind(url),
            directory: id.directory(),
            id,
            content,
        }
    }
}

/// Load a resolved local file, dispatching on its extension
pub fn load_local(files: &VirtualFileTable, id: &ResolvedModuleId) -> Result<LoadedSource> {
    let path = id.as_str();
    let kind = SourceKind::from_path(path).ok_or_else(|| EvalError::UnsupportedExtension {
        path: path.to_string(),
        extension: extension(path).unwrap_or_default(),
    })?;
    let content = files
        .get(path)
        .ok_or_else(|| EvalError::resolution(path, "file is not in the file table"))?;
    Ok(LoadedSource {
        id: id.clone(),
        kind,
        content: content.to_string(),
        directory: id.directory(),
    })
}

fn remote_kind(url: &str) -> SourceKind {
    match SourceKind::from_path(url) {
        Some(kind @ (SourceKind::Json | SourceKind::StaticAsset)) => kind,
        _ => SourceKind::Code,
    }
}

/// A snippet registry reference, `@ns/owner.name[/subpath]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetRef<'s> {
    /// Snippet owner
    pub owner: &'s str,
    /// Snippet name
    pub name: &'s str,
    /// Path inside the snippet
    pub subpath: Option<&'s str>,
}

/// Parse a snippet specifier in `namespace`
pub fn parse_snippet_specifier<'s>(specifier: &'s str, namespace: &str) -> Option<SnippetRef<'s>> {
    let rest = specifier.strip_prefix(namespace)?.strip_prefix('/')?;
    let (head, subpath) = match rest.split_once('/') {
        Some((head, sub)) => (head, Some(sub).filter(|s| !s.is_empty())),
        None => (rest, None),
    };
    let (owner, name) = head.split_once('.')?;
    if owner.is_empty() || name.is_empty() {
        return None;
    }
    Some(SnippetRef {
        owner,
        name,
        subpath,
    })
}

/// Resolve `specifier` against the URL directory of a remote module
pub fn join_url(directory: &str, specifier: &str) -> Result<String> {
    let base = Url::parse(&format!("{}/", directory.trim_end_matches('/')))
        .map_err(|e| EvalError::resolution(specifier, format!("invalid base URL '{}': {}", directory, e)))?;
    base.join(specifier)
        .map(String::from)
        .map_err(|e| EvalError::resolution(specifier, e.to_string()))
}

/// Loads bare specifiers and URLs over the network
pub struct RemoteLoader<'a> {
    config: &'a LoaderConfig,
    fetch: &'a dyn Fetch,
}

impl<'a> RemoteLoader<'a> {
    /// Create a loader
    pub fn new(config: &'a LoaderConfig, fetch: &'a dyn Fetch) -> Self {
        Self { config, fetch }
    }

    /// Requests to try for a bare specifier, in order
    pub fn requests(&self, specifier: &str) -> Vec<FetchRequest> {
        if let Some(snippet) = parse_snippet_specifier(specifier, &self.config.private_namespace) {
            let mut url = format!(
                "{}/{}/{}",
                self.config.snippets_api_base_url.trim_end_matches('/'),
                snippet.owner,
                snippet.name
            );
            if let Some(sub) = snippet.subpath {
                url.push('/');
                url.push_str(sub);
            }
            return vec![FetchRequest::get(url).with_bearer(self.config.snippet_bearer())];
        }

        let mut requests = Vec::new();
        if let Some(token) = self.config.session_token.as_deref() {
            if self.config.is_private(specifier) {
                requests.push(
                    FetchRequest::get(format!(
                        "{}/{}",
                        self.config.private_registry_url.trim_end_matches('/'),
                        specifier
                    ))
                    .with_bearer(Some(token)),
                );
            }
        }
        requests.push(FetchRequest::get(self.config.cdn_url(specifier)));
        requests
    }

    /// Fetch a bare specifier; the first successful source wins
    pub async fn load(&self, specifier: &str) -> Result<LoadedSource> {
        self.load_requests(specifier, self.requests(specifier)).await
    }

    /// Fetch an absolute URL
    pub async fn load_url(&self, url: &str) -> Result<LoadedSource> {
        if remote_kind(url) == SourceKind::StaticAsset {
            // Remote assets are referenced, never downloaded
            return Ok(LoadedSource::remote(url, url.to_string()));
        }
        self.load_requests(url, vec![FetchRequest::get(url)]).await
    }

    async fn load_requests(&self, specifier: &str, requests: Vec<FetchRequest>) -> Result<LoadedSource> {
        let urls: Vec<String> = requests.iter().map(|r| r.url.clone()).collect();
        let mut last_error = String::from("no sources to try");

        for request in requests {
            let url = request.url.clone();
            debug!("Fetching '{}' from {}", specifier, url);
            match self.fetch.fetch(request).await {
                Ok(response) if response.is_success() => {
                    let final_url = if response.url.is_empty() { url } else { response.url };
                    info!("Loaded '{}' from {}", specifier, final_url);
                    return Ok(LoadedSource::remote(&final_url, response.body));
                }
                Ok(response) => {
                    last_error = format!("HTTP {} from {}", response.status, url);
                }
                Err(e) => {
                    last_error = format!("{} ({})", e, url);
                }
            }
            warn!("Fetching '{}' failed: {}", specifier, last_error);
        }

        Err(EvalError::Transport {
            specifier: specifier.to_string(),
            urls,
            message: last_error,
        })
    }
}
