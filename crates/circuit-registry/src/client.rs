// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! HTTP transport for remote module loading.

use async_trait::async_trait;
use circuit_eval::{Fetch, FetchError, FetchRequest, FetchResponse};
use dashmap::DashMap;
use reqwest::{Client, Method, Proxy};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::settings::Settings;

/// `Fetch` implementation backed by `reqwest`.
///
/// Successful anonymous `GET` responses are cached for the life of the
/// client, so a module fetched from several sites in one run costs one
/// request.
#[derive(Clone)]
pub struct HttpFetch {
    client: Client,
    cache: Arc<DashMap<String, FetchResponse>>,
}

impl HttpFetch {
    /// Build a client from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(settings.timeout))
            .connect_timeout(Duration::from_secs(settings.connect_timeout))
            .pool_max_idle_per_host(8)
            .user_agent(settings.user_agent.as_str());

        if let Some(proxy) = &settings.proxy {
            builder = builder.proxy(Proxy::all(proxy.as_str())?);
        }

        Ok(Self::from_client(builder.build()?))
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Number of cached responses.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Drop cached responses.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn cacheable(request: &FetchRequest) -> bool {
    request.method.eq_ignore_ascii_case("GET")
        && request.body.is_none()
        && !request.headers.contains_key("Authorization")
}

#[async_trait]
impl Fetch for HttpFetch {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn fetch(&self, request: FetchRequest) -> std::result::Result<FetchResponse, FetchError> {
        let cacheable = cacheable(&request);
        if cacheable {
            if let Some(hit) = self.cache.get(&request.url) {
                debug!("Cache hit for {}", request.url);
                return Ok(hit.clone());
            }
        }

        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| FetchError::new(format!("invalid HTTP method '{}'", request.method)))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body.clone() {
            builder = builder.body(body);
        }

        debug!("{} {}", request.method, request.url);
        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::new(e.to_string()))?;

        let url = response.url().to_string();
        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::new(e.to_string()))?;

        let response = FetchResponse {
            url,
            status,
            headers,
            body,
        };
        if cacheable && response.is_success() {
            self.cache.insert(request.url, response.clone());
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `count` connections with a fixed body, returning the base URL.
    async fn serve(body: &'static str, count: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for _ in 0..count {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await.unwrap();
                let reply = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: text/javascript\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
            }
        });
        format!("http://{}", addr)
    }

    fn local_client() -> HttpFetch {
        HttpFetch::from_client(Client::builder().no_proxy().build().unwrap())
    }

    #[tokio::test]
    async fn test_get_and_cache() {
        let base = serve("export default 1", 1).await;
        let fetch = local_client();

        let url = format!("{}/npm/x/+esm", base);
        let response = fetch.fetch(FetchRequest::get(url.clone())).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "export default 1");
        assert_eq!(response.headers["content-type"], "text/javascript");
        assert_eq!(fetch.cached(), 1);

        // The server only accepts one connection; this must come from cache
        let again = fetch.fetch(FetchRequest::get(url)).await.unwrap();
        assert_eq!(again.body, "export default 1");
    }

    #[tokio::test]
    async fn test_authorized_requests_not_cached() {
        let base = serve("private", 1).await;
        let fetch = local_client();
        let request = FetchRequest::get(format!("{}/@tsci/core", base)).with_bearer(Some("tok"));
        let response = fetch.fetch(request).await.unwrap();
        assert_eq!(response.body, "private");
        assert_eq!(fetch.cached(), 0);
    }

    #[tokio::test]
    async fn test_invalid_method() {
        let fetch = local_client();
        let mut request = FetchRequest::get("http://127.0.0.1:1/");
        request.method = "NOT A METHOD".to_string();
        let err = fetch.fetch(request).await.unwrap_err();
        assert!(err.message.contains("invalid HTTP method"));
    }

    #[test]
    fn test_client_from_settings() {
        let settings = Settings {
            proxy: Some("http://127.0.0.1:3128".to_string()),
            ..Settings::default()
        };
        assert!(HttpFetch::new(&settings).is_ok());
    }
}
