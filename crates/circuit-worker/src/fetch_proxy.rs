// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Network access relayed through the host

use crate::protocol::WorkerEvent;
use async_trait::async_trait;
use circuit_eval::{Fetch, FetchError, FetchRequest, FetchResponse};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// `Fetch` that ships every request to the host and waits for its answer
pub(crate) struct FetchProxy {
    host: mpsc::UnboundedSender<WorkerEvent>,
}

impl FetchProxy {
    pub(crate) fn new(host: mpsc::UnboundedSender<WorkerEvent>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl Fetch for FetchProxy {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        debug!("Proxying {} {} through the host", request.method, request.url);
        let (reply, response) = oneshot::channel();
        self.host
            .send(WorkerEvent::Fetch { request, reply })
            .map_err(|_| FetchError::new("host is no longer listening"))?;
        response
            .await
            .map_err(|_| FetchError::new("host dropped the request"))?
    }
}
