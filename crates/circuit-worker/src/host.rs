// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host-side control surface of a worker

use crate::error::{Result, WorkerError};
use crate::listeners::{ListenerId, ListenerRegistry};
use crate::marshal::marshal_element;
use crate::options::WorkerOptions;
use crate::protocol::{ComponentInput, ComponentPayload, ConfigUpdate, Reply, WorkerCommand, WorkerEvent};
use crate::worker::{Worker, spawn_thread};
use circuit_eval::{EngineEvent, EntrySpec, Fetch, FileSystem, VirtualFileTable};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument};

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// Where an execution's files come from
#[derive(Clone)]
pub enum FileSource {
    /// Path to content map
    Map(BTreeMap<String, String>),
    /// A filesystem handler, snapshotted before the call crosses
    Fs(Arc<dyn FileSystem>),
}

/// Arguments of [`CircuitWorker::execute_with_fs_map`]
#[derive(Clone)]
pub struct ExecuteRequest {
    /// Entry selection, name and props
    pub entry: EntrySpec,
    /// Project files
    pub files: FileSource,
}

impl ExecuteRequest {
    /// Execute over an in-memory file map
    pub fn from_map<I, K, V>(entry: EntrySpec, files: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entry,
            files: FileSource::Map(files.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// Execute over a filesystem handler
    pub fn from_fs(entry: EntrySpec, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            entry,
            files: FileSource::Fs(fs),
        }
    }

    fn into_parts(self) -> Result<(VirtualFileTable, EntrySpec)> {
        let files = match self.files {
            FileSource::Map(map) => VirtualFileTable::from_map(map),
            FileSource::Fs(fs) => VirtualFileTable::from_fs(fs.as_ref())?,
        };
        Ok((files, self.entry))
    }
}

/// Handle to an isolated circuit evaluation worker.
///
/// Every method is a request to the worker thread and resolves when the
/// worker answers. Once [`kill`](Self::kill) has been called every method
/// fails with [`WorkerError::Killed`].
pub struct CircuitWorker {
    id: u64,
    commands: mpsc::UnboundedSender<WorkerCommand>,
    shutdown: watch::Sender<bool>,
    killed: AtomicBool,
    listeners: Arc<ListenerRegistry>,
}

impl CircuitWorker {
    /// Start a worker. Must be called from within a tokio runtime, which
    /// delivers events and proxied requests to the host.
    pub fn spawn(options: WorkerOptions) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| WorkerError::Spawn(e.to_string()))?;

        let id = NEXT_WORKER_ID.fetch_add(1, Ordering::SeqCst);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let listeners = Arc::new(ListenerRegistry::new());

        let host_fetch = options.fetch.clone();
        let worker = Worker::new(options, event_tx);
        // Detached; the thread exits on shutdown or when this handle drops
        spawn_thread(worker, command_rx, shutdown_rx)?;
        runtime.spawn(dispatch(event_rx, listeners.clone(), host_fetch));

        info!("Spawned worker {}", id);
        Ok(Self {
            id,
            commands: command_tx,
            shutdown: shutdown_tx,
            killed: AtomicBool::new(false),
            listeners,
        })
    }

    /// Process-unique worker id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether [`kill`](Self::kill) has been called
    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    fn gone(&self) -> WorkerError {
        if self.is_killed() {
            WorkerError::Killed
        } else {
            WorkerError::Disconnected
        }
    }

    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> WorkerCommand) -> Result<T> {
        if self.is_killed() {
            return Err(WorkerError::Killed);
        }
        let (reply, response) = oneshot::channel();
        self.commands.send(command(reply)).map_err(|_| self.gone())?;
        response.await.map_err(|_| self.gone())?
    }

    /// Evaluate inline source as the entry module
    #[instrument(skip(self, source), fields(worker = self.id))]
    pub async fn execute(&self, source: &str) -> Result<()> {
        let source = source.to_string();
        self.call(|reply| WorkerCommand::Execute { source, reply }).await
    }

    /// Evaluate a project given as a file map or filesystem handler
    #[instrument(skip(self, request), fields(worker = self.id))]
    pub async fn execute_with_fs_map(&self, request: ExecuteRequest) -> Result<()> {
        if self.is_killed() {
            return Err(WorkerError::Killed);
        }
        let (files, entry) = request.into_parts()?;
        debug!("Sending {} files", files.len());
        self.call(|reply| WorkerCommand::ExecuteWithFiles { files, entry, reply })
            .await
    }

    /// Render a component tree built on the host, or a factory that builds
    /// it inside the worker
    #[instrument(skip(self, component), fields(worker = self.id))]
    pub async fn execute_component(&self, component: impl Into<ComponentInput>) -> Result<()> {
        let component = match component.into() {
            ComponentInput::Element(element) => {
                let transfer = marshal_element(&element)?;
                debug!(
                    "Marshaled <{}>: {} bytes, {} function references",
                    element.type_name(),
                    transfer.payload().len(),
                    transfer.function_count()
                );
                ComponentPayload::Element(transfer)
            }
            ComponentInput::Factory(factory) => ComponentPayload::Factory(factory),
        };
        self.call(|reply| WorkerCommand::ExecuteComponent { component, reply })
            .await
    }

    /// Render the current tree until the engine settles
    pub async fn render_until_settled(&self) -> Result<()> {
        self.call(|reply| WorkerCommand::RenderUntilSettled { reply }).await
    }

    /// The rendered circuit data
    pub async fn get_circuit_json(&self) -> Result<serde_json::Value> {
        self.call(|reply| WorkerCommand::GetCircuitJson { reply }).await
    }

    /// Call `callback` for every engine event named `event`.
    ///
    /// The callback stays on the host; events are delivered asynchronously
    /// on the runtime the worker was spawned from.
    pub async fn on<F>(&self, event: &str, callback: F) -> Result<ListenerId>
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        if self.is_killed() {
            return Err(WorkerError::Killed);
        }
        let listener = self.listeners.register(Arc::new(callback));
        let event = event.to_string();
        self.call(|reply| WorkerCommand::Subscribe {
            event,
            listener,
            reply,
        })
        .await?;
        Ok(listener)
    }

    /// Drop every registered listener
    pub async fn clear_event_listeners(&self) -> Result<()> {
        self.call(|reply| WorkerCommand::ClearListeners { reply }).await?;
        self.listeners.clear();
        Ok(())
    }

    async fn configure(&self, update: ConfigUpdate) -> Result<()> {
        self.call(|reply| WorkerCommand::Configure { update, reply }).await
    }

    /// Base URL of the snippet registry
    pub async fn set_snippets_api_base_url(&self, url: &str) -> Result<()> {
        self.configure(ConfigUpdate::SnippetsApiBaseUrl(url.to_string()))
            .await
    }

    /// Session token for the private registry and snippets
    pub async fn set_session_token(&self, token: Option<&str>) -> Result<()> {
        self.configure(ConfigUpdate::SessionToken(token.map(str::to_string)))
            .await
    }

    /// Stop resolving bare specifiers over the network
    pub async fn set_disable_network(&self, disabled: bool) -> Result<()> {
        self.configure(ConfigUpdate::DisableNetwork(disabled)).await
    }

    /// Platform configuration handed to the engine
    pub async fn set_platform_config(&self, config: serde_json::Value) -> Result<()> {
        self.configure(ConfigUpdate::PlatformConfig(config)).await
    }

    /// Project configuration handed to the engine
    pub async fn set_project_config(&self, config: serde_json::Value) -> Result<()> {
        self.configure(ConfigUpdate::ProjectConfig(config)).await
    }

    /// Base URL placeholder-marked static assets are served from
    pub async fn set_asset_base_url(&self, url: Option<&str>) -> Result<()> {
        self.configure(ConfigUpdate::AssetBaseUrl(url.map(str::to_string)))
            .await
    }

    /// Terminate the worker and release its listeners.
    ///
    /// A call in flight is abandoned and fails with [`WorkerError::Killed`].
    pub async fn kill(&self) -> Result<()> {
        if self.killed.swap(true, Ordering::SeqCst) {
            return Err(WorkerError::Killed);
        }
        let _ = self.shutdown.send(true);
        self.listeners.clear();
        info!("Killed worker {}", self.id);
        Ok(())
    }
}

/// Deliver worker events on the host runtime until the worker goes away
async fn dispatch(
    mut events: mpsc::UnboundedReceiver<WorkerEvent>,
    listeners: Arc<ListenerRegistry>,
    fetch: Arc<dyn Fetch>,
) {
    while let Some(event) = events.recv().await {
        match event {
            WorkerEvent::Invoke { listener, event } => listeners.invoke(listener, &event),
            WorkerEvent::Fetch { request, reply } => {
                let fetch = fetch.clone();
                tokio::spawn(async move {
                    debug!("Host fetching {}", request.url);
                    let _ = reply.send(fetch.fetch(request).await);
                });
            }
        }
    }
    debug!("Worker event stream closed");
}
