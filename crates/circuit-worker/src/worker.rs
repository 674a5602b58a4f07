// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The isolated side of the boundary
//!
//! A worker owns its module graph and the current execution context on a
//! dedicated thread with a single-threaded runtime. The host reaches it only
//! through [`WorkerCommand`]s; it reaches the host only through
//! [`WorkerEvent`]s.

use crate::error::{Result, WorkerError};
use crate::fetch_proxy::FetchProxy;
use crate::listeners::ListenerId;
use crate::marshal::unmarshal_element;
use crate::options::WorkerOptions;
use crate::protocol::{ComponentPayload, ConfigUpdate, WorkerCommand, WorkerEvent};
use circuit_eval::{
    ComponentEngine, Element, EngineFactory, EntrySpec, ExecutionContext, Fetch, ModuleExports,
    ModuleGraph, Value, VirtualFileTable,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Name given to worker threads
pub const WORKER_THREAD_NAME: &str = "circuit-worker";

enum Entry {
    Source(String),
    Spec(EntrySpec),
}

pub(crate) struct Worker {
    graph: ModuleGraph,
    engine_factory: EngineFactory,
    provided: Vec<(String, ModuleExports)>,
    platform_config: Option<serde_json::Value>,
    project_config: Option<serde_json::Value>,
    context: Option<ExecutionContext>,
    subscriptions: HashMap<String, Vec<ListenerId>>,
    host: mpsc::UnboundedSender<WorkerEvent>,
    verbose: bool,
}

impl Worker {
    pub(crate) fn new(options: WorkerOptions, host: mpsc::UnboundedSender<WorkerEvent>) -> Self {
        let fetch: Arc<dyn Fetch> = if options.enable_fetch_proxy {
            Arc::new(FetchProxy::new(host.clone()))
        } else {
            options.fetch
        };

        let mut graph = ModuleGraph::new(options.compiler)
            .with_fetch(fetch)
            .with_options(options.eval);
        if let Some(converter) = options.footprint_converter {
            graph = graph.with_footprint_converter(converter);
        }
        if let Some(hook) = options.resolve_hook {
            graph = graph.with_resolve_hook(hook);
        }

        Self {
            graph,
            engine_factory: options.engine_factory,
            provided: options.provided,
            platform_config: None,
            project_config: None,
            context: None,
            subscriptions: HashMap::new(),
            host,
            verbose: options.verbose,
        }
    }

    /// Process commands until the host disconnects or signals shutdown.
    ///
    /// Shutdown also interrupts a command in flight; its reply is dropped.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<WorkerCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Worker started");
        loop {
            let command = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                command = commands.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            let name = command.name();
            debug!("Handling {}", name);
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    warn!("Worker killed during {}", name);
                    break;
                }
                _ = self.handle(command) => {}
            }
        }
        self.graph.blobs().clear();
        info!("Worker stopped");
    }

    async fn handle(&mut self, command: WorkerCommand) {
        match command {
            WorkerCommand::Execute { source, reply } => {
                let result = self.execute(VirtualFileTable::new(), Entry::Source(source)).await;
                let _ = reply.send(result);
            }
            WorkerCommand::ExecuteWithFiles { files, entry, reply } => {
                let result = self.execute(files, Entry::Spec(entry)).await;
                let _ = reply.send(result);
            }
            WorkerCommand::ExecuteComponent { component, reply } => {
                let _ = reply.send(self.execute_component(component));
            }
            WorkerCommand::RenderUntilSettled { reply } => {
                let _ = reply.send(self.render_until_settled());
            }
            WorkerCommand::GetCircuitJson { reply } => {
                let _ = reply.send(self.circuit_json());
            }
            WorkerCommand::Subscribe { event, listener, reply } => {
                self.subscriptions.entry(event).or_default().push(listener);
                let _ = reply.send(Ok(()));
            }
            WorkerCommand::ClearListeners { reply } => {
                self.subscriptions.clear();
                let _ = reply.send(Ok(()));
            }
            WorkerCommand::Configure { update, reply } => {
                self.configure(update);
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn new_context(&self, files: VirtualFileTable) -> Result<ExecutionContext> {
        let mut engine = (self.engine_factory)();
        if let Some(config) = &self.platform_config {
            engine.configure("platform", config.clone());
        }
        if let Some(config) = &self.project_config {
            engine.configure("project", config.clone());
        }
        let mut ctx = ExecutionContext::new(files, engine, &self.graph.options().loader)?;
        for (specifier, exports) in &self.provided {
            ctx.provide(specifier, exports.clone());
        }
        Ok(ctx)
    }

    async fn execute(&mut self, files: VirtualFileTable, entry: Entry) -> Result<()> {
        let mut ctx = self.new_context(files)?;
        let result = match &entry {
            Entry::Source(source) => self.graph.execute_source(&mut ctx, source).await,
            Entry::Spec(spec) => self.graph.execute_entry(&mut ctx, spec).await,
        };

        if self.verbose {
            for line in ctx.logs() {
                info!(target: "circuit::console", "{}", line);
            }
        }
        forward_events(&self.subscriptions, &self.host, ctx.engine_mut());
        self.context = Some(ctx);

        let entry = result?;
        debug!("Executed {}", entry);
        Ok(())
    }

    fn execute_component(&mut self, component: ComponentPayload) -> Result<()> {
        let element = match component {
            ComponentPayload::Element(transfer) => unmarshal_element(transfer)?,
            ComponentPayload::Factory(factory) => into_element(factory())?,
        };
        debug!("Adding component <{}>", element.type_name());

        let mut ctx = self.new_context(VirtualFileTable::new())?;
        let result = ctx.engine_mut().add(element);
        forward_events(&self.subscriptions, &self.host, ctx.engine_mut());
        self.context = Some(ctx);
        Ok(result?)
    }

    fn render_until_settled(&mut self) -> Result<()> {
        let ctx = self.context.as_mut().ok_or(WorkerError::NotExecuted)?;
        let result = ctx.engine_mut().render_until_settled();
        forward_events(&self.subscriptions, &self.host, ctx.engine_mut());
        Ok(result?)
    }

    fn circuit_json(&self) -> Result<serde_json::Value> {
        let ctx = self.context.as_ref().ok_or(WorkerError::NotExecuted)?;
        Ok(ctx.engine().circuit_json()?)
    }

    fn configure(&mut self, update: ConfigUpdate) {
        debug!("Applying {:?}", update);
        match update {
            ConfigUpdate::SnippetsApiBaseUrl(url) => {
                self.graph.options_mut().loader.snippets_api_base_url = url;
            }
            ConfigUpdate::SessionToken(token) => {
                self.graph.options_mut().loader.session_token = token;
            }
            ConfigUpdate::DisableNetwork(disabled) => {
                self.graph.options_mut().loader.disable_network = disabled;
            }
            ConfigUpdate::AssetBaseUrl(url) => {
                self.graph.options_mut().loader.asset_base_url = url;
            }
            ConfigUpdate::PlatformConfig(config) => {
                self.configure_engine("platform", &config);
                self.platform_config = Some(config);
            }
            ConfigUpdate::ProjectConfig(config) => {
                self.configure_engine("project", &config);
                self.project_config = Some(config);
            }
        }
    }

    fn configure_engine(&mut self, key: &str, config: &serde_json::Value) {
        if let Some(ctx) = self.context.as_mut() {
            ctx.engine_mut().configure(key, config.clone());
        }
    }
}

/// Turn a factory's output into a root element
fn into_element(value: Value) -> Result<Element> {
    match value {
        Value::Element(element) => Ok(*element),
        Value::Function(component) => Ok(Element::component(component)),
        other => Err(WorkerError::Marshal(format!(
            "component factory returned {}, expected an element",
            other.type_name()
        ))),
    }
}

/// Send drained engine events to the host listeners subscribed to them
fn forward_events(
    subscriptions: &HashMap<String, Vec<ListenerId>>,
    host: &mpsc::UnboundedSender<WorkerEvent>,
    engine: &mut dyn ComponentEngine,
) {
    for event in engine.take_events() {
        let Some(listeners) = subscriptions.get(&event.name) else {
            continue;
        };
        for &listener in listeners {
            let _ = host.send(WorkerEvent::Invoke {
                listener,
                event: event.clone(),
            });
        }
    }
}

/// Start `worker` on its own thread
pub(crate) fn spawn_thread(
    worker: Worker,
    commands: mpsc::UnboundedReceiver<WorkerCommand>,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to start worker runtime: {}", e);
                    return;
                }
            };
            runtime.block_on(worker.run(commands, shutdown));
        })
        .map_err(|e| WorkerError::Spawn(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuit_eval::Function;

    #[test]
    fn test_into_element() {
        let board = Element::intrinsic("board");
        assert_eq!(into_element(board.clone().into()).unwrap(), board);

        let component = Function::new("Board", |_| Ok(Value::Null));
        let element = into_element(Value::Function(component)).unwrap();
        assert_eq!(element.type_name(), "Board");

        let err = into_element(Value::Number(1.0)).unwrap_err();
        assert!(err.to_string().contains("returned number"));
    }

    #[test]
    fn test_events_reach_subscribers_only() {
        struct Noisy;
        impl ComponentEngine for Noisy {
            fn add(&mut self, _: Element) -> circuit_eval::Result<()> {
                Ok(())
            }
            fn render_until_settled(&mut self) -> circuit_eval::Result<()> {
                Ok(())
            }
            fn circuit_json(&self) -> circuit_eval::Result<serde_json::Value> {
                Ok(serde_json::Value::Null)
            }
            fn take_events(&mut self) -> Vec<circuit_eval::EngineEvent> {
                vec![
                    circuit_eval::EngineEvent::new("render:start", serde_json::Value::Null),
                    circuit_eval::EngineEvent::new("render:settled", serde_json::Value::Null),
                ]
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subscriptions = HashMap::new();
        subscriptions.insert("render:settled".to_string(), vec![ListenerId(7)]);
        forward_events(&subscriptions, &tx, &mut Noisy);

        match rx.try_recv().unwrap() {
            WorkerEvent::Invoke { listener, event } => {
                assert_eq!(listener, ListenerId(7));
                assert_eq!(event.name, "render:settled");
            }
            WorkerEvent::Fetch { .. } => panic!("unexpected fetch"),
        }
        assert!(rx.try_recv().is_err());
    }
}
