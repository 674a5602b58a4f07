// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Messages exchanged between the host and the worker thread

use crate::error::Result;
use crate::listeners::ListenerId;
use crate::marshal::Transfer;
use circuit_eval::{EngineEvent, EntrySpec, FetchError, FetchRequest, FetchResponse, Value, VirtualFileTable};
use tokio::sync::oneshot;

/// Reply channel for a command
pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

/// A component factory, called inside the worker
pub type ComponentFactory = Box<dyn FnOnce() -> Value + Send>;

/// What to render with `execute_component`
pub enum ComponentInput {
    /// A prepared element, marshaled structurally across the boundary
    Element(circuit_eval::Element),
    /// A factory whose tree construction happens inside the worker
    Factory(ComponentFactory),
}

impl ComponentInput {
    /// Wrap a factory closure
    pub fn factory<F>(factory: F) -> Self
    where
        F: FnOnce() -> Value + Send + 'static,
    {
        ComponentInput::Factory(Box::new(factory))
    }
}

impl From<circuit_eval::Element> for ComponentInput {
    fn from(element: circuit_eval::Element) -> Self {
        ComponentInput::Element(element)
    }
}

/// A component after it crossed the boundary
pub(crate) enum ComponentPayload {
    Element(Transfer),
    Factory(ComponentFactory),
}

/// Configuration changes applied inside the worker
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConfigUpdate {
    SnippetsApiBaseUrl(String),
    SessionToken(Option<String>),
    DisableNetwork(bool),
    AssetBaseUrl(Option<String>),
    PlatformConfig(serde_json::Value),
    ProjectConfig(serde_json::Value),
}

/// Host to worker
pub(crate) enum WorkerCommand {
    Execute {
        source: String,
        reply: Reply<()>,
    },
    ExecuteWithFiles {
        files: VirtualFileTable,
        entry: EntrySpec,
        reply: Reply<()>,
    },
    ExecuteComponent {
        component: ComponentPayload,
        reply: Reply<()>,
    },
    RenderUntilSettled {
        reply: Reply<()>,
    },
    GetCircuitJson {
        reply: Reply<serde_json::Value>,
    },
    Subscribe {
        event: String,
        listener: ListenerId,
        reply: Reply<()>,
    },
    ClearListeners {
        reply: Reply<()>,
    },
    Configure {
        update: ConfigUpdate,
        reply: Reply<()>,
    },
}

impl WorkerCommand {
    /// Short name for logging
    pub(crate) fn name(&self) -> &'static str {
        match self {
            WorkerCommand::Execute { .. } => "execute",
            WorkerCommand::ExecuteWithFiles { .. } => "executeWithFsMap",
            WorkerCommand::ExecuteComponent { .. } => "executeComponent",
            WorkerCommand::RenderUntilSettled { .. } => "renderUntilSettled",
            WorkerCommand::GetCircuitJson { .. } => "getCircuitJson",
            WorkerCommand::Subscribe { .. } => "on",
            WorkerCommand::ClearListeners { .. } => "clearEventListeners",
            WorkerCommand::Configure { .. } => "configure",
        }
    }
}

/// Worker to host
pub(crate) enum WorkerEvent {
    /// Invoke a host listener
    Invoke { listener: ListenerId, event: EngineEvent },
    /// Perform a network request on the worker's behalf
    Fetch {
        request: FetchRequest,
        reply: oneshot::Sender<std::result::Result<FetchResponse, FetchError>>,
    },
}
