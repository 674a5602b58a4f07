// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Component-tree engine interface
//!
//! The engine turns registered elements into the final circuit data. It is an
//! external collaborator; [`TreeEngine`] is a minimal reference implementation
//! that expands component functions and renders intrinsic elements to JSON.

use crate::error::{EvalError, Result};
use crate::value::{Element, ElementType, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// An event emitted by the engine while rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    /// Event name
    pub name: String,
    /// Event payload
    pub payload: serde_json::Value,
}

impl EngineEvent {
    /// Create an event
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// The live component-tree engine a run registers content into
pub trait ComponentEngine: Send {
    /// Register a root element
    fn add(&mut self, element: Element) -> Result<()>;

    /// Render until no more work is pending
    fn render_until_settled(&mut self) -> Result<()>;

    /// The rendered circuit data
    fn circuit_json(&self) -> Result<serde_json::Value>;

    /// Apply a configuration value (platform or project settings)
    fn configure(&mut self, key: &str, value: serde_json::Value) {
        let _ = (key, value);
    }

    /// Drain events emitted since the last call
    fn take_events(&mut self) -> Vec<EngineEvent> {
        Vec::new()
    }
}

/// Creates a fresh engine for each run
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn ComponentEngine> + Send + Sync>;

/// Nesting limit for component expansion
const MAX_COMPONENT_DEPTH: usize = 64;

/// Minimal engine: expands components, renders intrinsics to JSON
#[derive(Debug, Default)]
pub struct TreeEngine {
    roots: Vec<Element>,
    rendered: Option<Vec<serde_json::Value>>,
    config: BTreeMap<String, serde_json::Value>,
    events: Vec<EngineEvent>,
}

impl TreeEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory producing `TreeEngine`s
    pub fn factory() -> EngineFactory {
        Arc::new(|| Box::new(TreeEngine::new()) as Box<dyn ComponentEngine>)
    }

    /// Registered root elements
    pub fn roots(&self) -> &[Element] {
        &self.roots
    }

    /// Configuration applied so far
    pub fn config(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.config
    }

    fn render_roots(&self, events: &mut Vec<EngineEvent>) -> Result<Vec<serde_json::Value>> {
        let mut out = Vec::new();
        for root in &self.roots {
            out.extend(expand(&Value::Element(Box::new(root.clone())), 0, events)?);
        }
        Ok(out)
    }
}

impl ComponentEngine for TreeEngine {
    fn add(&mut self, element: Element) -> Result<()> {
        debug!("Registering root element <{}>", element.type_name());
        self.roots.push(element);
        self.rendered = None;
        Ok(())
    }

    fn render_until_settled(&mut self) -> Result<()> {
        let mut events = vec![EngineEvent::new(
            "render:start",
            serde_json::json!({ "roots": self.roots.len() }),
        )];
        let rendered = self.render_roots(&mut events)?;
        events.push(EngineEvent::new(
            "render:settled",
            serde_json::json!({ "elements": rendered.len() }),
        ));
        self.events.extend(events);
        self.rendered = Some(rendered);
        Ok(())
    }

    fn circuit_json(&self) -> Result<serde_json::Value> {
        match &self.rendered {
            Some(rendered) => Ok(serde_json::Value::Array(rendered.clone())),
            None => Ok(serde_json::Value::Array(self.render_roots(&mut Vec::new())?)),
        }
    }

    fn configure(&mut self, key: &str, value: serde_json::Value) {
        self.config.insert(key.to_string(), value);
    }

    fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}

fn expand(
    value: &Value,
    depth: usize,
    events: &mut Vec<EngineEvent>,
) -> Result<Vec<serde_json::Value>> {
    if depth > MAX_COMPONENT_DEPTH {
        return Err(EvalError::engine("component nesting is too deep"));
    }
    match value {
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(expand(item, depth, events)?);
            }
            Ok(out)
        }
        Value::Element(element) => match &element.element_type {
            ElementType::Component(component) => {
                let mut props = element.props.clone();
                if !element.children.is_empty() {
                    props.insert("children".to_string(), Value::Array(element.children.clone()));
                }
                let output = component.call(&[Value::Object(props)]).map_err(|e| {
                    EvalError::engine(format!("<{}> failed to render: {}", element.type_name(), e))
                })?;
                expand(&output, depth + 1, events)
            }
            ElementType::Intrinsic(name) => {
                let mut node = serde_json::Map::new();
                node.insert("type".to_string(), serde_json::Value::String(name.clone()));
                if let Some(key) = &element.key {
                    node.insert("key".to_string(), serde_json::Value::String(key.clone()));
                }
                for (prop, value) in &element.props {
                    if let Some(json) = value.to_json() {
                        node.insert(prop.clone(), json);
                    }
                }
                let mut children = Vec::new();
                for child in &element.children {
                    children.extend(expand(child, depth + 1, events)?);
                }
                if !children.is_empty() {
                    node.insert("children".to_string(), serde_json::Value::Array(children));
                }
                events.push(EngineEvent::new(
                    "renderable:render",
                    serde_json::json!({ "type": name }),
                ));
                Ok(vec![serde_json::Value::Object(node)])
            }
        },
        _ => Ok(Vec::new()),
    }
}
