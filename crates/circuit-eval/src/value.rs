// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Values produced and consumed by evaluated modules.

use crate::error::ExecutionError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Signature of a host-callable function value
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, ExecutionError> + Send + Sync;

/// A callable value.
///
/// Equality is identity: two functions are equal only if they share the same
/// underlying closure.
#[derive(Clone)]
pub struct Function {
    name: String,
    call: Arc<NativeFn>,
}

impl Function {
    /// Wrap a closure
    pub fn new<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            call: Arc::new(call),
        }
    }

    /// Function name (may be empty)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function
    pub fn call(&self, args: &[Value]) -> Result<Value, ExecutionError> {
        (self.call)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", if self.name.is_empty() { "anonymous" } else { &self.name })
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.call, &other.call)
    }
}

/// A value exchanged between modules and the component-tree engine
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Bool(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Ordered list
    Array(Vec<Value>),
    /// Plain object
    Object(BTreeMap<String, Value>),
    /// Callable
    Function(Function),
    /// Component-tree element
    Element(Box<Element>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            // NaN is never equal to itself
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Returns true if this value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Type name, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Element(_) => "element",
        }
    }

    /// Borrow as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as an object map
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow as a function
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Borrow as an element
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Value::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Convert from JSON
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(arr) => Value::Array(arr.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON.
    ///
    /// Functions have no JSON form and yield `None`; inside arrays and
    /// objects they are dropped. Elements serialize structurally.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Value::Undefined => return None,
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                serde_json::Value::from(*n as i64)
            }
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|v| v.to_json().unwrap_or(serde_json::Value::Null))
                    .collect(),
            ),
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .filter_map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
                    .collect(),
            ),
            Value::Function(_) => return None,
            Value::Element(element) => element.to_json(),
        })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Element> for Value {
    fn from(e: Element) -> Self {
        Value::Element(Box::new(e))
    }
}

/// What an element renders as
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    /// Built-in element handled by the engine directly (`"board"`, `"resistor"`)
    Intrinsic(String),
    /// User component, called with props to produce more elements
    Component(Function),
}

/// A component-tree node
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Element type
    pub element_type: ElementType,
    /// Properties
    pub props: BTreeMap<String, Value>,
    /// Reconciliation key
    pub key: Option<String>,
    /// Children
    pub children: Vec<Value>,
}

impl Element {
    /// Create an element of a built-in type
    pub fn intrinsic(name: impl Into<String>) -> Self {
        Self::new(ElementType::Intrinsic(name.into()))
    }

    /// Create an element rendering a component function
    pub fn component(component: Function) -> Self {
        Self::new(ElementType::Component(component))
    }

    fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            props: BTreeMap::new(),
            key: None,
            children: Vec::new(),
        }
    }

    /// Set a property
    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Append a child
    pub fn with_child(mut self, child: impl Into<Value>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Set the key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Display name of the element type
    pub fn type_name(&self) -> &str {
        match &self.element_type {
            ElementType::Intrinsic(name) => name,
            ElementType::Component(f) => f.name(),
        }
    }

    /// Structural JSON form (`type`, `props`, `key`, `children`)
    pub fn to_json(&self) -> serde_json::Value {
        let props: serde_json::Map<String, serde_json::Value> = self
            .props
            .iter()
            .filter_map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
            .collect();
        serde_json::json!({
            "type": self.type_name(),
            "props": props,
            "key": self.key,
            "children": self
                .children
                .iter()
                .filter_map(Value::to_json)
                .collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip_shape() {
        let json = json!({ "name": "R1", "pins": [1, 2], "nested": { "ok": true } });
        let value = Value::from_json(&json);
        assert_eq!(value.to_json(), Some(json));
    }

    #[test]
    fn test_functions_drop_out_of_json() {
        let f = Function::new("noop", |_| Ok(Value::Undefined));
        let mut map = BTreeMap::new();
        map.insert("f".to_string(), Value::Function(f.clone()));
        map.insert("n".to_string(), Value::Number(1.0));
        assert_eq!(Value::Object(map).to_json(), Some(json!({ "n": 1 })));
        assert_eq!(Value::Function(f).to_json(), None);
    }

    #[test]
    fn test_function_identity() {
        let a = Function::new("a", |_| Ok(Value::Null));
        let b = Function::new("a", |_| Ok(Value::Null));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.call(&[]).unwrap(), Value::Null);
    }

    #[test]
    fn test_element_to_json() {
        let element = Element::intrinsic("board")
            .with_prop("width", "10mm")
            .with_key("main")
            .with_child(Element::intrinsic("resistor").with_prop("name", "R1"));
        let json = element.to_json();
        assert_eq!(json["type"], "board");
        assert_eq!(json["props"]["width"], "10mm");
        assert_eq!(json["key"], "main");
        assert_eq!(json["children"][0]["props"]["name"], "R1");
    }
}
