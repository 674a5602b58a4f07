// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Structural serialization of component-tree values
//!
//! Elements cross the worker boundary as JSON text. Function values cannot be
//! serialized; they are moved into a transfer table and referenced from the
//! JSON by index, then rebound on the far side.

use crate::error::{Result, WorkerError};
use circuit_eval::{Element, ElementType, Function, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index into a [`Transfer`]'s function table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef(pub u32);

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum WireValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<WireValue>),
    Object(BTreeMap<String, WireValue>),
    Function(RemoteRef),
    Element(Box<WireElement>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum WireType {
    Intrinsic(String),
    Component(RemoteRef),
}

#[derive(Debug, Serialize, Deserialize)]
struct WireElement {
    #[serde(rename = "type")]
    element_type: WireType,
    props: BTreeMap<String, WireValue>,
    key: Option<String>,
    children: Vec<WireValue>,
}

/// A marshaled element: JSON payload plus the functions it references
#[derive(Debug, Clone)]
pub struct Transfer {
    payload: String,
    functions: Vec<Function>,
}

impl Transfer {
    /// The structural JSON form
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Number of functions moved alongside the payload
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

/// Serialize an element for the trip into the worker
pub fn marshal_element(element: &Element) -> Result<Transfer> {
    let mut functions = Vec::new();
    let wire = to_wire_element(element, &mut functions)?;
    let payload = serde_json::to_string(&wire).map_err(|e| WorkerError::Marshal(e.to_string()))?;
    Ok(Transfer { payload, functions })
}

/// Rebuild a live element from a transfer
pub fn unmarshal_element(transfer: Transfer) -> Result<Element> {
    let wire: WireElement =
        serde_json::from_str(&transfer.payload).map_err(|e| WorkerError::Marshal(e.to_string()))?;
    from_wire_element(wire, &transfer.functions)
}

fn share(function: &Function, functions: &mut Vec<Function>) -> Result<RemoteRef> {
    let index = u32::try_from(functions.len())
        .map_err(|_| WorkerError::Marshal("too many function references".to_string()))?;
    functions.push(function.clone());
    Ok(RemoteRef(index))
}

fn to_wire_element(element: &Element, functions: &mut Vec<Function>) -> Result<WireElement> {
    let element_type = match &element.element_type {
        ElementType::Intrinsic(name) => WireType::Intrinsic(name.clone()),
        ElementType::Component(component) => WireType::Component(share(component, functions)?),
    };
    let props = element
        .props
        .iter()
        .map(|(name, value)| Ok((name.clone(), to_wire(value, functions)?)))
        .collect::<Result<_>>()?;
    let children = element
        .children
        .iter()
        .map(|child| to_wire(child, functions))
        .collect::<Result<_>>()?;
    Ok(WireElement {
        element_type,
        props,
        key: element.key.clone(),
        children,
    })
}

fn to_wire(value: &Value, functions: &mut Vec<Function>) -> Result<WireValue> {
    Ok(match value {
        Value::Undefined => WireValue::Undefined,
        Value::Null => WireValue::Null,
        Value::Bool(b) => WireValue::Bool(*b),
        Value::Number(n) if n.is_finite() => WireValue::Number(*n),
        Value::Number(n) => {
            return Err(WorkerError::Marshal(format!("non-finite number {}", n)));
        }
        Value::String(s) => WireValue::String(s.clone()),
        Value::Array(items) => WireValue::Array(
            items
                .iter()
                .map(|item| to_wire(item, functions))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => WireValue::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), to_wire(v, functions)?)))
                .collect::<Result<_>>()?,
        ),
        Value::Function(f) => WireValue::Function(share(f, functions)?),
        Value::Element(element) => WireValue::Element(Box::new(to_wire_element(element, functions)?)),
    })
}

fn rebind(reference: RemoteRef, functions: &[Function]) -> Result<Function> {
    functions
        .get(reference.0 as usize)
        .cloned()
        .ok_or_else(|| WorkerError::Marshal(format!("dangling function reference {}", reference.0)))
}

fn from_wire_element(wire: WireElement, functions: &[Function]) -> Result<Element> {
    let mut element = match wire.element_type {
        WireType::Intrinsic(name) => Element::intrinsic(name),
        WireType::Component(reference) => Element::component(rebind(reference, functions)?),
    };
    for (name, value) in wire.props {
        element.props.insert(name, from_wire(value, functions)?);
    }
    for child in wire.children {
        element.children.push(from_wire(child, functions)?);
    }
    element.key = wire.key;
    Ok(element)
}

fn from_wire(wire: WireValue, functions: &[Function]) -> Result<Value> {
    Ok(match wire {
        WireValue::Undefined => Value::Undefined,
        WireValue::Null => Value::Null,
        WireValue::Bool(b) => Value::Bool(b),
        WireValue::Number(n) => Value::Number(n),
        WireValue::String(s) => Value::String(s),
        WireValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| from_wire(item, functions))
                .collect::<Result<_>>()?,
        ),
        WireValue::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| Ok((k, from_wire(v, functions)?)))
                .collect::<Result<_>>()?,
        ),
        WireValue::Function(reference) => Value::Function(rebind(reference, functions)?),
        WireValue::Element(element) => Value::Element(Box::new(from_wire_element(*element, functions)?)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_functions_travel_by_reference() {
        let led = Function::new("Led", |_| Ok(Value::Null));
        let on_click = Function::new("onClick", |_| Ok(Value::Bool(true)));
        let element = Element::intrinsic("board")
            .with_prop("width", 10.0)
            .with_key("main")
            .with_child(Element::component(led.clone()).with_prop("onClick", on_click.clone()));

        let transfer = marshal_element(&element).unwrap();
        assert_eq!(transfer.function_count(), 2);
        assert!(transfer.payload().contains("\"type\":{\"intrinsic\":\"board\"}"));

        let rebuilt = unmarshal_element(transfer).unwrap();
        assert_eq!(rebuilt, element);
        let child = rebuilt.children[0].as_element().unwrap();
        assert!(matches!(&child.element_type, ElementType::Component(f) if *f == led));
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        let element = Element::intrinsic("resistor").with_prop("resistance", f64::NAN);
        assert!(matches!(marshal_element(&element), Err(WorkerError::Marshal(_))));
    }

    #[test]
    fn test_dangling_reference() {
        let transfer = Transfer {
            payload: r#"{"type":{"component":3},"props":{},"key":null,"children":[]}"#.to_string(),
            functions: Vec::new(),
        };
        let err = unmarshal_element(transfer).unwrap_err();
        assert_eq!(err.to_string(), "Cannot marshal value: dangling function reference 3");
    }
}
