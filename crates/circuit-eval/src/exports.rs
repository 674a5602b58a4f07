// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module exports with validated attribute access

use crate::error::ExportAccessError;
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};

/// The exports a module produced.
///
/// Reads go through [`ModuleExports::get`], which reports whether a missing
/// name was declared as a type-only export or does not exist at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleExports {
    module_id: String,
    values: BTreeMap<String, Value>,
    replaced: Option<Value>,
    es_module: bool,
    type_only: BTreeSet<String>,
}

impl ModuleExports {
    /// Create an empty exports object for `module_id`
    pub fn new(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            ..Self::default()
        }
    }

    /// Exports consisting of a single `default` binding
    pub fn with_default(module_id: impl Into<String>, value: Value) -> Self {
        let mut exports = Self::new(module_id);
        exports.es_module = true;
        exports.set("default", value);
        exports
    }

    /// Module id these exports belong to
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// Set a named export
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Replace the whole exports value (`module.exports = value`)
    pub fn replace(&mut self, value: Value) {
        self.replaced = Some(value);
    }

    /// Flag these exports as module-shaped (`__esModule`)
    pub fn set_es_module(&mut self, es_module: bool) {
        self.es_module = es_module;
    }

    /// Whether these exports are module-shaped
    pub fn is_es_module(&self) -> bool {
        self.es_module
    }

    /// Record names declared as type-only exports
    pub fn set_type_exports(&mut self, names: BTreeSet<String>) {
        self.type_only = names;
    }

    /// Check whether a value export exists
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name) || self.replaced_field(name).is_some()
    }

    /// Names of every value export, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        if let Some(Value::Object(map)) = &self.replaced {
            names.extend(map.keys().map(String::as_str));
        }
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Read an export
    pub fn get(&self, name: &str) -> Result<Value, ExportAccessError> {
        if name == "default" {
            return Ok(self.default_value());
        }
        if name == "__esModule" {
            return Ok(Value::Bool(self.es_module));
        }
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.replaced_field(name) {
            return Ok(value.clone());
        }
        if self.type_only.contains(name) {
            return Err(ExportAccessError::TypeOnlyExport {
                module: self.module_id.clone(),
                name: name.to_string(),
            });
        }
        Err(ExportAccessError::MissingExport {
            module: self.module_id.clone(),
            name: name.to_string(),
        })
    }

    /// The `default` binding.
    ///
    /// An explicit default wins. Otherwise a replaced exports value is the
    /// default, module-shaped exports have none, and plain exports objects
    /// are their own default.
    pub fn default_value(&self) -> Value {
        if let Some(value) = self.values.get("default") {
            return value.clone();
        }
        match &self.replaced {
            Some(Value::Object(map)) => map
                .get("default")
                .cloned()
                .unwrap_or_else(|| Value::Object(map.clone())),
            Some(value) => value.clone(),
            None if self.es_module => Value::Undefined,
            None => self.to_value(),
        }
    }

    /// Namespace object holding every value export
    pub fn to_value(&self) -> Value {
        if let Some(replaced) = &self.replaced {
            return replaced.clone();
        }
        Value::Object(self.values.clone())
    }

    fn replaced_field(&self, name: &str) -> Option<&Value> {
        match &self.replaced {
            Some(Value::Object(map)) => map.get(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Function;

    #[test]
    fn test_named_access() {
        let mut exports = ModuleExports::new("lib.ts");
        exports.set("Led", Value::from("led"));
        assert_eq!(exports.get("Led").unwrap(), Value::from("led"));
        assert!(exports.has("Led"));
    }

    #[test]
    fn test_type_only_vs_missing() {
        let mut exports = ModuleExports::new("lib.ts");
        exports.set_type_exports(["LedProps".to_string()].into_iter().collect());

        assert!(matches!(
            exports.get("LedProps"),
            Err(ExportAccessError::TypeOnlyExport { .. })
        ));
        assert!(matches!(
            exports.get("Nothing"),
            Err(ExportAccessError::MissingExport { .. })
        ));
    }

    #[test]
    fn test_default_fallbacks() {
        // Explicit default
        let exports = ModuleExports::with_default("a.json", Value::Number(1.0));
        assert_eq!(exports.get("default").unwrap(), Value::Number(1.0));

        // Module-shaped without default
        let mut exports = ModuleExports::new("b.ts");
        exports.set_es_module(true);
        exports.set("x", Value::Null);
        assert!(exports.get("default").unwrap().is_undefined());

        // Plain exports object is its own default
        let mut exports = ModuleExports::new("c.js");
        exports.set("x", Value::Null);
        let default = exports.get("default").unwrap();
        assert_eq!(default.as_object().map(|m| m.len()), Some(1));

        // Replaced exports that are a function
        let f = Function::new("factory", |_| Ok(Value::Null));
        let mut exports = ModuleExports::new("d.js");
        exports.replace(Value::Function(f.clone()));
        assert_eq!(exports.get("default").unwrap(), Value::Function(f));
    }

    #[test]
    fn test_replaced_object_fields() {
        let mut map = BTreeMap::new();
        map.insert("helper".to_string(), Value::from(true));
        let mut exports = ModuleExports::new("cjs.js");
        exports.replace(Value::Object(map));
        assert_eq!(exports.get("helper").unwrap(), Value::Bool(true));
        assert_eq!(exports.names(), vec!["helper"]);
    }
}
