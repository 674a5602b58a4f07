// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Entry-point preparation and synthesis

use crate::compiler::{CompiledModule, ModuleContext};
use crate::error::{EvalError, ExecutionError, Result};
use crate::evaluator::ExecutionContext;
use crate::exports::ModuleExports;
use crate::path::normalize_path;
use crate::resolver::SpecifierResolver;
use crate::value::{Element, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Path inline entry source is written to
pub const INLINE_ENTRY_PATH: &str = "index.tsx";

/// Path of the synthesized entry module
pub const SYNTHETIC_ENTRY_PATH: &str = "__circuit_entry__.tsx";

/// What to run for a file-table execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySpec {
    /// Entry module to evaluate as-is
    pub entrypoint: Option<String>,
    /// Module whose component is rendered by a synthesized entry
    pub main_component_path: Option<String>,
    /// Export to render, instead of the default
    pub name: Option<String>,
    /// Props spread onto the rendered component
    pub props: Option<serde_json::Value>,
}

impl EntrySpec {
    /// Evaluate `path` directly
    pub fn entrypoint(path: impl Into<String>) -> Self {
        Self {
            entrypoint: Some(path.into()),
            ..Self::default()
        }
    }

    /// Render the component exported by `path`
    pub fn main_component(path: impl Into<String>) -> Self {
        Self {
            main_component_path: Some(path.into()),
            ..Self::default()
        }
    }
}

/// Check for hook-like names: `use` followed by an uppercase letter
pub fn is_hook_name(name: &str) -> bool {
    name.strip_prefix("use")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

/// Write inline source to the file table, returning its entry specifier
pub fn prepare_inline_entry(ctx: &mut ExecutionContext, source: &str) -> String {
    ctx.add_synthetic_module(INLINE_ENTRY_PATH, source.to_string(), None);
    format!("./{}", INLINE_ENTRY_PATH)
}

/// Decide the entry module for `spec`, synthesizing one when only a main
/// component path is given. Returns the entry specifier.
///
/// An explicit entrypoint is probed like an import, so `index` finds
/// `index.tsx`.
pub fn prepare_entry(ctx: &mut ExecutionContext, spec: &EntrySpec) -> Result<String> {
    if let Some(entrypoint) = &spec.entrypoint {
        let path = normalize_path(entrypoint);
        let found = SpecifierResolver::new(ctx.files(), None, "").probe(&path);
        return match found {
            Some(id) => Ok(format!("./{}", id)),
            None => Err(EvalError::EntryPoint(format!(
                "entrypoint '{}' is not in the file table",
                path
            ))),
        };
    }

    let Some(main) = &spec.main_component_path else {
        return Err(EvalError::EntryPoint(
            "either an entrypoint or a main component path is required".to_string(),
        ));
    };

    let target = format!("./{}", normalize_path(main));
    // Written verbatim into an import statement
    if target.contains(['"', '\'', '\n']) {
        return Err(EvalError::EntryPoint(format!(
            "main component path {:?} cannot contain quotes or line breaks",
            main
        )));
    }
    let props = match spec.props.as_ref().map(Value::from_json) {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(EvalError::EntryPoint(format!(
                "props must be an object, got {}",
                other.type_name()
            )));
        }
    };

    let source = format!(
        "import * as Component from \"{}\"\n// renders {}\n",
        target,
        spec.name.as_deref().unwrap_or("the default export")
    );
    debug!("Synthesizing entry for {}", target);
    let module = SyntheticEntry {
        target,
        name: spec.name.clone(),
        props,
    };
    ctx.add_synthetic_module(SYNTHETIC_ENTRY_PATH, source, Some(Arc::new(module)));
    Ok(format!("./{}", SYNTHETIC_ENTRY_PATH))
}

/// Pick the component to render from `exports`.
///
/// A requested name wins. Otherwise the default export, then the first
/// named function export that does not look like a hook.
pub fn select_component(exports: &ModuleExports, name: Option<&str>) -> std::result::Result<Value, ExecutionError> {
    if let Some(name) = name {
        return Ok(exports.get(name)?);
    }

    let default = exports.default_value();
    if matches!(default, Value::Function(_) | Value::Element(_)) {
        return Ok(default);
    }

    exports
        .names()
        .into_iter()
        .filter(|name| *name != "default" && !is_hook_name(name))
        .find_map(|name| match exports.get(name) {
            Ok(value @ Value::Function(_)) => Some(value),
            _ => None,
        })
        .ok_or_else(|| {
            ExecutionError::new(format!(
                "no component export found in '{}'",
                exports.module_id()
            ))
        })
}

struct SyntheticEntry {
    target: String,
    name: Option<String>,
    props: BTreeMap<String, Value>,
}

impl CompiledModule for SyntheticEntry {
    fn run(&self, ctx: &mut ModuleContext<'_>) -> std::result::Result<(), ExecutionError> {
        let exports = ctx.require(&self.target)?;
        let mut element = match select_component(&exports, self.name.as_deref())? {
            Value::Function(component) => Element::component(component),
            Value::Element(element) => *element,
            other => {
                return Err(ExecutionError::new(format!(
                    "export of '{}' is {}, not a component",
                    exports.module_id(),
                    other.type_name()
                )));
            }
        };
        element.props.extend(self.props.clone());
        ctx.engine.add(element)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Function;

    fn component(name: &str) -> Value {
        Value::Function(Function::new(name, |_| Ok(Value::Null)))
    }

    #[test]
    fn test_is_hook_name() {
        assert!(is_hook_name("useBoard"));
        assert!(!is_hook_name("user"));
        assert!(!is_hook_name("use"));
        assert!(!is_hook_name("Board"));
    }

    #[test]
    fn test_select_default_then_named() {
        let mut exports = ModuleExports::new("board.tsx");
        exports.set_es_module(true);
        exports.set("useLayout", component("useLayout"));
        exports.set("MyBoard", component("MyBoard"));
        exports.set("WIDTH", Value::Number(10.0));
        let picked = select_component(&exports, None).unwrap();
        assert_eq!(picked.as_function().map(Function::name), Some("MyBoard"));

        exports.set("default", component("Main"));
        let picked = select_component(&exports, None).unwrap();
        assert_eq!(picked.as_function().map(Function::name), Some("Main"));

        let picked = select_component(&exports, Some("MyBoard")).unwrap();
        assert_eq!(picked.as_function().map(Function::name), Some("MyBoard"));
    }

    fn run(files: &[(&str, &str)]) -> ExecutionContext {
        ExecutionContext::new(
            crate::vfs::VirtualFileTable::from_map(files.iter().map(|(k, v)| (k.to_string(), v.to_string()))),
            Box::new(crate::engine::TreeEngine::new()),
            &crate::config::LoaderConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_entrypoint_is_probed() {
        let mut ctx = run(&[("index.tsx", ""), ("lib/index.ts", "")]);
        assert_eq!(prepare_entry(&mut ctx, &EntrySpec::entrypoint("index")).unwrap(), "./index.tsx");
        assert_eq!(prepare_entry(&mut ctx, &EntrySpec::entrypoint("./index.tsx")).unwrap(), "./index.tsx");
        assert_eq!(prepare_entry(&mut ctx, &EntrySpec::entrypoint("lib")).unwrap(), "./lib/index.ts");

        let err = prepare_entry(&mut ctx, &EntrySpec::entrypoint("main")).unwrap_err();
        assert!(matches!(err, EvalError::EntryPoint(_)));
    }

    #[test]
    fn test_synthetic_import_matches_target() {
        let mut ctx = run(&[("boards/my board.tsx", "")]);
        prepare_entry(&mut ctx, &EntrySpec::main_component("boards/my board.tsx")).unwrap();
        let source = ctx.files().get(SYNTHETIC_ENTRY_PATH).unwrap();
        let syntax = crate::scan::scan_module(source);
        let imports: Vec<_> = syntax.runtime_imports().map(|i| i.specifier.as_str()).collect();
        assert_eq!(imports, ["./boards/my board.tsx"]);

        let err = prepare_entry(&mut ctx, &EntrySpec::main_component("say\"hi\".tsx")).unwrap_err();
        assert!(err.to_string().contains("cannot contain quotes"));
    }

    #[test]
    fn test_select_reports_missing() {
        let mut exports = ModuleExports::new("lib.ts");
        exports.set_es_module(true);
        exports.set("useThing", component("useThing"));
        assert!(select_component(&exports, None).is_err());

        let err = select_component(&exports, Some("Board")).unwrap_err();
        assert_eq!(err.message, "'Board' is not exported from 'lib.ts'");
    }
}
