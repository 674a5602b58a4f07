// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Pure path algebra over forward-slash paths
//!
//! Nothing in here touches a filesystem. Paths in the virtual file table are
//! relative to an implicit root: forward slashes, no leading `./` or `/`.

use crate::error::{EvalError, Result};

/// Normalize a path for use as a file table key.
///
/// Converts backslashes to forward slashes and strips any leading `./` or `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut rest = path.as_str();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }
    rest.to_string()
}

/// Check whether a specifier is written relative to the importing module
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Check whether a specifier is rooted at the project root
pub fn is_absolute(specifier: &str) -> bool {
    specifier.starts_with('/')
}

/// Check whether a string is a remote URL
pub fn is_url(specifier: &str) -> bool {
    specifier.starts_with("http://") || specifier.starts_with("https://")
}

/// Directory part of a normalized path (`""` for files at the root)
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Final path segment
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Extension of the final segment including the dot, lowercased
///
/// `.d.ts` style double extensions report only the last part.
pub fn extension(path: &str) -> Option<String> {
    let name = basename(path);
    let name = name.split(['?', '#']).next().unwrap_or(name);
    name.rfind('.')
        .filter(|idx| *idx > 0)
        .map(|idx| name[idx..].to_ascii_lowercase())
}

/// Join two normalized paths
pub fn join(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}/{}", base.trim_end_matches('/'), rest),
    }
}

/// Resolve `specifier` against `current_dir` using path algebra only.
///
/// Collapses `.` and `..` segments. Walking above the root is an error.
pub fn resolve_relative(current_dir: &str, specifier: &str) -> Result<String> {
    let base = normalize_path(current_dir);
    let joined = if is_absolute(specifier) {
        specifier.to_string()
    } else {
        join(&base, specifier)
    };
    collapse(&joined).ok_or_else(|| EvalError::PathEscapesRoot(joined.clone()))
}

/// Collapse `.` and `..` segments, returning `None` when `..` escapes the root
pub fn collapse(path: &str) -> Option<String> {
    let path = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

/// Every ancestor directory of `dir`, nearest first, ending with the root (`""`)
pub fn ancestors(dir: &str) -> Vec<String> {
    let dir = normalize_path(dir);
    let mut chain = Vec::new();
    let mut current = dir.trim_end_matches('/').to_string();
    while !current.is_empty() {
        chain.push(current.clone());
        current = dirname(&current).to_string();
    }
    chain.push(String::new());
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./src/a.tsx"), "src/a.tsx");
        assert_eq!(normalize_path("/src/a.tsx"), "src/a.tsx");
        assert_eq!(normalize_path("src\\lib\\b.ts"), "src/lib/b.ts");
        assert_eq!(normalize_path(".//a.ts"), "a.ts");
        assert_eq!(normalize_path("a.ts"), "a.ts");
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve_relative("src/lib", "./a").unwrap(), "src/lib/a");
        assert_eq!(resolve_relative("src/lib", "../a.ts").unwrap(), "src/a.ts");
        assert_eq!(resolve_relative("", "./a.ts").unwrap(), "a.ts");
        assert_eq!(resolve_relative("src", "./x/./y/../z.ts").unwrap(), "src/x/z.ts");
        assert_eq!(resolve_relative("src/deep", "/top.ts").unwrap(), "top.ts");
    }

    #[test]
    fn test_resolve_relative_escape() {
        let err = resolve_relative("src", "../../outside.ts").unwrap_err();
        assert!(matches!(err, EvalError::PathEscapesRoot(_)));
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("a/b.TSX").as_deref(), Some(".tsx"));
        assert_eq!(extension("model.glb?raw").as_deref(), Some(".glb"));
        assert_eq!(extension("types.d.ts").as_deref(), Some(".ts"));
        assert_eq!(extension("Makefile"), None);
        assert_eq!(extension(".hidden"), None);
    }

    #[test]
    fn test_ancestors() {
        assert_eq!(
            ancestors("src/components/leds"),
            vec!["src/components/leds", "src/components", "src", ""]
        );
        assert_eq!(ancestors(""), vec![""]);
    }

    #[test]
    fn test_dirname_basename() {
        assert_eq!(dirname("src/a.tsx"), "src");
        assert_eq!(dirname("a.tsx"), "");
        assert_eq!(basename("src/a.tsx"), "a.tsx");
    }
}
