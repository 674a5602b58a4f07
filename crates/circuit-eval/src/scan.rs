// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Static import/export scanning
//!
//! Module sources are scanned for the specifiers they depend on before they
//! are compiled. Comments and string contents are masked out first so that an
//! import statement written inside a comment or a string literal is never
//! picked up. Masking preserves byte offsets, so a match in the masked text
//! maps straight back onto the original source.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// How a dependency is referenced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import x from 'module'`
    Static,
    /// `import 'module'`
    SideEffect,
    /// `export { x } from 'module'` / `export * from 'module'`
    ReExport,
    /// `require('module')`
    Require,
}

/// A dependency found in a module source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    /// The module specifier (e.g., './foo', 'lodash')
    pub specifier: String,
    /// How the dependency is referenced
    pub kind: ImportKind,
    /// Whether every reference to this specifier is type-only
    pub type_only: bool,
    /// Byte offset of the first reference
    pub offset: usize,
}

/// Result of scanning a module source
#[derive(Debug, Clone, Default)]
pub struct ModuleSyntax {
    /// Dependencies in source order, one entry per specifier
    pub imports: Vec<ImportDeclaration>,
    /// Names exported only as types
    pub type_exports: BTreeSet<String>,
    /// Whether the source uses `export` statements at all
    pub has_module_syntax: bool,
}

impl ModuleSyntax {
    /// Dependencies that exist at runtime
    pub fn runtime_imports(&self) -> impl Iterator<Item = &ImportDeclaration> {
        self.imports.iter().filter(|import| !import.type_only)
    }
}

const IDENT_BOUNDARY: &str = r"(?:^|[^.\w$])";

static IMPORT_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"{IDENT_BOUNDARY}import\s+(type\s+)?([^'";]*?)\s*\bfrom\s*(['"])([^'"\n]*)['"]"#
    ))
    .expect("valid import regex")
});

static IMPORT_SIDE_EFFECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"{IDENT_BOUNDARY}import\s*(['"])([^'"\n]*)['"]"#))
        .expect("valid side-effect import regex")
});

static REEXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"{IDENT_BOUNDARY}export\s+(type\s+)?(\*(?:\s+as\s+[\w$]+)?|\{{[^}}]*\}})\s*from\s*(['"])([^'"\n]*)['"]"#
    ))
    .expect("valid re-export regex")
});

static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"{IDENT_BOUNDARY}require\s*\(\s*(['"])([^'"\n]*)['"]\s*\)"#
    ))
    .expect("valid require regex")
});

static EXPORT_TYPE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{IDENT_BOUNDARY}export\s+(?:declare\s+)?(?:type|interface)\s+([\w$]+)"
    ))
    .expect("valid type export regex")
});

static EXPORT_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{IDENT_BOUNDARY}export\s+(type\s+)?\{{([^}}]*)\}}"))
        .expect("valid export list regex")
});

static EXPORT_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{IDENT_BOUNDARY}export\s"))
        .expect("valid export keyword regex")
});

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*[}\]]").expect("valid trailing comma regex"));

/// Scan a module source for its dependencies and type-only exports
pub fn scan_module(source: &str) -> ModuleSyntax {
    let masked = mask_source(source, Mask::CommentsAndStrings);
    let mut found: Vec<ImportDeclaration> = Vec::new();

    for cap in IMPORT_FROM_RE.captures_iter(&masked) {
        let (Some(spec), Some(bindings)) = (cap.get(4), cap.get(2)) else {
            continue;
        };
        let type_only = cap.get(1).is_some() || bindings_are_type_only(bindings.as_str());
        found.push(ImportDeclaration {
            specifier: source[spec.range()].to_string(),
            kind: ImportKind::Static,
            type_only,
            offset: spec.start(),
        });
    }

    for cap in IMPORT_SIDE_EFFECT_RE.captures_iter(&masked) {
        if let Some(spec) = cap.get(2) {
            found.push(ImportDeclaration {
                specifier: source[spec.range()].to_string(),
                kind: ImportKind::SideEffect,
                type_only: false,
                offset: spec.start(),
            });
        }
    }

    for cap in REEXPORT_RE.captures_iter(&masked) {
        let (Some(spec), Some(clause)) = (cap.get(4), cap.get(2)) else {
            continue;
        };
        let type_only = cap.get(1).is_some() || bindings_are_type_only(clause.as_str());
        found.push(ImportDeclaration {
            specifier: source[spec.range()].to_string(),
            kind: ImportKind::ReExport,
            type_only,
            offset: spec.start(),
        });
    }

    for cap in REQUIRE_RE.captures_iter(&masked) {
        if let Some(spec) = cap.get(2) {
            found.push(ImportDeclaration {
                specifier: source[spec.range()].to_string(),
                kind: ImportKind::Require,
                type_only: false,
                offset: spec.start(),
            });
        }
    }

    found.sort_by_key(|import| import.offset);

    // One entry per specifier; a single value reference makes the edge a runtime edge
    let mut imports: Vec<ImportDeclaration> = Vec::new();
    for import in found {
        if import.specifier.is_empty() {
            continue;
        }
        match imports.iter_mut().find(|i| i.specifier == import.specifier) {
            Some(existing) => existing.type_only &= import.type_only,
            None => imports.push(import),
        }
    }

    ModuleSyntax {
        imports,
        type_exports: scan_type_exports(&masked),
        has_module_syntax: EXPORT_KEYWORD_RE.is_match(&masked),
    }
}

/// Names a module exports only as types
fn scan_type_exports(masked: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();

    for cap in EXPORT_TYPE_DECL_RE.captures_iter(masked) {
        if let Some(name) = cap.get(1) {
            names.insert(name.as_str().to_string());
        }
    }

    for cap in EXPORT_LIST_RE.captures_iter(masked) {
        let whole_list_is_type = cap.get(1).is_some();
        let Some(list) = cap.get(2) else { continue };
        for part in list.as_str().split(',') {
            let part = part.trim();
            let (is_type, part) = match part.strip_prefix("type ") {
                Some(rest) => (true, rest.trim()),
                None => (whole_list_is_type, part),
            };
            if !is_type || part.is_empty() {
                continue;
            }
            let exported = match part.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => part,
            };
            names.insert(exported.to_string());
        }
    }

    names
}

/// Whether an import clause only brings in types (`{ type A, type B }`)
fn bindings_are_type_only(bindings: &str) -> bool {
    let bindings = bindings.trim();
    let Some(inner) = bindings
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return false;
    };
    let parts: Vec<&str> = inner
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    !parts.is_empty() && parts.iter().all(|part| part.starts_with("type "))
}

/// Strip comments and trailing commas from JSON-with-comments text
pub fn strip_jsonc(source: &str) -> String {
    let without_comments = mask_source(source, Mask::Comments);
    let masked = mask_source(&without_comments, Mask::CommentsAndStrings);
    let mut out = without_comments.into_bytes();
    for m in TRAILING_COMMA_RE.find_iter(&masked) {
        out[m.start()] = b' ';
    }
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mask {
    Comments,
    CommentsAndStrings,
}

/// Replace comment bytes with spaces and, optionally, string contents with a
/// filler byte. Newlines are kept so line numbers survive.
fn mask_source(source: &str, mode: Mask) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mask_strings = mode == Mask::CommentsAndStrings;
    let mut i = 0;
    // Last significant byte outside comments/strings, for regex literal detection
    let mut prev: Option<u8> = None;

    let blank = |out: &mut Vec<u8>, from: usize, to: usize| {
        for b in &mut out[from..to] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    };
    let fill = |out: &mut Vec<u8>, from: usize, to: usize| {
        for b in &mut out[from..to] {
            if *b != b'\n' {
                *b = b'_';
            }
        }
    };

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = bytes[i..]
                    .iter()
                    .position(|c| *c == b'\n')
                    .map_or(bytes.len(), |p| i + p);
                blank(&mut out, i, end);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = find_subslice(&bytes[i + 2..], b"*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                blank(&mut out, i, end);
                i = end;
            }
            b'\'' | b'"' | b'`' => {
                let end = string_end(bytes, i, b);
                // An unclosed backtick is JSX text, not a template
                if b == b'`' && !(end > i + 1 && bytes[end - 1] == b'`') {
                    prev = Some(b);
                    i += 1;
                    continue;
                }
                if mask_strings {
                    // Keep the delimiters, mask the contents
                    let content_end = if end > i + 1 && bytes[end - 1] == b { end - 1 } else { end };
                    fill(&mut out, i + 1, content_end);
                }
                prev = Some(b);
                i = end;
            }
            b'/' if starts_regex(prev) => {
                let end = regex_end(bytes, i);
                if mask_strings {
                    fill(&mut out, i + 1, end.saturating_sub(1).max(i + 1));
                }
                prev = Some(b'/');
                i = end;
            }
            _ => {
                if !b.is_ascii_whitespace() {
                    prev = Some(b);
                }
                i += 1;
            }
        }
    }

    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// End (exclusive) of a string literal starting at `start`
fn string_end(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if quote != b'`' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Whether a `/` after `prev` opens a regex literal rather than a division
fn starts_regex(prev: Option<u8>) -> bool {
    match prev {
        None => true,
        Some(c) => b"(,=:[!&|?{};+-*%<>~^".contains(&c),
    }
}

/// End (exclusive) of a regex literal starting at `start`
fn regex_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
