// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Minimal source map (v3) reader
//!
//! Only what error enrichment needs: decode the `mappings` field and map a
//! generated position back to an original source line.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    sources_content: Vec<Option<String>>,
    mappings: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    generated_column: u32,
    source: u32,
    original_line: u32,
    original_column: u32,
}

/// A position in original source, 1-based line and column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
    /// Original source path
    pub source: String,
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
    /// Text of the original line, when the map embeds source content
    pub source_line: Option<String>,
}

/// A decoded source map
#[derive(Debug, Clone)]
pub struct SourceMap {
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    lines: Vec<Vec<Segment>>,
}

impl SourceMap {
    /// Parse source map JSON
    pub fn parse(json: &str) -> Result<Self, String> {
        let raw: RawSourceMap = serde_json::from_str(json).map_err(|e| e.to_string())?;
        let lines = decode_mappings(&raw.mappings)?;
        Ok(Self {
            sources: raw.sources,
            sources_content: raw.sources_content,
            lines,
        })
    }

    /// Map a generated position (1-based line and column) to the original
    pub fn lookup(&self, line: u32, column: u32) -> Option<OriginalPosition> {
        let segments = self.lines.get(line.checked_sub(1)? as usize)?;
        let column = column.saturating_sub(1);
        let segment = segments
            .iter()
            .take_while(|s| s.generated_column <= column)
            .last()
            .or_else(|| segments.first())?;

        let source = self.sources.get(segment.source as usize)?.clone();
        let source_line = self
            .sources_content
            .get(segment.source as usize)
            .and_then(Option::as_deref)
            .and_then(|text| text.lines().nth(segment.original_line as usize))
            .map(str::to_string);

        Some(OriginalPosition {
            source,
            line: segment.original_line + 1,
            column: segment.original_column + 1,
            source_line,
        })
    }
}

fn decode_mappings(mappings: &str) -> Result<Vec<Vec<Segment>>, String> {
    let mut lines = Vec::new();
    // Source index, original line and original column carry across lines
    let mut source = 0i64;
    let mut original_line = 0i64;
    let mut original_column = 0i64;

    for line in mappings.split(';') {
        let mut generated_column = 0i64;
        let mut segments = Vec::new();
        for raw in line.split(',').filter(|s| !s.is_empty()) {
            let fields = decode_vlq(raw)?;
            generated_column += fields[0];
            if fields.len() >= 4 {
                source += fields[1];
                original_line += fields[2];
                original_column += fields[3];
                segments.push(Segment {
                    generated_column: to_u32(generated_column)?,
                    source: to_u32(source)?,
                    original_line: to_u32(original_line)?,
                    original_column: to_u32(original_column)?,
                });
            }
        }
        lines.push(segments);
    }
    Ok(lines)
}

fn to_u32(value: i64) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("mapping value out of range: {}", value))
}

/// Decode one base64 VLQ segment into its fields
fn decode_vlq(segment: &str) -> Result<Vec<i64>, String> {
    let mut values = Vec::new();
    let mut value = 0i64;
    let mut shift = 0u32;

    for byte in segment.bytes() {
        let digit = base64_digit(byte).ok_or_else(|| format!("invalid VLQ character '{}'", byte as char))?;
        value += i64::from(digit & 0b11111) << shift;
        if digit & 0b100000 != 0 {
            shift += 5;
            if shift > 60 {
                return Err("VLQ value too large".to_string());
            }
            continue;
        }
        let negative = value & 1 == 1;
        value >>= 1;
        values.push(if negative { -value } else { value });
        value = 0;
        shift = 0;
    }

    if shift != 0 {
        return Err("truncated VLQ segment".to_string());
    }
    if values.is_empty() {
        return Err("empty VLQ segment".to_string());
    }
    Ok(values)
}

fn base64_digit(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}
