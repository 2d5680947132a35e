//! Decoder implementations
//!
//! Each decoder turns the full content of one file into records.

use super::types::{DecoderFormat, RecordDecoder};
use crate::error::{Error, Result};
use serde_json::{Map, Value};

// ============================================================================
// JSON Decoder
// ============================================================================

/// Decoder for a single JSON document
///
/// A top-level array yields one record per element, any other value yields
/// itself. With a record path (`data.items`, `$.pages.0.rows`) the records
/// are taken from that location instead.
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    /// JSON pointer derived from the dot path
    pointer: Option<String>,
}

impl JsonDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON decoder reading records at `path`
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            pointer: Some(dot_path_to_pointer(&path.into())),
        }
    }
}

impl RecordDecoder for JsonDecoder {
    fn format(&self) -> DecoderFormat {
        DecoderFormat::Json
    }

    fn decode(&self, content: &str) -> Result<Vec<Value>> {
        let document: Value = serde_json::from_str(content)
            .map_err(|e| Error::decode(format!("Invalid JSON document: {e}")))?;

        let target = match &self.pointer {
            Some(pointer) => match document.pointer(pointer) {
                Some(found) => found.clone(),
                None => {
                    return Err(Error::decode(format!(
                        "Record path '{pointer}' not found in document"
                    )))
                }
            },
            None => document,
        };

        Ok(match target {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        })
    }
}

/// `$.data.items` / `data.items` -> `/data/items`
fn dot_path_to_pointer(path: &str) -> String {
    let path = path.trim_start_matches('$').trim_start_matches('.');
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect()
}

// ============================================================================
// JSONL Decoder
// ============================================================================

/// JSON Lines decoder (one JSON value per non-blank line)
#[derive(Debug, Clone, Default)]
pub struct JsonlDecoder;

impl JsonlDecoder {
    /// Create a new JSONL decoder
    pub fn new() -> Self {
        Self
    }
}

impl RecordDecoder for JsonlDecoder {
    fn format(&self) -> DecoderFormat {
        DecoderFormat::Jsonl
    }

    fn decode(&self, content: &str) -> Result<Vec<Value>> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    Error::decode(format!("Invalid JSON on line {}: {e}", index + 1))
                })
            })
            .collect()
    }
}

// ============================================================================
// CSV Decoder
// ============================================================================

/// CSV decoder
///
/// Quoted fields may contain the delimiter, doubled quotes and line breaks.
/// Unquoted values are trimmed and typed: empty and `null` become null, then
/// integers, floats and booleans are recognised, everything else stays a
/// string. Quoted values are kept verbatim as strings.
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    delimiter: char,
    has_header: bool,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
        }
    }
}

impl CsvDecoder {
    /// Comma separated, with a header row
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom delimiter and header handling
    pub fn with_options(delimiter: char, has_header: bool) -> Self {
        Self {
            delimiter,
            has_header,
        }
    }
}

impl RecordDecoder for CsvDecoder {
    fn format(&self) -> DecoderFormat {
        DecoderFormat::Csv
    }

    fn decode(&self, content: &str) -> Result<Vec<Value>> {
        let mut rows = split_rows(content, self.delimiter)?.into_iter();

        let columns: Vec<String> = if self.has_header {
            match rows.next() {
                Some(header) => header.fields.into_iter().map(|f| f.value).collect(),
                None => return Ok(Vec::new()),
            }
        } else {
            match rows.as_slice().first() {
                Some(first) => (0..first.fields.len())
                    .map(|i| format!("column_{i}"))
                    .collect(),
                None => return Ok(Vec::new()),
            }
        };

        rows.map(|row| {
            if row.fields.len() > columns.len() {
                return Err(Error::decode(format!(
                    "CSV line {} has {} fields, expected at most {}",
                    row.line,
                    row.fields.len(),
                    columns.len()
                )));
            }
            let mut record = Map::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                let value = match row.fields.get(i) {
                    Some(field) if field.quoted => Value::String(field.value.clone()),
                    Some(field) => typed_value(&field.value),
                    None => Value::Null,
                };
                record.insert(column.clone(), value);
            }
            Ok(Value::Object(record))
        })
        .collect()
    }
}

#[derive(Debug)]
struct CsvRow {
    /// 1-based line the row starts on
    line: usize,
    fields: Vec<CsvField>,
}

#[derive(Debug)]
struct CsvField {
    value: String,
    quoted: bool,
}

/// Characters of the field being read
#[derive(Debug, Default)]
struct FieldBuffer {
    text: String,
    /// Length of `text` when the closing quote was read
    quoted_len: Option<usize>,
}

impl FieldBuffer {
    fn is_blank(&self) -> bool {
        self.quoted_len.is_none() && self.text.trim().is_empty()
    }

    fn take(&mut self) -> CsvField {
        let FieldBuffer { mut text, quoted_len } = std::mem::take(self);
        match quoted_len {
            Some(len) => {
                // whitespace between the closing quote and the delimiter is padding
                let trailing = text.split_off(len);
                text.push_str(trailing.trim());
                CsvField {
                    value: text,
                    quoted: true,
                }
            }
            None => CsvField {
                value: text.trim().to_string(),
                quoted: false,
            },
        }
    }
}

/// Split content into rows of fields, skipping blank lines
fn split_rows(content: &str, delimiter: char) -> Result<Vec<CsvRow>> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = FieldBuffer::default();
    let mut quoted = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = content.chars().peekable();

    let mut finish_row = |fields: &mut Vec<CsvField>, field: &mut FieldBuffer, start: usize| {
        if fields.is_empty() && field.is_blank() {
            *field = FieldBuffer::default();
            return;
        }
        fields.push(field.take());
        rows.push(CsvRow {
            line: start,
            fields: std::mem::take(fields),
        });
    };

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    field.text.push('"');
                    chars.next();
                } else {
                    quoted = false;
                    field.quoted_len = Some(field.text.len());
                }
            }
            '"' if field.is_blank() => {
                field.text.clear();
                quoted = true;
            }
            '\n' if !quoted => {
                finish_row(&mut fields, &mut field, row_start);
                line += 1;
                row_start = line;
            }
            '\r' if !quoted && chars.peek() == Some(&'\n') => {}
            c if c == delimiter && !quoted => {
                fields.push(field.take());
            }
            c => {
                if c == '\n' {
                    line += 1;
                }
                field.text.push(c);
            }
        }
    }

    if quoted {
        return Err(Error::decode(format!(
            "Unterminated quoted field starting on line {row_start}"
        )));
    }
    finish_row(&mut fields, &mut field, row_start);
    Ok(rows)
}

fn typed_value(raw: &str) -> Value {
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Some(n) = raw
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(n);
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(raw.to_string())
}
