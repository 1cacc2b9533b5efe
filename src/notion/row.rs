//! Row-property decoding for Notion collection rows.
//!
//! The API returns each cell as nested arrays with no explicit type tag:
//! a list of segments, each segment a list whose first element is the text
//! content and whose optional second element is a list of annotations
//! (`[kind, payload]` pairs). The cell's semantic type has to be inferred
//! from the shape, so decoding classifies each cell into a [`CellShape`]
//! first and the precedence lives in exactly one place:
//!
//! 1. no segments, or an empty first segment → the cell is empty
//! 2. a single-element first segment → plain text (annotations never apply)
//! 3. otherwise the first annotation's kind decides: `d` is a date, `a` is
//!    a link; anything else passes the raw structure through untouched
//!
//! Only the first annotation of the first segment is ever inspected; that
//! matches the wire format as observed, not a simplification we chose.

use crate::notion::client::CollectionSnapshot;
use crate::notion::schema::ColumnSchema;
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;

/// Fixed output name for URLs extracted from link annotations.
pub const URL_COLUMN: &str = "URL";

/// Errors from decoding a row's property map.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A row property references a column key the collection schema does not
    /// define. Schema and row data disagreeing is an integrity error, not
    /// something to paper over.
    #[error("row references unknown column key `{0}`")]
    UnknownColumn(String),
}

/// A decoded cell value.
///
/// `Raw` is the deliberate degradation path for annotation kinds this
/// decoder does not model: the caller gets the untouched wire structure
/// instead of a scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Raw(Value),
}

impl CellValue {
    /// Renders the value as text. `Raw` values serialize to their JSON form.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Text(s) => Cow::Borrowed(s),
            CellValue::Raw(v) => Cow::Owned(v.to_string()),
        }
    }
}

/// One decoded row: readable column name → decoded value, in insertion
/// order. Rows have a handful of columns at most, so lookups are linear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedRow {
    entries: Vec<(String, CellValue)>,
}

impl DecodedRow {
    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Inserts a value, replacing any existing entry with the same name in
    /// place (a later link annotation overwrites an earlier `URL`).
    fn insert(&mut self, name: String, value: CellValue) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }
}

/// Structural classification of one raw cell, evaluated in fixed priority
/// order by [`classify`].
#[derive(Debug)]
enum CellShape<'a> {
    /// No segments, or the first segment is empty.
    Empty,
    /// Single-element first segment: the text, nothing else.
    PlainText(&'a str),
    /// First segment carries annotations; only the first one counts.
    Annotated {
        text: &'a str,
        kind: &'a str,
        payload: Option<&'a Value>,
    },
    /// Structure we do not model; passed through raw.
    Opaque,
}

fn classify(cell: &Value) -> CellShape<'_> {
    let Some(segments) = cell.as_array() else {
        return CellShape::Opaque;
    };
    let Some(first) = segments.first() else {
        return CellShape::Empty;
    };
    let Some(first) = first.as_array() else {
        return CellShape::Opaque;
    };
    if first.is_empty() {
        return CellShape::Empty;
    }

    // A single-element segment is plain text, full stop. This takes priority
    // over annotation inspection.
    if first.len() == 1 {
        return match first[0].as_str() {
            Some(text) => CellShape::PlainText(text),
            None => CellShape::Opaque,
        };
    }

    let text = first[0].as_str().unwrap_or_default();
    let annotation = first[1].as_array().and_then(|anns| anns.first());
    match annotation.and_then(Value::as_array) {
        // Kind-only annotations exist on the wire (e.g. `[["b"]]` for bold),
        // so the payload is optional here.
        Some(pair) if !pair.is_empty() => match pair[0].as_str() {
            Some(kind) => CellShape::Annotated {
                text,
                kind,
                payload: pair.get(1),
            },
            None => CellShape::Opaque,
        },
        _ => CellShape::Opaque,
    }
}

/// A decoded cell plus the URL captured from a link annotation, if any.
struct DecodedCell {
    value: CellValue,
    link: Option<String>,
}

fn decode_cell(cell: &Value) -> Option<DecodedCell> {
    let raw_fallback = || DecodedCell {
        value: CellValue::Raw(cell.clone()),
        link: None,
    };

    match classify(cell) {
        CellShape::Empty => None,
        CellShape::PlainText(text) => Some(DecodedCell {
            value: CellValue::Text(text.to_string()),
            link: None,
        }),
        CellShape::Annotated {
            kind: "d", payload, ..
        } => Some(match payload.and_then(decode_date_payload) {
            Some(date) => DecodedCell {
                value: CellValue::Text(date),
                link: None,
            },
            // Date annotation without a usable start_date: degrade to raw
            // rather than abort the run.
            None => raw_fallback(),
        }),
        CellShape::Annotated {
            text,
            kind: "a",
            payload,
        } => Some(match payload.and_then(Value::as_str) {
            Some(url) => DecodedCell {
                value: CellValue::Text(text.to_string()),
                link: Some(url.to_string()),
            },
            None => raw_fallback(),
        }),
        CellShape::Annotated { .. } | CellShape::Opaque => Some(raw_fallback()),
    }
}

/// `start_date`, joined with `start_time` by a single space when present.
fn decode_date_payload(payload: &Value) -> Option<String> {
    let start_date = payload.get("start_date")?.as_str()?;
    match payload.get("start_time").and_then(Value::as_str) {
        Some(start_time) => Some(format!("{start_date} {start_time}")),
        None => Some(start_date.to_string()),
    }
}

/// Decodes one row's raw property map against the collection schema.
///
/// Returns `Ok(None)` for rows that decode to one entry or fewer — a row
/// whose only content is incidental contributes nothing to the feed.
///
/// # Errors
///
/// [`DecodeError::UnknownColumn`] when a property key has no schema entry.
pub fn decode_row(
    properties: &serde_json::Map<String, Value>,
    schema: &ColumnSchema,
) -> Result<Option<DecodedRow>, DecodeError> {
    let mut row = DecodedRow::default();

    for (key, cell) in properties {
        let name = schema
            .name_of(key)
            .ok_or_else(|| DecodeError::UnknownColumn(key.clone()))?;

        let Some(cell) = decode_cell(cell) else {
            continue;
        };
        if let Some(url) = cell.link {
            row.insert(URL_COLUMN.to_string(), CellValue::Text(url));
        }
        row.insert(name.to_string(), cell.value);
    }

    Ok(if row.len() > 1 { Some(row) } else { None })
}

/// Lazy, single-pass iterator over the decodable rows of a collection
/// snapshot. Rows without properties and rows that decode empty are skipped;
/// an [`DecodeError::UnknownColumn`] surfaces as an `Err` item.
pub struct DecodedRows<'a> {
    blocks: serde_json::map::Values<'a>,
    schema: &'a ColumnSchema,
}

impl<'a> Iterator for DecodedRows<'a> {
    type Item = Result<DecodedRow, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let block = self.blocks.next()?;
            let Some(properties) = block
                .get("value")
                .and_then(|v| v.get("properties"))
                .and_then(Value::as_object)
            else {
                continue;
            };
            if properties.is_empty() {
                continue;
            }

            match decode_row(properties, self.schema) {
                Ok(Some(row)) => return Some(Ok(row)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Iterates the snapshot's block records in response order.
pub fn decode_rows<'a>(
    snapshot: &'a CollectionSnapshot,
    schema: &'a ColumnSchema,
) -> DecodedRows<'a> {
    DecodedRows {
        blocks: snapshot.block.values(),
        schema,
    }
}
