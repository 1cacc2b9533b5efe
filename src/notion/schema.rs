//! Column schema extraction from a collection snapshot.

use crate::notion::client::CollectionSnapshot;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from resolving the table schema out of a snapshot.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("response contains no collection_view record")]
    MissingView,

    #[error("response contains no collection record")]
    MissingCollection,

    /// Board, gallery and calendar layouts are not supported.
    #[error("unsupported view type `{0}`: only table views can be published")]
    UnsupportedViewType(String),

    #[error("malformed {record} record: {source}")]
    Malformed {
        record: &'static str,
        source: serde_json::Error,
    },
}

/// Immutable column metadata for one table: which columns are visible and in
/// what order, plus the mapping from internal column key to the
/// human-readable column name. Built once per fetch, read-only thereafter.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    ordering: Vec<String>,
    names: HashMap<String, String>,
}

impl ColumnSchema {
    pub fn new(ordering: Vec<String>, names: HashMap<String, String>) -> Self {
        Self { ordering, names }
    }

    /// Readable name for an internal column key.
    pub fn name_of(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    /// Readable names of the visible columns, in view order. Keys the
    /// collection schema does not name are skipped.
    pub fn visible_columns(&self) -> impl Iterator<Item = &str> {
        self.ordering.iter().filter_map(|key| self.name_of(key))
    }
}

#[derive(Debug, Deserialize)]
struct ViewValue {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    format: ViewFormat,
}

#[derive(Debug, Default, Deserialize)]
struct ViewFormat {
    #[serde(default)]
    table_properties: Vec<TableProperty>,
}

#[derive(Debug, Deserialize)]
struct TableProperty {
    property: String,
    #[serde(default)]
    visible: bool,
}

#[derive(Debug, Deserialize)]
struct CollectionValue {
    #[serde(default)]
    schema: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SchemaColumn {
    name: String,
}

/// Takes the first entry of a record map, in response order.
///
/// In principle the maps could hold several records; the wire contract for a
/// single-table query yields exactly one, and response order makes the choice
/// deterministic either way.
fn first_value(map: &serde_json::Map<String, Value>) -> Option<&Value> {
    map.values().next().and_then(|envelope| envelope.get("value"))
}

/// Resolves the table's [`ColumnSchema`] from a collection snapshot.
///
/// # Errors
///
/// - [`SchemaError::MissingView`] / [`SchemaError::MissingCollection`] when
///   the respective record map is empty
/// - [`SchemaError::UnsupportedViewType`] when the view is not a table
/// - [`SchemaError::Malformed`] when a record does not deserialize
pub fn resolve_schema(snapshot: &CollectionSnapshot) -> Result<ColumnSchema, SchemaError> {
    let view = first_value(&snapshot.collection_view).ok_or(SchemaError::MissingView)?;
    let view: ViewValue =
        serde_json::from_value(view.clone()).map_err(|source| SchemaError::Malformed {
            record: "collection_view",
            source,
        })?;

    if view.kind != "table" {
        return Err(SchemaError::UnsupportedViewType(view.kind));
    }

    let ordering: Vec<String> = view
        .format
        .table_properties
        .into_iter()
        .filter(|p| p.visible)
        .map(|p| p.property)
        .collect();

    let collection = first_value(&snapshot.collection).ok_or(SchemaError::MissingCollection)?;
    let collection: CollectionValue =
        serde_json::from_value(collection.clone()).map_err(|source| SchemaError::Malformed {
            record: "collection",
            source,
        })?;

    let mut names = HashMap::with_capacity(collection.schema.len());
    for (key, column) in collection.schema {
        let column: SchemaColumn =
            serde_json::from_value(column).map_err(|source| SchemaError::Malformed {
                record: "collection",
                source,
            })?;
        names.insert(key, column.name);
    }

    tracing::debug!(
        columns = names.len(),
        visible = ordering.len(),
        "Resolved table schema"
    );

    Ok(ColumnSchema::new(ordering, names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(view: Value, collection: Value) -> CollectionSnapshot {
        serde_json::from_value(json!({
            "collection_view": {"view-id": {"value": view}},
            "collection": {"coll-id": {"value": collection}},
            "block": {}
        }))
        .unwrap()
    }

    fn table_view() -> Value {
        json!({
            "type": "table",
            "format": {
                "table_properties": [
                    {"property": "ti", "visible": true},
                    {"property": "hid", "visible": false},
                    {"property": "dt", "visible": true}
                ]
            }
        })
    }

    fn blog_collection() -> Value {
        json!({
            "schema": {
                "ti": {"name": "Name", "type": "title"},
                "hid": {"name": "Draft", "type": "checkbox"},
                "dt": {"name": "Date", "type": "date"}
            }
        })
    }

    #[test]
    fn test_resolves_names_and_ordering() {
        let schema = resolve_schema(&snapshot(table_view(), blog_collection())).unwrap();

        assert_eq!(schema.name_of("ti"), Some("Name"));
        assert_eq!(schema.name_of("dt"), Some("Date"));
        assert_eq!(schema.name_of("nope"), None);

        // Hidden columns stay resolvable but drop out of the ordering.
        let visible: Vec<&str> = schema.visible_columns().collect();
        assert_eq!(visible, vec!["Name", "Date"]);
    }

    #[test]
    fn test_board_view_rejected() {
        let err = resolve_schema(&snapshot(json!({"type": "board"}), blog_collection()))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedViewType(kind) if kind == "board"));
    }

    #[test]
    fn test_missing_view_rejected() {
        let snap: CollectionSnapshot = serde_json::from_value(json!({
            "collection_view": {},
            "collection": {"coll-id": {"value": blog_collection()}},
            "block": {}
        }))
        .unwrap();
        assert!(matches!(
            resolve_schema(&snap).unwrap_err(),
            SchemaError::MissingView
        ));
    }

    #[test]
    fn test_missing_collection_rejected() {
        let snap: CollectionSnapshot = serde_json::from_value(json!({
            "collection_view": {"view-id": {"value": table_view()}},
            "collection": {},
            "block": {}
        }))
        .unwrap();
        assert!(matches!(
            resolve_schema(&snap).unwrap_err(),
            SchemaError::MissingCollection
        ));
    }

    #[test]
    fn test_first_view_taken_in_response_order() {
        let snap: CollectionSnapshot = serde_json::from_value(json!({
            "collection_view": {
                "second-wins-if-order-lost": {"value": {"type": "board"}},
                "view-b": {"value": table_view()}
            },
            "collection": {"coll-id": {"value": blog_collection()}},
            "block": {}
        }))
        .unwrap();

        // preserve_order keeps insertion order, so the board view comes
        // first and resolution fails on it.
        assert!(matches!(
            resolve_schema(&snap).unwrap_err(),
            SchemaError::UnsupportedViewType(_)
        ));
    }

    #[test]
    fn test_view_without_format_yields_empty_ordering() {
        let schema =
            resolve_schema(&snapshot(json!({"type": "table"}), blog_collection())).unwrap();
        assert_eq!(schema.visible_columns().count(), 0);
        assert_eq!(schema.name_of("ti"), Some("Name"));
    }
}
