//! Notion table access: identifier normalization, the v3 API client,
//! schema resolution, and the row-property decoder.
//!
//! The module is organized into four submodules:
//!
//! - [`id`] - Canonical dashed-UUID formatting of page identifiers
//! - [`client`] - Sequential `getRecordValues` / `queryCollection` lookups
//! - [`schema`] - Column ordering and key→name mapping out of a snapshot
//! - [`row`] - Shape-based decoding of raw cell values (the interesting part)

pub mod client;
pub mod id;
pub mod row;
pub mod schema;

pub use client::{
    CollectionSnapshot, FetchError, FetchOptions, NotionClient, RetryPolicy, TableRef,
};
pub use id::{to_dashed_id, IdError};
pub use row::{decode_row, decode_rows, CellValue, DecodeError, DecodedRow, URL_COLUMN};
pub use schema::{resolve_schema, ColumnSchema, SchemaError};
