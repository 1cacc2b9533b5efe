//! notion2atom publishes a Notion table as an Atom feed.
//!
//! The pipeline is strictly sequential: resolve the configured page id to
//! its collection/view pair, query the collection, resolve the column
//! schema, decode each row's loosely-typed cell values, map the decoded
//! rows onto feed entries, and render the Atom document.
//!
//! - [`config`] - TOML configuration (`[channel]`, `[mapping]`, `[fetch]`)
//! - [`notion`] - API client, identifier normalization, schema resolution,
//!   and the shape-based row decoder
//! - [`feed`] - entry assembly and Atom rendering
//! - [`util`] - lenient date parsing, URL validation

pub mod config;
pub mod feed;
pub mod notion;
pub mod util;
