//! Maps decoded rows onto feed entries via the configured field mapping.

use crate::config::{ChannelConfig, MappingConfig};
use crate::notion::DecodedRow;
use crate::util::date::parse_flexible;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Placeholder title for rows whose title column is unmapped or empty.
pub const DEFAULT_TITLE: &str = "Update";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    /// Zero publishable rows. An empty feed must not be published; the run
    /// aborts instead of emitting a document with no entries.
    #[error("no publishable rows were decoded from the table")]
    EmptyResult,
}

/// One feed entry, ready for the Atom writer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub content: String,
    pub author: String,
    pub url: Option<String>,
    pub updated: Option<DateTime<Utc>>,
}

fn text_of(row: &DecodedRow, column: Option<&str>) -> Option<String> {
    column
        .and_then(|name| row.get(name))
        .map(|value| value.as_text().into_owned())
}

/// Builds one [`FeedEntry`] per decoded row, preserving input order.
///
/// Each feed field is sourced from the column the mapping names; unmapped
/// fields fall back to their defaults (title `"Update"`, content empty,
/// author = channel author, url none). The `updated` column goes through
/// the lenient date parser; unparseable dates simply leave the field unset.
///
/// # Errors
///
/// [`AssembleError::EmptyResult`] when `rows` yields nothing.
pub fn assemble(
    rows: impl IntoIterator<Item = DecodedRow>,
    mapping: &MappingConfig,
    channel: &ChannelConfig,
) -> Result<Vec<FeedEntry>, AssembleError> {
    let entries: Vec<FeedEntry> = rows
        .into_iter()
        .map(|row| {
            let updated = text_of(&row, mapping.updated_column())
                .and_then(|text| parse_flexible(&text));

            FeedEntry {
                title: text_of(&row, mapping.title_column())
                    .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                content: text_of(&row, mapping.content_column()).unwrap_or_default(),
                author: text_of(&row, mapping.author_column())
                    .unwrap_or_else(|| channel.author.clone()),
                url: text_of(&row, mapping.url_column()),
                updated,
            }
        })
        .collect();

    if entries.is_empty() {
        return Err(AssembleError::EmptyResult);
    }

    tracing::info!(entries = entries.len(), "Assembled feed entries");
    Ok(entries)
}
