//! Atom document rendering via quick-xml's serde support.

use crate::config::ChannelConfig;
use crate::feed::assembler::FeedEntry;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to serialize feed document: {0}")]
    Serialize(#[from] quick_xml::SeError),
}

#[derive(Serialize)]
#[serde(rename = "feed")]
struct FeedDoc {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    title: String,
    id: String,
    updated: String,
    #[serde(rename = "link")]
    links: Vec<LinkElem>,
    author: PersonElem,
    #[serde(rename = "entry")]
    entries: Vec<EntryElem>,
}

#[derive(Serialize)]
struct LinkElem {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel")]
    rel: &'static str,
}

#[derive(Serialize)]
struct PersonElem {
    name: String,
}

#[derive(Serialize)]
struct EntryElem {
    title: String,
    id: String,
    updated: String,
    #[serde(rename = "link", skip_serializing_if = "Option::is_none")]
    link: Option<LinkElem>,
    author: PersonElem,
    content: ContentElem,
}

#[derive(Serialize)]
struct ContentElem {
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "$text")]
    body: String,
}

/// Stable id for entries without a URL: a sha256 over the identifying
/// fields, in URN form.
fn entry_id(entry: &FeedEntry) -> String {
    if let Some(url) = &entry.url {
        return url.clone();
    }

    let input = format!(
        "{}|{}|{}",
        entry.title,
        entry.content,
        entry
            .updated
            .map(|u| u.timestamp().to_string())
            .unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("urn:sha256:{:x}", hash)
}

fn rfc3339(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Renders the complete Atom document.
///
/// Entries keep their input order. Entries without an `updated` timestamp
/// get `now`; the feed-level `updated` is the newest entry timestamp, or
/// `now` when no entry carries one.
pub fn render(
    channel: &ChannelConfig,
    entries: &[FeedEntry],
    now: DateTime<Utc>,
) -> Result<String, RenderError> {
    let feed_updated = entries.iter().filter_map(|e| e.updated).max().unwrap_or(now);

    let doc = FeedDoc {
        xmlns: ATOM_NS,
        title: channel.blog_name.clone(),
        id: channel.feed_url.clone(),
        updated: rfc3339(feed_updated),
        links: vec![
            LinkElem {
                href: channel.blog_url.clone(),
                rel: "alternate",
            },
            LinkElem {
                href: channel.feed_url.clone(),
                rel: "self",
            },
        ],
        author: PersonElem {
            name: channel.author.clone(),
        },
        entries: entries
            .iter()
            .map(|entry| EntryElem {
                title: entry.title.clone(),
                id: entry_id(entry),
                updated: rfc3339(entry.updated.unwrap_or(now)),
                link: entry.url.as_ref().map(|url| LinkElem {
                    href: url.clone(),
                    rel: "alternate",
                }),
                author: PersonElem {
                    name: entry.author.clone(),
                },
                content: ContentElem {
                    kind: "text",
                    body: entry.content.clone(),
                },
            })
            .collect(),
    };

    let body = quick_xml::se::to_string(&doc)?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{body}"))
}
