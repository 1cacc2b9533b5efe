use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

use notion2atom::config::Config;
use notion2atom::notion::{self, decode_rows, resolve_schema, DecodedRow, NotionClient};
use notion2atom::feed;

#[derive(Parser, Debug)]
#[command(name = "notion2atom", about = "Publish a Notion table as an Atom feed")]
struct Args {
    /// Path to the configuration file
    #[arg(long, value_name = "FILE", default_value = "notion2atom.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the feed document.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Identifier normalizer self-check against a known pair, in every
    // build profile. A broken normalizer must not reach the network.
    let checked = notion::to_dashed_id("89c7c5f0ab804edf99a4985cc0c11168")
        .context("identifier normalizer self-check failed")?;
    anyhow::ensure!(
        checked == "89c7c5f0-ab80-4edf-99a4-985cc0c11168",
        "identifier normalizer self-check produced `{checked}`"
    );

    let args = Args::parse();
    let config = Config::load(&args.config).with_context(|| {
        format!(
            "failed to load configuration from {}",
            args.config.display()
        )
    })?;

    if let Some(base) = &config.fetch.api_base_url {
        tracing::info!(base_url = %base, "Using custom API base URL");
    }

    let client = NotionClient::new(reqwest::Client::new(), config.fetch.to_options());

    let table = client
        .resolve_block(&config.channel.blog_id)
        .await
        .context("failed to resolve the table page")?;
    let snapshot = client
        .fetch_collection(&table.collection_id, &table.view_id)
        .await
        .context("failed to fetch the collection")?;

    let schema = resolve_schema(&snapshot).context("failed to resolve the table schema")?;
    tracing::debug!(
        columns = ?schema.visible_columns().collect::<Vec<_>>(),
        "Visible table columns"
    );

    let rows: Vec<DecodedRow> = decode_rows(&snapshot, &schema)
        .collect::<Result<_, _>>()
        .context("failed to decode table rows")?;

    let entries = feed::assemble(rows, &config.mapping, &config.channel)
        .context("failed to assemble feed entries")?;
    let document = feed::render(&config.channel, &entries, Utc::now())
        .context("failed to render the feed document")?;

    println!("{document}");
    Ok(())
}
