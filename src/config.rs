//! Configuration file parser for notion2atom.toml.
//!
//! The file is required — there is no useful default for the channel
//! metadata or the page id. Unknown keys are silently ignored by serde,
//! though we log a warning when the file contains potential typos.

use crate::notion::{FetchOptions, RetryPolicy};
use crate::util::{validate_http_url, UrlValidationError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid `{field}` URL: {source}")]
    InvalidUrl {
        field: &'static str,
        source: UrlValidationError,
    },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration, read once at startup and passed by reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub channel: ChannelConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Feed-level channel metadata plus the page id of the source table.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    pub blog_name: String,
    pub feed_url: String,
    pub blog_url: String,
    pub author: String,
    pub blog_id: String,
}

/// Which readable column feeds each entry field. The sentinel `-` (or a
/// missing key) means "unmapped, use the default". Entry URLs are opt-in:
/// map `URL = "URL"` to publish the links captured from link annotations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "URL")]
    pub url: Option<String>,
    pub updated: Option<String>,
}

impl MappingConfig {
    fn resolve(key: Option<&String>) -> Option<&str> {
        match key.map(String::as_str) {
            None | Some("-") | Some("") => None,
            some => some,
        }
    }

    pub fn title_column(&self) -> Option<&str> {
        Self::resolve(self.title.as_ref())
    }

    pub fn content_column(&self) -> Option<&str> {
        Self::resolve(self.content.as_ref())
    }

    pub fn author_column(&self) -> Option<&str> {
        Self::resolve(self.author.as_ref())
    }

    pub fn url_column(&self) -> Option<&str> {
        Self::resolve(self.url.as_ref())
    }

    pub fn updated_column(&self) -> Option<&str> {
        Self::resolve(self.updated.as_ref())
    }
}

/// Transport tuning. All fields optional; defaults mirror the reference
/// behavior (single attempt, page limit 70).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub page_limit: u32,
    pub user_locale: String,
    pub user_time_zone: String,
    /// Override of the API base path, for testing against a local mock.
    pub api_base_url: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = FetchOptions::default();
        Self {
            timeout_secs: defaults.timeout.as_secs(),
            max_attempts: defaults.retry.max_attempts,
            retry_delay_ms: defaults.retry.base_delay.as_millis() as u64,
            page_limit: defaults.page_limit,
            user_locale: defaults.user_locale,
            user_time_zone: defaults.user_time_zone,
            api_base_url: None,
        }
    }
}

impl FetchConfig {
    pub fn to_options(&self) -> FetchOptions {
        let defaults = FetchOptions::default();
        FetchOptions {
            base_url: self
                .api_base_url
                .clone()
                .unwrap_or(defaults.base_url),
            // A zero timeout would fail every request instantly.
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            retry: RetryPolicy {
                max_attempts: self.max_attempts.max(1),
                base_delay: Duration::from_millis(self.retry_delay_ms),
            },
            page_limit: self.page_limit,
            user_locale: self.user_locale.clone(),
            user_time_zone: self.user_time_zone.clone(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    ///
    /// - Missing or unreadable file → `Err(ConfigError::Io)`
    /// - Invalid TOML or missing required keys → `Err(ConfigError::Parse)`
    /// - Malformed channel/base URLs → `Err(ConfigError::InvalidUrl)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        // Parse as a raw table first to warn about likely typos.
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = ["channel", "mapping", "fetch"];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown section in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            blog = %config.channel.blog_name,
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url(&self.channel.feed_url)
            .map_err(|source| ConfigError::InvalidUrl {
                field: "feed_url",
                source,
            })?;
        validate_http_url(&self.channel.blog_url)
            .map_err(|source| ConfigError::InvalidUrl {
                field: "blog_url",
                source,
            })?;
        if let Some(base) = &self.fetch.api_base_url {
            validate_http_url(base).map_err(|source| ConfigError::InvalidUrl {
                field: "api_base_url",
                source,
            })?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[channel]
blog_name = "Example blog"
feed_url = "https://blog.example.com/atom.xml"
blog_url = "https://blog.example.com"
author = "Bystroushaak"
blog_id = "89c7c5f0ab804edf99a4985cc0c11168"
"#;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("notion2atom_config_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("notion2atom.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let path = write_config("minimal", MINIMAL);
        let config = Config::load(&path).unwrap();

        assert_eq!(config.channel.blog_name, "Example blog");
        assert_eq!(config.mapping.title_column(), None);
        // Every mapping key is unmapped by default, entry URLs included.
        assert_eq!(config.mapping.url_column(), None);
        assert_eq!(config.fetch.max_attempts, 1);
        assert_eq!(config.fetch.page_limit, 70);
        assert_eq!(config.fetch.user_locale, "en");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = std::path::Path::new("/tmp/notion2atom_nonexistent.toml");
        assert!(matches!(
            Config::load(path).unwrap_err(),
            ConfigError::Io(_)
        ));
    }

    #[test]
    fn test_missing_channel_is_parse_error() {
        let path = write_config("nochannel", "[mapping]\ntitle = \"Name\"\n");
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            ConfigError::Parse(_)
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_mapping_sentinel_means_unmapped() {
        let content = format!(
            "{MINIMAL}\n[mapping]\ntitle = \"Name\"\ncontent = \"-\"\nupdated = \"Date\"\nURL = \"-\"\n"
        );
        let path = write_config("sentinel", &content);
        let config = Config::load(&path).unwrap();

        assert_eq!(config.mapping.title_column(), Some("Name"));
        assert_eq!(config.mapping.content_column(), None);
        assert_eq!(config.mapping.updated_column(), Some("Date"));
        assert_eq!(config.mapping.url_column(), None);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_url_mapping_is_opt_in() {
        let content = format!("{MINIMAL}\n[mapping]\nURL = \"URL\"\n");
        let path = write_config("url_opt_in", &content);
        let config = Config::load(&path).unwrap();

        assert_eq!(config.mapping.url_column(), Some("URL"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_fetch_section_builds_retry_policy() {
        let content = format!(
            "{MINIMAL}\n[fetch]\nmax_attempts = 3\nretry_delay_ms = 250\ntimeout_secs = 10\n"
        );
        let path = write_config("fetch", &content);
        let config = Config::load(&path).unwrap();
        let options = config.fetch.to_options();

        assert_eq!(options.retry.max_attempts, 3);
        assert_eq!(options.retry.base_delay, Duration::from_millis(250));
        assert_eq!(options.timeout, Duration::from_secs(10));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_zero_timeout_clamped() {
        let content = format!("{MINIMAL}\n[fetch]\ntimeout_secs = 0\n");
        let path = write_config("zero_timeout", &content);
        let config = Config::load(&path).unwrap();

        assert_eq!(config.fetch.to_options().timeout, Duration::from_secs(1));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_feed_url_rejected() {
        let content = MINIMAL.replace("https://blog.example.com/atom.xml", "not a url");
        let path = write_config("badurl", &content);
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            ConfigError::InvalidUrl {
                field: "feed_url",
                ..
            }
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unknown_section_accepted() {
        let content = format!("{MINIMAL}\n[totally_fake]\nkey = 1\n");
        let path = write_config("unknown", &content);
        assert!(Config::load(&path).is_ok());
        std::fs::remove_file(&path).ok();
    }
}
