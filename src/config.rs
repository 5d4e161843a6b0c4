//! Configuration loading.
//!
//! Non-secret settings come from an optional TOML file (default
//! `./config/bookclub.toml`); every field has a default, so a missing file
//! or a missing section is fine. The Notion credentials are secrets and
//! are read only from the process environment via [`Credentials`].
//!
//! ```toml
//! [input]
//! ratings_file = "data/ratings.csv"
//!
//! [notion]
//! api_base = "https://api.notion.com"
//! api_version = "2022-06-28"
//! timeout_secs = 30
//! title_property = "Book Title"
//! rating_property = "Rating"
//! favorites_property = "Favorites"
//!
//! [retry]
//! max_attempts = 5
//! delay_ms = 1000
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the Notion integration token.
pub const TOKEN_ENV: &str = "NOTION_TOKEN";
/// Environment variable holding the target database id.
pub const DATABASE_ID_ENV: &str = "NOTION_DATABASE_ID";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub notion: NotionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_ratings_file")]
    pub ratings_file: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            ratings_file: default_ratings_file(),
        }
    }
}

fn default_ratings_file() -> PathBuf {
    PathBuf::from("data/ratings.csv")
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotionConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_title_property")]
    pub title_property: String,
    #[serde(default = "default_rating_property")]
    pub rating_property: String,
    #[serde(default = "default_favorites_property")]
    pub favorites_property: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            title_property: default_title_property(),
            rating_property: default_rating_property(),
            favorites_property: default_favorites_property(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.notion.com".to_string()
}
fn default_api_version() -> String {
    "2022-06-28".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_title_property() -> String {
    "Book Title".to_string()
}
fn default_rating_property() -> String {
    "Rating".to_string()
}
fn default_favorites_property() -> String {
    "Favorites".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}
fn default_delay_ms() -> u64 {
    1000
}

/// Secrets needed to talk to the Notion API.
#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub database_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("database_id", &self.database_id)
            .finish()
    }
}

impl Credentials {
    /// Read `NOTION_TOKEN` and `NOTION_DATABASE_ID` from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build credentials from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| -> Result<String> {
            match lookup(name) {
                Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
                _ => bail!("{} environment variable not set", name),
            }
        };
        Ok(Self {
            token: read(TOKEN_ENV)?,
            database_id: read(DATABASE_ID_ENV)?,
        })
    }

    /// Last four characters of the token, for log lines.
    pub fn token_hint(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        let start = chars.len().saturating_sub(4);
        format!("…{}", chars[start..].iter().collect::<String>())
    }
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::default())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.retry.max_attempts == 0 {
        bail!("retry.max_attempts must be >= 1");
    }

    if config.notion.timeout_secs == 0 {
        bail!("notion.timeout_secs must be >= 1");
    }

    if config.notion.api_base.trim().is_empty() {
        bail!("notion.api_base must not be empty");
    }

    let props = [
        ("notion.title_property", &config.notion.title_property),
        ("notion.rating_property", &config.notion.rating_property),
        ("notion.favorites_property", &config.notion.favorites_property),
    ];
    for (name, value) in props {
        if value.trim().is_empty() {
            bail!("{} must not be empty", name);
        }
    }
    if config.notion.title_property == config.notion.rating_property
        || config.notion.title_property == config.notion.favorites_property
        || config.notion.rating_property == config.notion.favorites_property
    {
        bail!("notion property names must be distinct");
    }

    Ok(())
}
