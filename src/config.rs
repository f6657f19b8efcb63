//! Runtime configuration loaded from `flight-watch.toml` and the environment.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Deserializer};

use crate::history::DEFAULT_CAPACITY;

/// Optional config file read from the working directory.
pub const CONFIG_FILE: &str = "flight-watch.toml";

/// Whether a run loads the results page or only exercises notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeMode {
    #[default]
    Live,
    Stub,
}

#[derive(Deserialize, custom_debug_derive::Debug)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    #[debug(with = "crate::fmt::redacted")]
    pub telegram_bot_token: Option<String>,
    #[serde(default, deserialize_with = "deserialize_chat_id")]
    pub telegram_chat_id: Option<String>,
    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,

    /// Query date used when none is passed on the command line.
    #[serde(default)]
    pub flight_date: Option<NaiveDate>,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_destination")]
    pub destination: String,

    #[serde(default)]
    pub scrape_mode: ScrapeMode,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_max_listings")]
    pub max_listings: usize,
    #[serde(
        default = "default_page_settle",
        deserialize_with = "deserialize_duration"
    )]
    pub page_settle: Duration,
    #[serde(
        default = "default_listing_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub listing_timeout: Duration,
    #[serde(default = "default_screenshot_path")]
    pub screenshot_path: PathBuf,

    #[serde(
        default = "default_notify_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub notify_timeout: Duration,

    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Config {
    /// Load from [`CONFIG_FILE`] (if present), then environment variables, which take precedence.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        let blank = blank_env_keys();
        let blank: Vec<&str> = blank.iter().map(String::as_str).collect();

        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw().ignore(&blank))
    }
}

/// Variables that are set but blank, such as `FLIGHT_DATE=` from an unused CI input.
/// These are treated as unset so field defaults apply.
fn blank_env_keys() -> Vec<String> {
    std::env::vars_os()
        .filter(|(_, value)| value.to_str().is_some_and(|v| v.trim().is_empty()))
        .filter_map(|(key, _)| key.into_string().ok())
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_origin() -> String {
    "NTG".to_string()
}

fn default_destination() -> String {
    "CGQ".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_max_listings() -> usize {
    5
}

fn default_page_settle() -> Duration {
    Duration::from_secs(5)
}

fn default_listing_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_screenshot_path() -> PathBuf {
    PathBuf::from("error.png")
}

fn default_notify_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_history_path() -> PathBuf {
    PathBuf::from("flight_prices.json")
}

fn default_history_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Environment values like `-100123` arrive as integers, so accept either form.
fn deserialize_chat_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ChatId {
        Int(i64),
        Text(String),
    }

    Ok(Option::<ChatId>::deserialize(deserializer)?.map(|id| match id {
        ChatId::Int(n) => n.to_string(),
        ChatId::Text(s) => s,
    }))
}

/// Accepts whole seconds (`20`) or a duration string (`20s`, `500ms`, `1m`).
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Seconds(u64),
        Text(String),
    }

    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
        RawDuration::Text(text) => {
            let parsed = fundu::DurationParser::with_all_time_units()
                .parse(text.trim())
                .map_err(|e| D::Error::custom(format!("invalid duration '{text}': {e}")))?;
            Duration::try_from(parsed)
                .map_err(|e| D::Error::custom(format!("invalid duration '{text}': {e}")))
        }
    }
}
