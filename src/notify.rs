//! Telegram Bot API notifications.
//!
//! Delivery is best-effort: every failure is logged and reported through [`Delivery`],
//! nothing is retried, and nothing is propagated to the caller as an error.

use std::time::Duration;

use anyhow::Context;
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::flight::FlightRecord;

/// Sent when a run finds no priced flights.
pub const NO_FLIGHTS_MESSAGE: &str = "❌ No flight data found, the scraper may need adjusting";

/// Sent by stub runs, which skip the scrape entirely.
pub const TEST_MESSAGE: &str = "🧪 flight-watch test message: notifications are configured correctly";

/// Outcome of a single notification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The Bot API accepted the message.
    Sent,
    /// No credentials configured; nothing was sent.
    Skipped,
    /// The request failed or was rejected.
    Failed,
}

impl Delivery {
    pub fn is_success(self) -> bool {
        self == Delivery::Sent
    }
}

#[derive(Debug, Clone)]
struct Credentials {
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Sends pre-formatted Markdown messages to a single Telegram chat.
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    credentials: Option<Credentials>,
}

impl TelegramNotifier {
    pub fn new(
        api_base: &str,
        bot_token: Option<String>,
        chat_id: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build notifier HTTP client")?;

        let credentials = match (bot_token, chat_id) {
            (Some(bot_token), Some(chat_id)) if !bot_token.is_empty() && !chat_id.is_empty() => {
                Some(Credentials { bot_token, chat_id })
            }
            _ => None,
        };

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_owned(),
            credentials,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.telegram_api_base,
            config.telegram_bot_token.clone(),
            config.telegram_chat_id.clone(),
            config.notify_timeout,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Post `text` to the configured chat.
    pub async fn send(&self, text: &str) -> Delivery {
        let Some(credentials) = &self.credentials else {
            warn!("Telegram is not configured, skipping notification");
            return Delivery::Skipped;
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, credentials.bot_token);
        let payload = SendMessage {
            chat_id: &credentials.chat_id,
            text,
            parse_mode: "Markdown",
        };

        debug!(chars = text.chars().count(), "sending Telegram notification");

        let resp = match self.http.post(&url).json(&payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                // reqwest includes the URL in its errors, which would leak the token
                error!(error = %e.without_url(), "failed to send Telegram notification");
                return Delivery::Failed;
            }
        };

        let status = resp.status();
        if status.is_success() {
            info!("Telegram notification sent");
            Delivery::Sent
        } else {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Telegram rejected notification");
            Delivery::Failed
        }
    }
}

/// Markdown notification for the cheapest flight of a run.
pub fn format_lowest_fare(flight: &FlightRecord) -> String {
    format!(
        "🎫 *{platform} lowest fare*\n\
         \n\
         📅 Date: `{date}`\n\
         ✈️ Flight: `{flight_no}`\n\
         🏢 Airline: {airline}\n\
         🛫 Departs: {departure}\n\
         🛬 Arrives: {arrival}\n\
         💰 Price: *¥{price}*\n\
         \n\
         🔗 [View listing]({url})",
        platform = escape_markdown(&flight.platform),
        date = flight.date.format("%Y-%m-%d"),
        flight_no = code_span(&flight.flight_no),
        airline = escape_markdown(&flight.airline),
        departure = escape_markdown(&flight.departure_time),
        arrival = escape_markdown(&flight.arrival_time),
        price = flight.price.to_formatted_string(&Locale::en),
        url = flight.url,
    )
}

/// Best-effort diagnostic sent when a run fails outright.
pub fn format_failure(err: &anyhow::Error) -> String {
    format!(
        "❌ flight-watch run failed: {}",
        escape_markdown(&format!("{err:#}"))
    )
}

/// Backslash-escape the entity markers of Telegram's legacy Markdown (`_`, `*`, `` ` ``, `[`).
///
/// An unmatched marker makes the Bot API reject the whole message.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Content for an inline code span. Escapes are not recognized inside one, so
/// backticks are swapped for a lookalike instead.
fn code_span(text: &str) -> String {
    text.replace('`', "'")
}
