//! Flight listing and history record types.

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use url::Url;

/// Label stored on every record scraped from the Ctrip results page.
pub const PLATFORM: &str = "Ctrip";

const SEARCH_BASE: &str = "https://flights.ctrip.com/booking/";

/// One candidate flight scraped from a results listing.
///
/// A `price` of `0` means the listing showed no parseable price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub date: NaiveDate,
    pub flight_no: String,
    pub airline: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub price: u32,
    pub platform: String,
    pub url: String,
}

/// A persisted snapshot of the cheapest flight found by one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(with = "capture_time")]
    pub timestamp: NaiveDateTime,
    pub flight: FlightRecord,
}

impl HistoryRecord {
    /// Stamp a flight with the current local time.
    pub fn now(flight: FlightRecord) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            flight,
        }
    }
}

/// The route and date a run searches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightQuery {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
}

impl FlightQuery {
    pub fn new(origin: &str, destination: &str, date: NaiveDate) -> Self {
        Self {
            origin: origin.to_owned(),
            destination: destination.to_owned(),
            date,
        }
    }

    /// One-way search results page for this route and date.
    pub fn search_url(&self) -> Result<Url, url::ParseError> {
        let page = format!(
            "{SEARCH_BASE}{}-{}-day-1.html",
            self.origin.to_lowercase(),
            self.destination.to_lowercase()
        );
        Url::parse_with_params(&page, [("ddate1", self.date.format("%Y-%m-%d").to_string())])
    }
}

/// Parse listing price text such as `"¥1,280"` into whole currency units.
///
/// Text is NFKC-normalized first, so full-width forms like `"￥５８０"` or `"１，２８０"`
/// read the same as their ASCII equivalents. Returns `0` for anything that is not a
/// plain number once currency symbols and thousands separators are removed.
pub fn parse_price(text: &str) -> u32 {
    let cleaned: String = text
        .nfkc()
        .filter(|c| !matches!(c, '¥' | ','))
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return 0;
    }
    cleaned.parse().unwrap_or(0)
}

/// `YYYY-MM-DD HH:MM:SS` capture timestamps, matching existing history files.
mod capture_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
