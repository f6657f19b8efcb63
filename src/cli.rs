use chrono::{Days, NaiveDate};
use clap::{Parser, ValueEnum};

/// Scrape the cheapest fare for one route and date, record it, and notify Telegram.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Departure date (YYYY-MM-DD). Defaults to FLIGHT_DATE, then tomorrow.
    pub date: Option<NaiveDate>,

    /// Skip the page scrape and only send a test notification
    #[arg(long)]
    pub stub: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable output for terminals
    Pretty,
    /// One JSON object per line, for CI logs
    Json,
}

fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

/// Pick the query date: explicit argument, then configured default, then the day after `today`.
pub fn resolve_query_date(
    explicit: Option<NaiveDate>,
    configured: Option<NaiveDate>,
    today: NaiveDate,
) -> NaiveDate {
    explicit
        .or(configured)
        .unwrap_or_else(|| today.checked_add_days(Days::new(1)).unwrap_or(today))
}
