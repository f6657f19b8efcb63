//! Error types for page loading.

use std::time::Duration;

use fantoccini::error::{CmdError, NewSessionError};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to start WebDriver session at {url}")]
    Connect {
        url: String,
        #[source]
        source: NewSessionError,
    },
    #[error("invalid search URL")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to load results page")]
    Navigation(#[source] CmdError),
    #[error("no flight listings appeared within {0:?}")]
    ListingTimeout(Duration),
    #[error("failed to read page source")]
    PageSource(#[source] CmdError),
    #[error("results page contained no flight listings")]
    NoListings,
}
