//! Headless Chrome page loading over WebDriver.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tracing::{error, info, warn};
use url::Url;

use super::{Extraction, Extractor, ExtractError, LISTING_SELECTOR, parse_listings};
use crate::config::Config;
use crate::flight::FlightQuery;
use crate::utils::{fmt_duration, warn_if_slow};

const CHROME_ARGS: &[&str] = &[
    "--headless",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1920,1080",
    "user-agent=Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
];

/// Extra time allowed on top of the configured waits before a page load is reported as slow.
const SLOW_LOAD_MARGIN: Duration = Duration::from_secs(10);

/// Loads results pages in a WebDriver-controlled headless Chrome session.
pub struct BrowserExtractor {
    client: Client,
    page_settle: Duration,
    listing_timeout: Duration,
    max_listings: usize,
    screenshot_path: PathBuf,
}

impl BrowserExtractor {
    /// Open a new browser session against the configured WebDriver endpoint.
    pub async fn connect(config: &Config) -> Result<Self, ExtractError> {
        let mut capabilities = serde_json::Map::new();
        capabilities.insert("browserName".to_owned(), json!("chrome"));
        capabilities.insert("goog:chromeOptions".to_owned(), json!({ "args": CHROME_ARGS }));

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&config.webdriver_url)
            .await
            .map_err(|source| ExtractError::Connect {
                url: config.webdriver_url.clone(),
                source,
            })?;

        info!(webdriver = %config.webdriver_url, "browser session started");

        Ok(Self {
            client,
            page_settle: config.page_settle,
            listing_timeout: config.listing_timeout,
            max_listings: config.max_listings,
            screenshot_path: config.screenshot_path.clone(),
        })
    }

    /// Navigate, let scripts settle, and wait for the first listing before reading the DOM.
    async fn load_page(&self, url: &Url) -> Result<String, ExtractError> {
        let start = Instant::now();

        self.client
            .goto(url.as_str())
            .await
            .map_err(ExtractError::Navigation)?;

        tokio::time::sleep(self.page_settle).await;

        self.client
            .wait()
            .at_most(self.listing_timeout)
            .for_element(Locator::Css(LISTING_SELECTOR))
            .await
            .map_err(|e| match e {
                CmdError::WaitTimeout => ExtractError::ListingTimeout(self.listing_timeout),
                other => ExtractError::Navigation(other),
            })?;

        let source = self
            .client
            .source()
            .await
            .map_err(ExtractError::PageSource)?;

        let elapsed = warn_if_slow(
            start,
            self.page_settle + self.listing_timeout + SLOW_LOAD_MARGIN,
            "page load",
        );
        info!(duration = fmt_duration(elapsed), "results page loaded");
        Ok(source)
    }

    async fn try_extract(&self, query: &FlightQuery) -> Result<Extraction, ExtractError> {
        let url = query.search_url()?;
        info!(url = %url, "loading results page");

        let html = self.load_page(&url).await?;
        let extraction = parse_listings(&html, query, url.as_str(), self.max_listings);
        if extraction.seen() == 0 {
            return Err(ExtractError::NoListings);
        }
        Ok(extraction)
    }

    /// Capture the current page for debugging a failed extraction.
    async fn save_screenshot(&self) {
        let png = match self.client.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                warn!(error = %e, "failed to capture diagnostic screenshot");
                return;
            }
        };

        match tokio::fs::write(&self.screenshot_path, png).await {
            Ok(()) => info!(path = %self.screenshot_path.display(), "saved diagnostic screenshot"),
            Err(e) => warn!(
                error = %e,
                path = %self.screenshot_path.display(),
                "failed to write diagnostic screenshot"
            ),
        }
    }
}

#[async_trait]
impl Extractor for BrowserExtractor {
    async fn extract(&self, query: &FlightQuery) -> Extraction {
        match self.try_extract(query).await {
            Ok(extraction) => extraction,
            Err(e) => {
                error!(error = ?e, "failed to extract flights");
                self.save_screenshot().await;
                Extraction::default()
            }
        }
    }

    async fn close(&self) {
        match self.client.clone().close().await {
            Ok(()) => info!("browser session closed"),
            Err(e) => warn!(error = %e, "failed to close browser session"),
        }
    }
}
