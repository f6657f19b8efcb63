//! Flight listing extraction from the rendered results page.
//!
//! Parsing is kept separate from page loading: [`parse_listings`] works on any HTML
//! string, while [`BrowserExtractor`] drives a WebDriver session to produce that HTML.

mod browser;
mod errors;

pub use browser::BrowserExtractor;
pub use errors::ExtractError;

use async_trait::async_trait;
use html_scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::flight::{FlightQuery, FlightRecord, PLATFORM, parse_price};

/// Marker element the page renders once results have loaded.
pub(crate) const LISTING_SELECTOR: &str = ".flight-item";

/// Turns a query into the flights listed for it.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract listed flights. Page-level failures yield an empty [`Extraction`].
    async fn extract(&self, query: &FlightQuery) -> Extraction;

    /// Release any session held by the extractor.
    async fn close(&self) {}
}

/// Why a single listing was left out of the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingFlightNo,
    MissingPrice,
    MissingAirline,
}

/// Result of parsing one listing element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Parsed(FlightRecord),
    Skipped(SkipReason),
}

/// Flights pulled from one page, plus how many listings could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub flights: Vec<FlightRecord>,
    pub skipped: usize,
}

impl Extraction {
    /// Total listings looked at, parsed or not.
    pub fn seen(&self) -> usize {
        self.flights.len() + self.skipped
    }
}

impl FromIterator<Listing> for Extraction {
    fn from_iter<I: IntoIterator<Item = Listing>>(iter: I) -> Self {
        let mut extraction = Extraction::default();
        for listing in iter {
            match listing {
                Listing::Parsed(flight) => extraction.flights.push(flight),
                Listing::Skipped(_) => extraction.skipped += 1,
            }
        }
        extraction
    }
}

struct ListingSelectors {
    item: Selector,
    flight_no: Selector,
    time: Selector,
    price: Selector,
    airline: Selector,
}

impl ListingSelectors {
    fn new() -> Self {
        Self {
            item: Selector::parse(LISTING_SELECTOR).unwrap(),
            flight_no: Selector::parse(".flight-No").unwrap(),
            time: Selector::parse(".time").unwrap(),
            price: Selector::parse(".price").unwrap(),
            airline: Selector::parse(".airline-name").unwrap(),
        }
    }
}

/// Parse at most `limit` flight listings from a results page.
///
/// Listings missing a flight number, price, or airline element are skipped and
/// counted. Missing departure/arrival times become empty strings, and unreadable
/// prices become `0`.
pub fn parse_listings(html: &str, query: &FlightQuery, url: &str, limit: usize) -> Extraction {
    let document = Html::parse_document(html);
    let selectors = ListingSelectors::new();

    let extraction: Extraction = document
        .select(&selectors.item)
        .take(limit)
        .enumerate()
        .map(|(index, item)| {
            let listing = parse_listing(item, &selectors, query, url);
            match &listing {
                Listing::Parsed(flight) => {
                    debug!(flight_no = %flight.flight_no, price = flight.price, "parsed listing")
                }
                Listing::Skipped(reason) => {
                    warn!(index, reason = ?reason, "failed to parse listing, skipping")
                }
            }
            listing
        })
        .collect();

    debug!(
        parsed = extraction.flights.len(),
        skipped = extraction.skipped,
        "listing extraction finished"
    );
    extraction
}

fn parse_listing(
    item: ElementRef<'_>,
    selectors: &ListingSelectors,
    query: &FlightQuery,
    url: &str,
) -> Listing {
    let Some(flight_no) = first_text(item, &selectors.flight_no) else {
        return Listing::Skipped(SkipReason::MissingFlightNo);
    };
    let Some(price_text) = first_text(item, &selectors.price) else {
        return Listing::Skipped(SkipReason::MissingPrice);
    };
    let Some(airline) = first_text(item, &selectors.airline) else {
        return Listing::Skipped(SkipReason::MissingAirline);
    };

    let mut times = item.select(&selectors.time).map(element_text);
    let departure_time = times.next().unwrap_or_default();
    let arrival_time = times.next().unwrap_or_default();

    Listing::Parsed(FlightRecord {
        date: query.date,
        flight_no,
        airline,
        departure_time,
        arrival_time,
        price: parse_price(&price_text),
        platform: PLATFORM.to_owned(),
        url: url.to_owned(),
    })
}

fn first_text(item: ElementRef<'_>, selector: &Selector) -> Option<String> {
    item.select(selector).next().map(element_text)
}

/// Visible text with runs of whitespace collapsed, as a browser would render it.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const URL: &str = "https://flights.ctrip.com/booking/ntg-cgq-day-1.html?ddate1=2026-10-20";

    fn query() -> FlightQuery {
        FlightQuery::new("NTG", "CGQ", NaiveDate::from_ymd_opt(2026, 10, 20).unwrap())
    }

    fn listing(flight_no: &str, airline: &str, times: &[&str], price: &str) -> String {
        let times: String = times
            .iter()
            .map(|t| format!(r#"<span class="time">{t}</span>"#))
            .collect();
        format!(
            r#"<div class="flight-item">
                 <div class="flight-airline"><span class="airline-name">{airline}</span>
                   <span class="flight-No">{flight_no}</span></div>
                 <div class="flight-detail">{times}</div>
                 <div class="flight-price"><span class="price">{price}</span></div>
               </div>"#
        )
    }

    fn page(listings: &[String]) -> String {
        format!(
            "<html><body><div class=\"search-result\">{}</div></body></html>",
            listings.concat()
        )
    }

    #[test]
    fn test_parse_full_listing() {
        let html = page(&[listing("MU2871", "China Eastern", &["07:40", "10:35"], "¥1,280")]);
        let extraction = parse_listings(&html, &query(), URL, 5);

        assert_eq!(extraction.skipped, 0);
        assert_eq!(
            extraction.flights,
            vec![FlightRecord {
                date: query().date,
                flight_no: "MU2871".to_owned(),
                airline: "China Eastern".to_owned(),
                departure_time: "07:40".to_owned(),
                arrival_time: "10:35".to_owned(),
                price: 1280,
                platform: PLATFORM.to_owned(),
                url: URL.to_owned(),
            }]
        );
    }

    #[test]
    fn test_missing_times_become_empty() {
        let html = page(&[listing("CZ6512", "China Southern", &["09:15"], "¥640")]);
        let flight = &parse_listings(&html, &query(), URL, 5).flights[0];
        assert_eq!(flight.departure_time, "09:15");
        assert_eq!(flight.arrival_time, "");
    }

    #[test]
    fn test_unparseable_price_is_zero() {
        let html = page(&[listing("HO1234", "Juneyao", &["12:00", "15:00"], "Sold out")]);
        let extraction = parse_listings(&html, &query(), URL, 5);
        assert_eq!(extraction.flights[0].price, 0);
        assert_eq!(extraction.skipped, 0);
    }

    #[test]
    fn test_broken_listing_is_skipped_and_counted() {
        let broken = r#"<div class="flight-item"><span class="airline-name">Ghost Air</span></div>"#;
        let html = page(&[
            listing("MU2871", "China Eastern", &["07:40", "10:35"], "¥580"),
            broken.to_owned(),
            listing("CZ6512", "China Southern", &["09:15", "12:05"], "¥620"),
        ]);
        let extraction = parse_listings(&html, &query(), URL, 5);

        assert_eq!(extraction.skipped, 1);
        assert_eq!(extraction.seen(), 3);
        let numbers: Vec<_> = extraction.flights.iter().map(|f| f.flight_no.as_str()).collect();
        assert_eq!(numbers, vec!["MU2871", "CZ6512"]);
    }

    #[test]
    fn test_limit_applies_before_parsing() {
        let listings: Vec<String> = (1..=8)
            .map(|n| listing(&format!("MU{n}"), "China Eastern", &["07:00", "09:00"], &format!("{}", 100 * n)))
            .collect();
        let extraction = parse_listings(&page(&listings), &query(), URL, 5);

        assert_eq!(extraction.flights.len(), 5);
        assert_eq!(extraction.flights.last().unwrap().flight_no, "MU5");
    }

    #[test]
    fn test_no_listings() {
        let extraction = parse_listings("<html><body>Verifying you are human</body></html>", &query(), URL, 5);
        assert_eq!(extraction, Extraction::default());
        assert_eq!(extraction.seen(), 0);
    }

    #[test]
    fn test_text_whitespace_is_collapsed() {
        let html = page(&[listing("\n   MU2871 \n", "China\n   Eastern", &[" 07:40 ", "10:35"], " ¥580 ")]);
        let flight = &parse_listings(&html, &query(), URL, 5).flights[0];
        assert_eq!(flight.flight_no, "MU2871");
        assert_eq!(flight.airline, "China Eastern");
        assert_eq!(flight.departure_time, "07:40");
        assert_eq!(flight.price, 580);
    }

    #[test]
    fn test_extraction_from_listings() {
        let extraction: Extraction = vec![
            Listing::Skipped(SkipReason::MissingPrice),
            Listing::Skipped(SkipReason::MissingAirline),
        ]
        .into_iter()
        .collect();
        assert!(extraction.flights.is_empty());
        assert_eq!(extraction.skipped, 2);
    }
}
