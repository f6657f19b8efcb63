use crate::config::{Config, ScrapeMode};
use crate::flight::{FlightQuery, FlightRecord, HistoryRecord};
use crate::history::HistoryStore;
use crate::notify::{
    Delivery, NO_FLIGHTS_MESSAGE, TEST_MESSAGE, TelegramNotifier, format_failure,
    format_lowest_fare,
};
use crate::scrape::{BrowserExtractor, ExtractError, Extractor};
use crate::select::lowest_price;
use crate::utils::fmt_duration;
use anyhow::Context;
use chrono::NaiveDate;
use std::future::Future;
use std::time::Instant;
use tracing::{error, info, warn};

/// What a single run ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A priced flight was found, recorded, and announced.
    Found {
        flight: FlightRecord,
        delivery: Delivery,
    },
    /// The page yielded no flight with a usable price.
    NoFlights { delivery: Delivery },
    /// The run could not get as far as extraction.
    Failed { delivery: Delivery },
    /// Stub mode: only the test message was sent.
    TestMessage { delivery: Delivery },
}

/// Main application struct holding the components of a run.
pub struct App {
    config: Config,
    history: HistoryStore,
    notifier: TelegramNotifier,
}

impl App {
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let history = HistoryStore::new(config.history_path.clone(), config.history_capacity);
        let notifier = TelegramNotifier::from_config(&config)?;

        if !notifier.is_configured() {
            warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID missing, notifications are disabled");
        }

        Ok(Self {
            config,
            history,
            notifier,
        })
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Build the query for `date` on the configured route.
    pub fn query(&self, date: NaiveDate) -> FlightQuery {
        FlightQuery::new(&self.config.origin, &self.config.destination, date)
    }

    /// Run once in the given mode. Never fails: every error is logged and, where
    /// possible, reported through the notifier.
    pub async fn run(&self, date: NaiveDate, mode: ScrapeMode) -> RunOutcome {
        self.run_with(date, mode, || BrowserExtractor::connect(&self.config)).await
    }

    /// [`App::run`] with the extractor opened by `connect` instead of a WebDriver session.
    ///
    /// `connect` is only called in live mode. An extractor it returns is closed exactly once,
    /// whatever the outcome of the run.
    pub async fn run_with<E, F, Fut>(
        &self,
        date: NaiveDate,
        mode: ScrapeMode,
        connect: F,
    ) -> RunOutcome
    where
        E: Extractor,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<E, ExtractError>>,
    {
        let start = Instant::now();
        let query = self.query(date);

        info!(
            date = %query.date,
            origin = %query.origin,
            destination = %query.destination,
            mode = ?mode,
            "flight-watch run starting"
        );

        let outcome = match mode {
            ScrapeMode::Stub => RunOutcome::TestMessage {
                delivery: self.notifier.send(TEST_MESSAGE).await,
            },
            ScrapeMode::Live => self.run_live(&query, connect).await,
        };

        info!(
            duration = fmt_duration(start.elapsed()),
            outcome = outcome.label(),
            "flight-watch run complete"
        );
        outcome
    }

    async fn run_live<E, F, Fut>(&self, query: &FlightQuery, connect: F) -> RunOutcome
    where
        E: Extractor,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<E, ExtractError>>,
    {
        let extractor = match connect().await.context("Failed to start browser session") {
            Ok(extractor) => extractor,
            Err(e) => return self.report_failure(&e).await,
        };

        let outcome = self.process(&extractor, query).await;
        extractor.close().await;
        outcome
    }

    /// Extract, select, persist, and notify using an already-open extractor.
    ///
    /// The caller owns the extractor and is responsible for closing it.
    pub async fn process(&self, extractor: &dyn Extractor, query: &FlightQuery) -> RunOutcome {
        let extraction = extractor.extract(query).await;
        info!(
            parsed = extraction.flights.len(),
            skipped = extraction.skipped,
            "flights extracted"
        );

        let Some(lowest) = lowest_price(&extraction.flights).cloned() else {
            warn!("no priced flights found");
            return RunOutcome::NoFlights {
                delivery: self.notifier.send(NO_FLIGHTS_MESSAGE).await,
            };
        };

        info!(
            date = %lowest.date,
            flight_no = %lowest.flight_no,
            airline = %lowest.airline,
            departure = %lowest.departure_time,
            arrival = %lowest.arrival_time,
            price = lowest.price,
            "lowest fare found"
        );

        if let Err(e) = self.history.append(HistoryRecord::now(lowest.clone())).await {
            error!(error = ?e, path = %self.history.path().display(), "failed to save history");
        }

        let delivery = self.notifier.send(&format_lowest_fare(&lowest)).await;
        RunOutcome::Found {
            flight: lowest,
            delivery,
        }
    }

    async fn report_failure(&self, err: &anyhow::Error) -> RunOutcome {
        error!(error = ?err, "flight-watch run failed");
        RunOutcome::Failed {
            delivery: self.notifier.send(&format_failure(err)).await,
        }
    }
}

impl RunOutcome {
    fn label(&self) -> &'static str {
        match self {
            RunOutcome::Found { .. } => "found",
            RunOutcome::NoFlights { .. } => "no_flights",
            RunOutcome::Failed { .. } => "failed",
            RunOutcome::TestMessage { .. } => "test_message",
        }
    }

    pub fn delivery(&self) -> Delivery {
        match self {
            RunOutcome::Found { delivery, .. }
            | RunOutcome::NoFlights { delivery }
            | RunOutcome::Failed { delivery }
            | RunOutcome::TestMessage { delivery } => *delivery,
        }
    }
}
