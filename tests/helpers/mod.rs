//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::post;
use chrono::NaiveDate;
use figment::Figment;
use figment::providers::Serialized;
use flight_watch::config::Config;
use flight_watch::flight::{FlightQuery, FlightRecord, HistoryRecord, PLATFORM};
use flight_watch::scrape::{Extraction, Extractor};
use serde_json::{Value, json};

pub const BOT_TOKEN: &str = "123456:test-token";
pub const CHAT_ID: &str = "-100200300";

pub fn query_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
}

/// Build a flight on the test date with the given number and price.
pub fn make_flight(flight_no: &str, price: u32) -> FlightRecord {
    FlightRecord {
        date: query_date(),
        flight_no: flight_no.to_owned(),
        airline: "China Eastern".to_owned(),
        departure_time: "07:40".to_owned(),
        arrival_time: "10:35".to_owned(),
        price,
        platform: PLATFORM.to_owned(),
        url: "https://flights.ctrip.com/booking/ntg-cgq-day-1.html?ddate1=2026-10-20".to_owned(),
    }
}

/// History entry captured `seq` minutes after midnight on the day before the test date.
pub fn make_history(seq: u32) -> HistoryRecord {
    let captured = NaiveDate::from_ymd_opt(2026, 10, 19)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::minutes(seq as i64);
    HistoryRecord {
        timestamp: captured,
        flight: make_flight(&format!("OLD{seq}"), 1000 + seq),
    }
}

/// Config rooted in `dir`, optionally pointing the notifier at a local Bot API.
pub fn test_config(dir: &Path, bot_api: Option<&str>, extra: Value) -> Config {
    let mut values = json!({
        "history_path": dir.join("flight_prices.json"),
        "screenshot_path": dir.join("error.png"),
        "notify_timeout": "2s",
    });
    if let Some(base) = bot_api {
        values["telegram_api_base"] = json!(base);
        values["telegram_bot_token"] = json!(BOT_TOKEN);
        values["telegram_chat_id"] = json!(CHAT_ID);
    }
    if let (Some(target), Value::Object(extra)) = (values.as_object_mut(), extra) {
        target.extend(extra);
    }

    Figment::new()
        .merge(Serialized::defaults(values))
        .extract()
        .expect("test config should be valid")
}

/// Extractor that returns a canned result without touching a browser.
pub struct FakeExtractor {
    extraction: Extraction,
    queries: Mutex<Vec<FlightQuery>>,
    closes: Arc<AtomicUsize>,
}

impl FakeExtractor {
    pub fn new(flights: Vec<FlightRecord>, skipped: usize) -> Self {
        Self {
            extraction: Extraction { flights, skipped },
            queries: Mutex::new(Vec::new()),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn queries(&self) -> Vec<FlightQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// Shared count of `close()` calls, still readable after the extractor is moved away.
    pub fn close_count(&self) -> CloseCount {
        CloseCount(self.closes.clone())
    }
}

#[derive(Clone)]
pub struct CloseCount(Arc<AtomicUsize>);

impl CloseCount {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, query: &FlightQuery) -> Extraction {
        self.queries.lock().unwrap().push(query.clone());
        self.extraction.clone()
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A request received by [`BotApi`].
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub path: String,
    pub body: Value,
}

/// Minimal stand-in for the Telegram Bot API, bound to an ephemeral local port.
#[derive(Clone)]
pub struct BotApi {
    pub base_url: String,
    received: Arc<Mutex<Vec<ReceivedMessage>>>,
}

#[derive(Clone)]
struct BotApiState {
    status: StatusCode,
    delay: Duration,
    received: Arc<Mutex<Vec<ReceivedMessage>>>,
}

impl BotApi {
    pub async fn spawn(status: StatusCode) -> Self {
        Self::spawn_with_delay(status, Duration::ZERO).await
    }

    pub async fn spawn_with_delay(status: StatusCode, delay: Duration) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = BotApiState {
            status,
            delay,
            received: received.clone(),
        };
        let router = Router::new()
            .route("/{*path}", post(send_message))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            received,
        }
    }

    pub fn received(&self) -> Vec<ReceivedMessage> {
        self.received.lock().unwrap().clone()
    }
}

async fn send_message(
    State(state): State<BotApiState>,
    uri: Uri,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.received.lock().unwrap().push(ReceivedMessage {
        path: uri.path().to_owned(),
        body,
    });
    tokio::time::sleep(state.delay).await;

    if state.status.is_success() {
        (state.status, Json(json!({ "ok": true, "result": { "message_id": 1 } })))
    } else {
        (
            state.status,
            Json(json!({ "ok": false, "description": "Bad Request: chat not found" })),
        )
    }
}

/// An address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
