pub mod app;
pub mod cli;
pub mod config;
pub mod flight;
pub mod fmt;
pub mod history;
pub mod logging;
pub mod notify;
pub mod scrape;
pub mod select;
pub mod utils;
