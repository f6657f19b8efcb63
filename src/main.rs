use chrono::Local;
use clap::Parser;
use flight_watch::app::App;
use flight_watch::cli::{Args, resolve_query_date};
use flight_watch::config::{Config, ScrapeMode};
use flight_watch::logging::setup_logging;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Nothing (not even logging) can be set up without a valid config.
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        "starting flight-watch"
    );

    let date = resolve_query_date(args.date, config.flight_date, Local::now().date_naive());
    let mode = if args.stub {
        ScrapeMode::Stub
    } else {
        config.scrape_mode
    };

    match App::new(config) {
        Ok(app) => {
            app.run(date, mode).await;
        }
        Err(e) => error!(error = ?e, "failed to initialize application"),
    }

    ExitCode::SUCCESS
}
