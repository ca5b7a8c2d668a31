//! # Standings Scraper
//!
//! Scrapes contest standings from a private Codeforces group and writes one
//! JSON snapshot per contest for later analysis of participant performance.
//!
//! ## Usage
//!
//! ```sh
//! # GROUP_URL and cookies come from the environment or a .env file
//! standings_scraper --output-dir ./data
//! ```
//!
//! ## Architecture
//!
//! A single sequential pipeline:
//! 1. **Authentication**: session cookies (or the password form) are verified
//! 2. **Listing**: contest links are collected from the group's contests page
//! 3. **Standings**: each new contest's standings page is fetched and parsed
//! 4. **Output**: one `contest_<id>.json` per contest; existing files are skipped

use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod session;
mod utils;

use cli::Cli;
use config::Config;
use outputs::json;
use pipeline::RunSummary;
use session::JudgeSession;
use utils::ensure_writable_dir;

const LISTED_FILES: usize = 10;

#[tokio::main]
async fn main() -> ExitCode {
    // Variables already in the environment take precedence over .env.
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load .env"),
    }

    let args = Cli::parse();

    if let Some(path) = &args.parse_file {
        return parse_offline(path, &args.contest_id).await;
    }

    let start_time = std::time::Instant::now();
    info!("standings_scraper starting up");

    let config = match Config::try_from(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration error");
            error!("Set the missing values in the environment or a .env file");
            return ExitCode::FAILURE;
        }
    };
    info!(
        output_dir = %config.output_dir.display(),
        group_url = %config.group_url,
        group_id = ?config.group_id,
        "Configuration loaded"
    );

    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return ExitCode::FAILURE;
    }

    let mut session = match JudgeSession::new(&config) {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = session.login().await {
        error!(error = %e, "Failed to authenticate. Please check your cookies/credentials.");
        error!("To get cookies from your browser:");
        error!("1. Login to Codeforces in your browser");
        error!("2. Open DevTools (F12)");
        error!("3. Go to Application/Storage -> Cookies -> codeforces.com");
        error!("4. Copy the values of the 'JSESSIONID' and '39ce7' cookies");
        error!("5. Set CODEFORCES_SESSION and CODEFORCES_39CE7 in your .env file");
        return ExitCode::FAILURE;
    }
    debug!(logged_in = session.is_logged_in(), "Session ready");

    let summary = tokio::select! {
        res = pipeline::run(&session, &config) => match res {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "Run aborted");
                return ExitCode::FAILURE;
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Scraping interrupted by user");
            println!("\nScraping interrupted by user");
            return ExitCode::SUCCESS;
        }
    };

    print_summary(&summary, &config.output_dir).await;

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
    ExitCode::SUCCESS
}

/// Parse a saved standings page and print its snapshot.
async fn parse_offline(path: &str, contest_id: &str) -> ExitCode {
    let html = match tokio::fs::read_to_string(path).await {
        Ok(html) => html,
        Err(e) => {
            error!(%path, error = %e, "Failed to read standings file");
            return ExitCode::FAILURE;
        }
    };

    let snapshot = scrapers::standings::parse_standings(&html, contest_id);
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Failed to serialize snapshot");
            ExitCode::FAILURE
        }
    }
}

async fn print_summary(summary: &RunSummary, output_dir: &Path) {
    let rule = "=".repeat(60);
    println!();
    println!("{rule}");
    println!("Scraping Complete!");
    println!("{rule}");
    println!("Listed contests: {}", summary.listed);
    println!("Already scraped: {}", summary.skipped);
    println!("Successful: {}", summary.succeeded);
    if summary.failed > 0 {
        println!("Failed: {}", summary.failed);
    }
    println!("Output directory: {}", output_dir.display());
    println!("{rule}");

    match json::list_snapshot_files(output_dir).await {
        Ok(files) => {
            println!("\n{} JSON files in output directory:", files.len());
            for name in files.iter().take(LISTED_FILES) {
                println!("  - {name}");
            }
            if files.len() > LISTED_FILES {
                println!("  ... and {} more", files.len() - LISTED_FILES);
            }
        }
        Err(e) => warn!(error = %e, "Could not list output directory"),
    }
    println!();
}
