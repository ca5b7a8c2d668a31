//! Sequential scrape run: listing → contests → standings → snapshot files.
//!
//! Contests are processed one at a time with a fixed pause between them.
//! A contest that cannot be fetched or written is counted as failed and the
//! run moves on; nothing is written for it. An unreadable output directory
//! stops the run before any request, since existing snapshots would
//! otherwise be overwritten.

use crate::config::Config;
use crate::models::Contest;
use crate::outputs::json::{self, PersistError};
use crate::scrapers::{contests, standings};
use crate::session::PageSource;
use crate::utils::truncate_for_log;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Contests found on the listing after the allowlist filter.
    pub listed: usize,
    /// Contests skipped because a snapshot already exists.
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Failures that stop the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot read output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ContestError {
    #[error("failed to fetch standings for contest {0}")]
    Fetch(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Scrape every listed contest that has no snapshot yet.
#[instrument(level = "info", skip_all, fields(group_url = %config.group_url))]
pub async fn run<S: PageSource>(source: &S, config: &Config) -> Result<RunSummary, RunError> {
    let mut summary = RunSummary::default();

    let existing = json::load_existing(&config.output_dir)
        .await
        .map_err(|source| RunError::OutputDir {
            path: config.output_dir.clone(),
            source,
        })?;

    let contests = list_contests(source, config).await;
    summary.listed = contests.len();
    if contests.is_empty() {
        warn!("No contests found to scrape");
        return Ok(summary);
    }

    let (done, pending): (Vec<Contest>, Vec<Contest>) = contests
        .into_iter()
        .partition(|c| existing.contains(&c.id));
    summary.skipped = done.len();
    if !done.is_empty() {
        info!(count = done.len(), "Skipping already scraped contests");
    }
    if pending.is_empty() {
        info!("All contests already scraped");
        return Ok(summary);
    }

    info!(count = pending.len(), "Starting to scrape contests");
    let progress = if should_show_progress(io::stderr().is_terminal(), is_dumb_terminal()) {
        ProgressBar::new(pending.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} contests {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for (i, contest) in pending.iter().enumerate() {
        progress.set_message(contest.id.clone());
        match scrape_contest(source, config, contest).await {
            Ok(path) => {
                debug!(path = %path.display(), "Contest done");
                summary.succeeded += 1;
            }
            Err(e) => {
                error!(contest_id = %contest.id, error = %e, "Contest failed");
                summary.failed += 1;
            }
        }
        progress.inc(1);

        if i + 1 < pending.len() && !config.contest_delay.is_zero() {
            sleep(config.contest_delay).await;
        }
    }
    progress.finish_and_clear();

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        "Run complete"
    );
    Ok(summary)
}

/// The bar shares stderr with the log lines, so it is only drawn on a real
/// terminal.
fn should_show_progress(stderr_is_terminal: bool, dumb_terminal: bool) -> bool {
    stderr_is_terminal && !dumb_terminal
}

fn is_dumb_terminal() -> bool {
    std::env::var("TERM").is_ok_and(|term| term == "dumb")
}

/// Fetch the listing and apply the optional allowlist.
async fn list_contests<S: PageSource>(source: &S, config: &Config) -> Vec<Contest> {
    info!(url = %config.group_url, "Fetching contest list");
    let Some(html) = source.get_page(config.group_url.as_str()).await else {
        error!("Failed to fetch contest list");
        return Vec::new();
    };

    let contests =
        contests::extract_contest_list(&html, &config.base_url, config.group_id.as_deref());
    if contests.is_empty() {
        debug!(preview = %truncate_for_log(&html, 300), "Listing page had no contest links");
    }

    let Some(allowed) = &config.contest_ids else {
        return contests;
    };

    let missing = allowed
        .iter()
        .filter(|id| !contests.iter().any(|c| &c.id == *id))
        .join(",");
    if !missing.is_empty() {
        warn!(%missing, "Requested contests not present on the listing");
    }

    let filtered: Vec<Contest> = contests
        .into_iter()
        .filter(|c| allowed.contains(&c.id))
        .collect();
    info!(count = filtered.len(), "Filtered to specified contests");
    filtered
}

/// Fetch, parse, tag and persist one contest.
#[instrument(level = "info", skip_all, fields(contest_id = %contest.id))]
pub async fn scrape_contest<S: PageSource>(
    source: &S,
    config: &Config,
    contest: &Contest,
) -> Result<PathBuf, ContestError> {
    info!(title = %contest.title, "Scraping contest");
    let html = source
        .get_page(&contest.url)
        .await
        .ok_or_else(|| ContestError::Fetch(contest.id.clone()))?;

    let mut snapshot = standings::parse_standings(&html, &contest.id);
    snapshot.contest_type = config.contest_type(&contest.id);

    Ok(json::write_snapshot(&snapshot, &config.output_dir).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Auth;
    use crate::models::{ContestSnapshot, ContestType};
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;
    use tempfile::TempDir;
    use url::Url;

    /// In-memory pages keyed by URL; records every request.
    #[derive(Default)]
    struct FakeSource {
        pages: HashMap<String, String>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }
    }

    impl PageSource for FakeSource {
        async fn get_page(&self, url: &str) -> Option<String> {
            self.requests.borrow_mut().push(url.to_string());
            self.pages.get(url).cloned()
        }
    }

    const LISTING_URL: &str = "https://codeforces.com/group/G/contests";

    fn config(dir: &TempDir) -> Config {
        Config {
            group_url: Url::parse(LISTING_URL).unwrap(),
            base_url: Url::parse("https://codeforces.com/").unwrap(),
            group_id: Some("G".to_string()),
            auth: Auth::Cookies {
                session: "s".to_string(),
                cookie_39ce7: "c".to_string(),
                cf_clearance: None,
            },
            output_dir: dir.path().to_path_buf(),
            contest_ids: None,
            weekly_ids: HashSet::from(["1".to_string()]),
            battle_ids: HashSet::new(),
            max_retries: 1,
            request_timeout: Duration::from_secs(1),
            retry_delay: Duration::ZERO,
            contest_delay: Duration::ZERO,
        }
    }

    fn standings_url(id: &str) -> String {
        format!("https://codeforces.com/group/G/contest/{id}/standings")
    }

    const LISTING: &str = r#"<table>
        <tr><td>Weekly 1 <a href="/group/G/contest/1">Enter</a></td></tr>
        <tr><td>Battle 2 <a href="/group/G/contest/2">Enter</a></td></tr>
        <tr><td>Round 3 <a href="/group/G/contest/3">Enter</a></td></tr>
    </table>"#;

    const STANDINGS: &str = r#"<html><head><title>Weekly 1 - Codeforces</title></head><body>
        <table class="standings">
          <tr><th>#</th><th>Who</th><th>=</th><th>P</th>
              <th class="standings-cell_problem-header"><a>A</a></th></tr>
          <tr participantid="1"><td>1</td><td><a>alice</a></td><td>1</td><td>5</td><td>+00:05</td></tr>
        </table></body></html>"#;

    fn read_snapshot(dir: &TempDir, id: &str) -> ContestSnapshot {
        let text = std::fs::read_to_string(json::snapshot_path(dir.path(), id)).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_run_scrapes_and_tags_contests() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::default()
            .with(LISTING_URL, LISTING)
            .with(&standings_url("1"), STANDINGS)
            .with(&standings_url("2"), STANDINGS);

        let summary = run(&source, &config(&dir)).await.unwrap();
        assert_eq!(
            summary,
            RunSummary {
                listed: 3,
                skipped: 0,
                succeeded: 2,
                failed: 1,
            }
        );

        let first = read_snapshot(&dir, "1");
        assert_eq!(first.contest_type, Some(ContestType::Weekly));
        assert_eq!(first.participants["alice"].solve_timeline[0].time, 5);
        assert_eq!(read_snapshot(&dir, "2").contest_type, None);
        assert!(!json::snapshot_path(dir.path(), "3").exists());
    }

    #[tokio::test]
    async fn test_run_skips_existing_snapshots() {
        let dir = TempDir::new().unwrap();
        std::fs::write(json::snapshot_path(dir.path(), "1"), "{}").unwrap();
        let source = FakeSource::default()
            .with(LISTING_URL, LISTING)
            .with(&standings_url("2"), STANDINGS)
            .with(&standings_url("3"), STANDINGS);

        let summary = run(&source, &config(&dir)).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.succeeded, 2);
        assert!(!source.requests.borrow().contains(&standings_url("1")));
        assert_eq!(
            std::fs::read_to_string(json::snapshot_path(dir.path(), "1")).unwrap(),
            "{}"
        );
    }

    #[tokio::test]
    async fn test_run_applies_allowlist() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.contest_ids = Some(vec!["2".to_string(), "404".to_string()]);
        let source = FakeSource::default()
            .with(LISTING_URL, LISTING)
            .with(&standings_url("2"), STANDINGS);

        let summary = run(&source, &config).await.unwrap();
        assert_eq!(summary.listed, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(
            *source.requests.borrow(),
            vec![LISTING_URL.to_string(), standings_url("2")]
        );
    }

    #[tokio::test]
    async fn test_run_without_listing_is_empty() {
        let dir = TempDir::new().unwrap();
        let summary = run(&FakeSource::default(), &config(&dir)).await.unwrap();
        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test]
    async fn test_run_counts_write_failure_and_continues() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(json::staging_path(dir.path(), "1")).unwrap();
        let source = FakeSource::default()
            .with(LISTING_URL, LISTING)
            .with(&standings_url("1"), STANDINGS)
            .with(&standings_url("2"), STANDINGS)
            .with(&standings_url("3"), STANDINGS);

        let summary = run(&source, &config(&dir)).await.unwrap();
        assert_eq!(
            summary,
            RunSummary {
                listed: 3,
                skipped: 0,
                succeeded: 2,
                failed: 1,
            }
        );
        assert!(!json::snapshot_path(dir.path(), "1").exists());
        assert!(json::snapshot_path(dir.path(), "3").exists());
    }

    #[tokio::test]
    async fn test_run_stops_when_output_dir_unreadable() {
        let dir = TempDir::new().unwrap();
        let not_a_dir = dir.path().join("snapshots");
        std::fs::write(&not_a_dir, "").unwrap();
        let mut config = config(&dir);
        config.output_dir = not_a_dir;
        let source = FakeSource::default().with(LISTING_URL, LISTING);

        let res = run(&source, &config).await;
        assert!(matches!(res, Err(RunError::OutputDir { .. })));
        assert!(source.requests.borrow().is_empty());
    }

    #[test]
    fn test_progress_only_on_real_terminal() {
        assert!(should_show_progress(true, false));
        assert!(!should_show_progress(false, false));
        assert!(!should_show_progress(true, true));
    }

    #[tokio::test]
    async fn test_scrape_contest_fetch_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let contest = Contest {
            id: "9".to_string(),
            title: "Nine".to_string(),
            url: standings_url("9"),
        };
        let res = scrape_contest(&FakeSource::default(), &config(&dir), &contest).await;
        assert!(matches!(res, Err(ContestError::Fetch(id)) if id == "9"));
        assert!(!json::snapshot_path(dir.path(), "9").exists());
    }
}
