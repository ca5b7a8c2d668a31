//! Contest standings scraper.
//!
//! Turns a standings page into a [`ContestSnapshot`]. The table layout is
//! positional:
//!
//! | Cell | Content |
//! |------|---------|
//! | 0 | rank |
//! | 1 | contestant (handle link, or bare text) |
//! | 2 | solved count |
//! | 3 | penalty / points (ignored) |
//! | 4.. | one cell per problem, in header order |
//!
//! Problem cells read `+MM:SS`-style times for accepted problems, `-N` for
//! rejected attempts and `?` for pending judgement.
//!
//! Parsing never fails: a page without a standings table yields an empty
//! snapshot, a broken row is logged and dropped, and a broken number becomes 0.

use super::element_text;
use crate::models::{Attempt, AttemptStatus, ContestSnapshot, ParticipantRecord};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("static selector"));
static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.standings").expect("static selector"));
static PROBLEM_HEADER_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("th.standings-cell_problem-header").expect("static selector")
});
// html5ever lowercases attribute names, so `participantId` lands here.
static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr[participantid]").expect("static selector"));
static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("static selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("static selector"));

const FIRST_PROBLEM_CELL: usize = 4;
const PLACEHOLDER_CELL: &str = "--";

/// Why a participant row was dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("row has {0} cells, expected at least 3")]
    TooFewCells(usize),
    #[error("row has no contestant handle")]
    MissingHandle,
}

/// Parse a standings page.
#[instrument(level = "info", skip_all, fields(%contest_id))]
pub fn parse_standings(html: &str, contest_id: &str) -> ContestSnapshot {
    let document = Html::parse_document(html);
    let title = page_title(&document, contest_id);

    let Some(table) = document.select(&TABLE_SELECTOR).next() else {
        warn!(%contest_id, "No standings table found");
        return ContestSnapshot::empty(contest_id, title);
    };

    let problems: Vec<String> = table
        .select(&PROBLEM_HEADER_SELECTOR)
        .filter_map(|header| header.select(&LINK_SELECTOR).next())
        .map(|link| element_text(&link))
        .collect();
    debug!(?problems, "Problem labels");

    let mut snapshot = ContestSnapshot::empty(contest_id, title);
    for (index, row) in table.select(&ROW_SELECTOR).enumerate() {
        match parse_row(&row, &problems) {
            Ok((handle, record)) => {
                snapshot.participants.insert(handle, record);
            }
            Err(RowError::MissingHandle) => {
                debug!(row = index, "Skipping row without handle");
            }
            Err(e) => {
                warn!(row = index, error = %e, "Error parsing participant row; skipping");
            }
        }
    }

    info!(
        participants = snapshot.participants.len(),
        problems = problems.len(),
        "Parsed standings"
    );
    snapshot
}

/// Text of `<title>` up to the site-name suffix.
fn page_title(document: &Html, contest_id: &str) -> String {
    match document.select(&TITLE_SELECTOR).next() {
        Some(title) => {
            let text = element_text(&title);
            text.split(" - ").next().unwrap_or_default().trim().to_string()
        }
        None => format!("Contest {contest_id}"),
    }
}

fn parse_row(
    row: &ElementRef<'_>,
    problems: &[String],
) -> Result<(String, ParticipantRecord), RowError> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELL_SELECTOR).collect();
    if cells.len() < 3 {
        return Err(RowError::TooFewCells(cells.len()));
    }

    let handle = contestant_handle(&cells[1])?;
    let mut record = ParticipantRecord {
        rank: parse_count(&element_text(&cells[0])),
        solved: parse_count(&element_text(&cells[2])),
        ..Default::default()
    };

    let problem_cells = cells.iter().skip(FIRST_PROBLEM_CELL);
    for (cell, problem) in problem_cells.zip(problems) {
        let text = element_text(cell);
        if text.is_empty() || text == PLACEHOLDER_CELL {
            continue;
        }
        record.attempted += 1;
        match classify_cell(&text) {
            Some((status, time)) => record
                .solve_timeline
                .push(Attempt::new(problem.as_str(), time, status)),
            None => debug!(%handle, %problem, cell = %text, "Unrecognized problem cell"),
        }
    }

    Ok((handle, record))
}

/// Handle from the contestant cell: the first link's text, falling back to
/// the cell text. Trailing `#` markers are stripped.
fn contestant_handle(cell: &ElementRef<'_>) -> Result<String, RowError> {
    let raw = match cell.select(&LINK_SELECTOR).next() {
        Some(link) => element_text(&link),
        None => element_text(cell),
    };
    let handle = raw.trim_end_matches('#');
    if handle.is_empty() {
        return Err(RowError::MissingHandle);
    }
    Ok(handle.to_string())
}

/// Integer cell value; anything unparseable counts as 0.
fn parse_count(text: &str) -> u32 {
    text.trim().parse().unwrap_or(0)
}

/// Classify a non-empty problem cell into an outcome and solve time.
///
/// Returns `None` for text that matches none of the known forms.
pub fn classify_cell(text: &str) -> Option<(AttemptStatus, u32)> {
    if let Some(rest) = text.strip_prefix('+') {
        Some((AttemptStatus::Accepted, parse_solve_time(rest).unwrap_or(0)))
    } else if text.starts_with('-') {
        Some((AttemptStatus::WrongAnswer, 0))
    } else if text == "?" {
        Some((AttemptStatus::Pending, 0))
    } else {
        None
    }
}

/// `"01:23"` → 83. Exactly two integer parts are required.
fn parse_solve_time(text: &str) -> Option<u32> {
    let (first, second) = text.split_once(':')?;
    if second.contains(':') {
        return None;
    }
    let first: u32 = first.trim().parse().ok()?;
    let second: u32 = second.trim().parse().ok()?;
    first.checked_mul(60)?.checked_add(second)
}
