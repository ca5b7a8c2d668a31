//! HTML scrapers for the two page shapes the judge serves.
//!
//! | Page | Module | Produces |
//! |------|--------|----------|
//! | Group contest listing | [`contests`] | `Vec<Contest>` |
//! | Contest standings | [`standings`] | `ContestSnapshot` |
//!
//! Both are pure functions over an HTML string: no network, no filesystem.
//! They degrade instead of failing; anything unparseable is logged and
//! skipped at the smallest unit (link, row, cell).

pub mod contests;
pub mod standings;

use scraper::ElementRef;

/// Trimmed text content of an element, descendants included.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
