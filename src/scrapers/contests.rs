//! Contest listing scraper.
//!
//! Walks every hyperlink on a group's contests page and keeps the ones that
//! point at a contest root (`/contest/<id>` or `/group/<g>/contest/<id>`).
//! Links into a contest's sub-pages (virtual participation, standings,
//! problem set) are ignored. The first link to a given contest wins, so the
//! output order follows the page.

use crate::models::Contest;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// Captures whatever follows the first `/contest/` up to the next separator.
static CONTEST_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/contest/([^/?#]*)").expect("static regex"));

const EXCLUDED_SUBPATHS: [&str; 3] = ["/virtual", "/standings", "/problems"];

/// Extract the contests linked from a listing page.
///
/// # Arguments
///
/// * `html` - Listing page body
/// * `base_url` - Service origin used to build standings URLs
/// * `group_id` - Group identifier; when absent, public contest URLs are built
#[instrument(level = "info", skip_all, fields(group_id = ?group_id))]
pub fn extract_contest_list(html: &str, base_url: &Url, group_id: Option<&str>) -> Vec<Contest> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut contests = Vec::new();

    for link in document.select(&LINK_SELECTOR) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(id) = contest_id_from_href(href) else {
            continue;
        };
        if !seen.insert(id.to_string()) {
            continue;
        }

        let url = match standings_url(base_url, group_id, id) {
            Ok(url) => url,
            Err(e) => {
                warn!(%href, error = %e, "Error building standings URL; skipping link");
                continue;
            }
        };

        let title = enclosing_cell_title(&link).unwrap_or_else(|| format!("Contest {id}"));
        debug!(%id, %title, "Found contest link");
        contests.push(Contest {
            id: id.to_string(),
            title,
            url,
        });
    }

    info!(count = contests.len(), "Found contests");
    contests
}

/// Numeric contest ID of a link to a contest root, or `None` for anything
/// else (non-contest links, sub-page links, non-numeric IDs).
pub fn contest_id_from_href(href: &str) -> Option<&str> {
    if EXCLUDED_SUBPATHS.iter().any(|p| href.contains(p)) {
        return None;
    }
    let id = CONTEST_ID_RE.captures(href)?.get(1)?.as_str();
    (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(id)
}

/// Standings page URL for a contest, inside the group when one is given.
pub fn standings_url(
    base_url: &Url,
    group_id: Option<&str>,
    contest_id: &str,
) -> Result<String, url::ParseError> {
    let path = match group_id {
        Some(group) => format!("/group/{group}/contest/{contest_id}/standings"),
        None => format!("/contest/{contest_id}/standings"),
    };
    Ok(base_url.join(&path)?.to_string())
}

/// Leading text of the nearest `<td>` around the link, minus the "Enter"
/// button label.
fn enclosing_cell_title(link: &ElementRef<'_>) -> Option<String> {
    let cell = link
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "td")?;
    let first = cell.text().map(str::trim).find(|t| !t.is_empty())?;
    let title = first.replace("Enter »", "").replace("Enter", "");
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}
