//! Data models for contests and their parsed standings.
//!
//! - [`Contest`]: one entry discovered on the group's contest listing
//! - [`ContestSnapshot`]: the persisted result of parsing one standings page
//! - [`ParticipantRecord`] and [`Attempt`]: per-handle results inside a snapshot
//!
//! Field names serialize in camelCase to keep the JSON schema stable for
//! downstream consumers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A contest discovered on the group listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contest {
    /// Numeric contest ID, kept as a string.
    pub id: String,
    /// Human-readable contest name.
    pub title: String,
    /// Absolute URL of the contest's standings page.
    pub url: String,
}

/// Outcome of a participant's attempts on one problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptStatus {
    #[serde(rename = "AC")]
    Accepted,
    #[serde(rename = "WA")]
    WrongAnswer,
    #[serde(rename = "PENDING")]
    Pending,
}

/// One entry in a participant's solve timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Problem label as shown in the standings header (e.g. `"A"`).
    pub problem: String,
    /// Minutes from contest start to acceptance; 0 when not accepted.
    pub time: u32,
    pub status: AttemptStatus,
    /// Reserved; always empty for now.
    pub tags: Vec<String>,
}

impl Attempt {
    pub fn new(problem: impl Into<String>, time: u32, status: AttemptStatus) -> Self {
        Self {
            problem: problem.into(),
            time,
            status,
            tags: Vec::new(),
        }
    }
}

/// A single participant's row from the standings table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub rank: u32,
    /// Judge-reported solved count; never recomputed from the timeline.
    pub solved: u32,
    /// Number of non-empty, non-placeholder problem cells.
    pub attempted: u32,
    pub solve_timeline: Vec<Attempt>,
}

/// Contest classification used to tag snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestType {
    Weekly,
    Battle,
}

impl fmt::Display for ContestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContestType::Weekly => f.write_str("weekly"),
            ContestType::Battle => f.write_str("battle"),
        }
    }
}

/// Parsed standings for one contest; the unit of persistence.
///
/// # JSON Schema
///
/// ```text
/// {
///   "contestId": "123456",
///   "title": "Weekly Round 4",
///   "participants": { "<handle>": { "rank", "solved", "attempted", "solveTimeline" } },
///   "type": "weekly"            // only when the contest is classified
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestSnapshot {
    pub contest_id: String,
    pub title: String,
    pub participants: BTreeMap<String, ParticipantRecord>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub contest_type: Option<ContestType>,
}

impl ContestSnapshot {
    /// A snapshot with no participants.
    pub fn empty(contest_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            contest_id: contest_id.into(),
            title: title.into(),
            participants: BTreeMap::new(),
            contest_type: None,
        }
    }
}
