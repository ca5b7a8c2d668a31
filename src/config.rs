//! Validated run configuration.
//!
//! [`Config`] is built once from the parsed [`Cli`] and handed by reference
//! to the session, the pipeline and the writers.

use crate::cli::Cli;
use crate::models::ContestType;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Problems that make the configuration unusable. Reported before any
/// network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GROUP_URL is required")]
    MissingGroupUrl,

    #[error("GROUP_URL {url:?} is not a valid URL: {source}")]
    InvalidGroupUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(
        "authentication required: provide CODEFORCES_SESSION + CODEFORCES_39CE7 cookies, or CODEFORCES_USERNAME + CODEFORCES_PASSWORD"
    )]
    MissingAuth,
}

/// How the session proves its identity.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Cookies {
        session: String,
        cookie_39ce7: String,
        cf_clearance: Option<String>,
    },
    Password {
        username: String,
        password: String,
    },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Cookies { cf_clearance, .. } => f
                .debug_struct("Cookies")
                .field("cf_clearance", &cf_clearance.is_some())
                .finish_non_exhaustive(),
            Auth::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub group_url: Url,
    /// Origin of `group_url`; login, logout-check and standings URLs hang off it.
    pub base_url: Url,
    pub group_id: Option<String>,
    pub auth: Auth,
    pub output_dir: PathBuf,
    /// When set, only these contests are scraped.
    pub contest_ids: Option<Vec<String>>,
    pub weekly_ids: HashSet<String>,
    pub battle_ids: HashSet<String>,
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub retry_delay: Duration,
    pub contest_delay: Duration,
}

impl Config {
    /// Classify a contest by the configured weekly/battle sets. Weekly wins
    /// when an ID appears in both.
    pub fn contest_type(&self, contest_id: &str) -> Option<ContestType> {
        if self.weekly_ids.contains(contest_id) {
            Some(ContestType::Weekly)
        } else if self.battle_ids.contains(contest_id) {
            Some(ContestType::Battle)
        } else {
            None
        }
    }
}

impl TryFrom<&Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let raw_url = non_empty(&cli.group_url).ok_or(ConfigError::MissingGroupUrl)?;
        let group_url = Url::parse(raw_url).map_err(|source| ConfigError::InvalidGroupUrl {
            url: raw_url.to_string(),
            source,
        })?;
        let base_url = group_url
            .join("/")
            .map_err(|source| ConfigError::InvalidGroupUrl {
                url: raw_url.to_string(),
                source,
            })?;
        let group_id = extract_group_id(&group_url);

        let auth = match (
            non_empty(&cli.session_cookie),
            non_empty(&cli.cookie_39ce7),
            non_empty(&cli.username),
            non_empty(&cli.password),
        ) {
            (Some(session), Some(cookie_39ce7), _, _) => Auth::Cookies {
                session: session.to_string(),
                cookie_39ce7: cookie_39ce7.to_string(),
                cf_clearance: non_empty(&cli.cf_clearance).map(str::to_string),
            },
            (_, _, Some(username), Some(password)) => Auth::Password {
                username: username.to_string(),
                password: password.to_string(),
            },
            _ => return Err(ConfigError::MissingAuth),
        };

        let contest_ids = cli
            .contest_ids
            .as_deref()
            .map(parse_id_list)
            .filter(|ids| !ids.is_empty());

        Ok(Config {
            group_url,
            base_url,
            group_id,
            auth,
            output_dir: PathBuf::from(&cli.output_dir),
            contest_ids,
            weekly_ids: parse_id_list(cli.weekly_contest_ids.as_deref().unwrap_or(""))
                .into_iter()
                .collect(),
            battle_ids: parse_id_list(cli.battle_contest_ids.as_deref().unwrap_or(""))
                .into_iter()
                .collect(),
            max_retries: cli.max_retries,
            request_timeout: Duration::from_secs(cli.request_timeout),
            retry_delay: Duration::from_secs(cli.retry_delay),
            contest_delay: Duration::from_millis(cli.contest_delay_ms),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Split a comma-separated ID list, trimming entries and dropping empties.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// The segment after `/group/` in a group URL, e.g. `ABC123` for
/// `https://codeforces.com/group/ABC123/contests`.
pub fn extract_group_id(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    segments.find(|s| *s == "group")?;
    segments
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
