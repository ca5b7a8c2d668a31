//! Command-line interface definitions for the standings scraper.
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it. A `.env` file in the working directory is loaded before
//! parsing, so the usual setup is a `.env` holding the group URL and cookies.

use clap::Parser;

/// Command-line arguments for the standings scraper.
///
/// Raw values only; [`crate::config::Config`] validates and normalizes them.
///
/// # Examples
///
/// ```sh
/// # Scrape everything using cookies from .env
/// standings_scraper
///
/// # Scrape two contests into a custom directory
/// standings_scraper --output-dir ./snapshots --contest-ids 512345,512346
///
/// # Parse a saved standings page without touching the network
/// standings_scraper --parse-file standings.html --contest-id 512345
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Contest listing page of the group, e.g. https://codeforces.com/group/ABC123/contests
    #[arg(long, env = "GROUP_URL")]
    pub group_url: Option<String>,

    /// Value of the JSESSIONID cookie
    #[arg(long, env = "CODEFORCES_SESSION", hide_env_values = true)]
    pub session_cookie: Option<String>,

    /// Value of the 39ce7 cookie
    #[arg(long = "cookie-39ce7", env = "CODEFORCES_39CE7", hide_env_values = true)]
    pub cookie_39ce7: Option<String>,

    /// Value of the cf_clearance cookie (optional)
    #[arg(long, env = "CODEFORCES_CF_CLEARANCE", hide_env_values = true)]
    pub cf_clearance: Option<String>,

    /// Handle or email for password login (used when cookies are not set)
    #[arg(long, env = "CODEFORCES_USERNAME")]
    pub username: Option<String>,

    /// Password for password login
    #[arg(long, env = "CODEFORCES_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Directory receiving one contest_<id>.json per contest
    #[arg(short, long, env = "OUTPUT_DIR", default_value = "./data/")]
    pub output_dir: String,

    /// Comma-separated contest IDs to restrict the run to
    #[arg(long, env = "CONTEST_IDS")]
    pub contest_ids: Option<String>,

    /// Comma-separated contest IDs tagged as "weekly"
    #[arg(long, env = "WEEKLY_CONTEST_IDS")]
    pub weekly_contest_ids: Option<String>,

    /// Comma-separated contest IDs tagged as "battle"
    #[arg(long, env = "BATTLE_CONTEST_IDS")]
    pub battle_contest_ids: Option<String>,

    /// Attempts per page request
    #[arg(long, env = "MAX_RETRIES", default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,

    /// Seconds to wait between attempts of a failed request
    #[arg(long, env = "RETRY_DELAY", default_value_t = 2)]
    pub retry_delay: u64,

    /// Milliseconds to wait after each processed contest
    #[arg(long, env = "CONTEST_DELAY_MS", default_value_t = 1000)]
    pub contest_delay_ms: u64,

    /// Parse a saved standings page and print its snapshot instead of scraping
    #[arg(long)]
    pub parse_file: Option<String>,

    /// Contest ID to use with --parse-file
    #[arg(long, requires = "parse_file", default_value = "unknown")]
    pub contest_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "standings_scraper",
            "--group-url",
            "https://codeforces.com/group/ABC/contests",
            "--output-dir",
            "/tmp/out",
            "--contest-ids",
            "1,2",
        ]);

        assert_eq!(
            cli.group_url.as_deref(),
            Some("https://codeforces.com/group/ABC/contests")
        );
        assert_eq!(cli.output_dir, "/tmp/out");
        assert_eq!(cli.contest_ids.as_deref(), Some("1,2"));
    }

    #[test]
    fn test_cli_numeric_options() {
        let cli = Cli::parse_from([
            "standings_scraper",
            "--max-retries",
            "5",
            "--request-timeout",
            "10",
            "--retry-delay",
            "0",
            "--contest-delay-ms",
            "250",
        ]);

        assert_eq!(cli.max_retries, 5);
        assert_eq!(cli.request_timeout, 10);
        assert_eq!(cli.retry_delay, 0);
        assert_eq!(cli.contest_delay_ms, 250);
    }

    #[test]
    fn test_cli_rejects_zero_retries() {
        let res = Cli::try_parse_from(["standings_scraper", "--max-retries", "0"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_cli_parse_file_mode() {
        let cli = Cli::parse_from([
            "standings_scraper",
            "--parse-file",
            "page.html",
            "--contest-id",
            "777",
        ]);
        assert_eq!(cli.parse_file.as_deref(), Some("page.html"));
        assert_eq!(cli.contest_id, "777");
    }
}
