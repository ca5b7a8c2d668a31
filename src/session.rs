//! Authenticated HTTP session against the judge.
//!
//! [`JudgeSession`] owns a cookie-carrying `reqwest` client. It logs in once
//! (session cookies preferred, password form as fallback) and then serves
//! pages through [`PageSource::get_page`], which retries failed requests.
//!
//! # Retry Strategy
//!
//! - Up to `max_retries` attempts per page
//! - HTTP 200 returns the body immediately
//! - HTTP 403 gives up at once: the session is no longer authorized
//! - Any other status, a transport error or an unreadable body is retried
//!   after a fixed `retry_delay`
//! - Exhaustion yields `None`; callers skip the page

use crate::config::{Auth, Config};
use once_cell::sync::Lazy;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

static CSRF_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"input[name="csrf_token"]"#).expect("static selector"));

/// Anything that can hand out page bodies by URL.
///
/// `None` means the page could not be retrieved and should be skipped.
pub trait PageSource {
    async fn get_page(&self, url: &str) -> Option<String>;
}

/// Reasons a login attempt is rejected.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cookies are invalid or expired (no logout link on {url})")]
    CookiesRejected { url: String },

    #[error("login page returned HTTP {status}")]
    LoginPageStatus { status: u16 },

    #[error("could not find CSRF token on login page")]
    MissingCsrfToken,

    #[error("login failed: incorrect credentials or CSRF issue")]
    CredentialsRejected,

    #[error("invalid service URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A client session holding the judge's identity cookies.
#[derive(Debug)]
pub struct JudgeSession {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
    auth: Auth,
    max_retries: u32,
    retry_delay: Duration,
    logged_in: bool,
}

impl JudgeSession {
    /// Build an unauthenticated session from the run configuration.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_provider(Arc::clone(&jar))
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            jar,
            base_url: config.base_url.clone(),
            auth: config.auth.clone(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            logged_in: false,
        })
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Authenticate with whichever method the configuration carries.
    #[instrument(level = "info", skip_all)]
    pub async fn login(&mut self) -> Result<(), AuthError> {
        let res = match self.auth.clone() {
            Auth::Cookies {
                session,
                cookie_39ce7,
                cf_clearance,
            } => {
                self.login_with_cookies(&session, &cookie_39ce7, cf_clearance.as_deref())
                    .await
            }
            Auth::Password { username, password } => {
                self.login_with_password(&username, &password).await
            }
        };
        self.logged_in = res.is_ok();
        res
    }

    async fn login_with_cookies(
        &self,
        session: &str,
        cookie_39ce7: &str,
        cf_clearance: Option<&str>,
    ) -> Result<(), AuthError> {
        info!("Authenticating with session cookies");
        self.set_cookie("JSESSIONID", session);
        self.set_cookie("39ce7", cookie_39ce7);
        if let Some(clearance) = cf_clearance {
            self.set_cookie("cf_clearance", clearance);
        }

        let root_url = self.base_url.to_string();
        let body = self
            .client
            .get(&root_url)
            .send()
            .await
            .map_err(|source| AuthError::Request {
                url: root_url.clone(),
                source,
            })?
            .text()
            .await
            .map_err(|source| AuthError::Request {
                url: root_url.clone(),
                source,
            })?;

        if body.to_lowercase().contains("logout") {
            info!("Cookie authentication successful");
            Ok(())
        } else {
            Err(AuthError::CookiesRejected { url: root_url })
        }
    }

    async fn login_with_password(&self, username: &str, password: &str) -> Result<(), AuthError> {
        info!(%username, "Attempting password login");
        let enter_url = self.base_url.join("/enter")?;

        let resp = self
            .client
            .get(enter_url.clone())
            .send()
            .await
            .map_err(|source| AuthError::Request {
                url: enter_url.to_string(),
                source,
            })?;
        if resp.status() != StatusCode::OK {
            return Err(AuthError::LoginPageStatus {
                status: resp.status().as_u16(),
            });
        }
        let page = resp.text().await.map_err(|source| AuthError::Request {
            url: enter_url.to_string(),
            source,
        })?;
        let csrf_token = extract_csrf_token(&page).ok_or(AuthError::MissingCsrfToken)?;
        debug!("Found CSRF token");

        let form = [
            ("csrf_token", csrf_token.as_str()),
            ("action", "enter"),
            ("handleOrEmail", username),
            ("password", password),
            ("remember", "on"),
        ];
        let body = self
            .client
            .post(enter_url.clone())
            .form(&form[..])
            .send()
            .await
            .map_err(|source| AuthError::Request {
                url: enter_url.to_string(),
                source,
            })?
            .text()
            .await
            .map_err(|source| AuthError::Request {
                url: enter_url.to_string(),
                source,
            })?;

        if body.contains("Logout") || body.contains(username) {
            info!("Password login successful");
            Ok(())
        } else {
            Err(AuthError::CredentialsRejected)
        }
    }

    fn set_cookie(&self, name: &str, value: &str) {
        self.jar
            .add_cookie_str(&format!("{name}={value}; Path=/"), &self.base_url);
    }
}

impl PageSource for JudgeSession {
    #[instrument(level = "info", skip(self))]
    async fn get_page(&self, url: &str) -> Option<String> {
        let total_t0 = Instant::now();

        for attempt in 1..=self.max_retries {
            match self.client.get(url).send().await {
                Ok(resp) if resp.status() == StatusCode::OK => match resp.text().await {
                    Ok(body) => {
                        debug!(
                            attempt,
                            bytes = body.len(),
                            elapsed_ms = total_t0.elapsed().as_millis() as u64,
                            "Fetched page"
                        );
                        return Some(body);
                    }
                    Err(e) => {
                        warn!(attempt, max = self.max_retries, error = %e, "Failed reading response body");
                    }
                },
                Ok(resp) if resp.status() == StatusCode::FORBIDDEN => {
                    warn!("Access forbidden; session may need to re-login");
                    return None;
                }
                Ok(resp) => {
                    warn!(
                        attempt,
                        max = self.max_retries,
                        status = resp.status().as_u16(),
                        "Request failed with status"
                    );
                }
                Err(e) => {
                    warn!(attempt, max = self.max_retries, error = %e, "Request error");
                }
            }

            if attempt < self.max_retries {
                sleep(self.retry_delay).await;
            }
        }

        error!(
            max = self.max_retries,
            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
            "Request exhausted retries"
        );
        None
    }
}

fn extract_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&CSRF_SELECTOR)
        .next()?
        .value()
        .attr("value")
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
