// src/fetch/redirects.rs
// =============================================================================
// Redirect-following fetcher.
//
// One logical request:
// 1. Send the request with automatic redirects disabled
// 2. If the status is 3xx and there is a Location header, record the hop and
//    request the resolved Location next
// 3. Stop at the first non-redirect response, or fail after `hop_limit` hops
//
// Each network call has its own timeout. Any failure (network, timeout, too
// many redirects, bad Location) restarts the whole logical request, up to
// `max_retries` more times, sleeping `backoff_base * 2^attempt` in between.
//
// Rust concepts:
// - thiserror: derives Display/Error for `FetchError` from the #[error] strings
// - #[from]: lets `?` turn a reqwest::Error into FetchError::Network
// - Box<FetchError>: an enum can't contain itself directly (infinite size),
//   so the last cause inside `Exhausted` lives on the heap
// - tokio::time::timeout: races a future against a timer
// =============================================================================

use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Client, Method};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::AuditConfig;

/// One step in a redirect chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectHop {
    pub url: String,
    pub status: u16,
    pub location: Option<String>,
}

/// The terminal (non-redirect) response of a logical request.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Empty for HEAD requests
    pub body: String,
}

impl FetchedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Result of following redirects for one request.
///
/// `chain[0].url` is the requested URL and `final_url` is always the last
/// hop's URL.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: FetchedResponse,
    pub final_url: String,
    pub chain: Vec<RedirectHop>,
    /// Retry attempts consumed (0 when the first attempt succeeded)
    pub retries: u32,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timeout after {ms}ms ({url})")]
    Timeout { url: String, ms: u128 },

    #[error("Too many redirects for {0}")]
    TooManyRedirects(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Network(#[from] reqwest::Error),

    #[error("Failed after {retries} retries: {source}")]
    Exhausted {
        attempts: u32,
        retries: u32,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Number of attempts made before giving up (1 for a single failure).
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::Exhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}

// Shares one reqwest client (connection pool) across every check.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    hop_limit: usize,
}

impl Fetcher {
    pub fn new(config: &AuditConfig) -> Result<Self, FetchError> {
        // One client for the whole run (connection pooling).
        // Policy::none() makes reqwest hand us every 3xx instead of following
        // it, so each hop can be recorded.
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Fetcher {
            client,
            timeout: config.timeout(),
            max_retries: config.max_retries,
            backoff_base: config.backoff_base(),
            hop_limit: config.hop_limit,
        })
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub async fn get(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        self.fetch(Method::GET, url).await
    }

    pub async fn head(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        self.fetch(Method::HEAD, url).await
    }

    /// Follows redirects for `url`, retrying the whole chain on failure.
    pub async fn fetch(&self, method: Method, url: &str) -> Result<FetchOutcome, FetchError> {
        let mut last_error = None;

        // 0..=max_retries: the first attempt plus max_retries retries
        for attempt in 0..=self.max_retries {
            // Every attempt starts a fresh chain from the requested URL
            match self.follow(method.clone(), url).await {
                Ok((response, final_url, chain)) => {
                    return Ok(FetchOutcome {
                        response,
                        final_url,
                        chain,
                        retries: attempt,
                    });
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "fetch attempt failed");
                    last_error = Some(e);
                    // No sleep after the last attempt, there is nothing left to wait for
                    if attempt < self.max_retries {
                        // base, 2*base, 4*base, ... (saturating so huge retry
                        // counts can't overflow)
                        let delay = self.backoff_base * 2u32.saturating_pow(attempt);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        // The loop runs at least once, so there is always a last error here
        let source = last_error.unwrap_or_else(|| FetchError::TooManyRedirects(url.to_string()));
        let error = FetchError::Exhausted {
            attempts: self.max_retries + 1,
            retries: self.max_retries,
            source: Box::new(source),
        };
        warn!(url, attempts = error.attempts(), "giving up");
        Err(error)
    }

    // One attempt: walk the redirect chain hop by hop.
    async fn follow(
        &self,
        method: Method,
        url: &str,
    ) -> Result<(FetchedResponse, String, Vec<RedirectHop>), FetchError> {
        let mut chain = Vec::new();
        let mut current = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        // The first hop is recorded exactly as requested
        let mut current_str = url.to_string();

        for _ in 0..self.hop_limit {
            let response = self.send_once(method.clone(), &current).await?;
            let location = response
                .headers
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            debug!(url = %current_str, status = response.status, ?location, "hop");
            chain.push(RedirectHop {
                url: current_str.clone(),
                status: response.status,
                location: location.clone(),
            });

            match location {
                Some(location) if (300..400).contains(&response.status) => {
                    current = current.join(&location).map_err(|e| FetchError::InvalidUrl {
                        url: location.clone(),
                        reason: e.to_string(),
                    })?;
                    current_str = current.to_string();
                }
                _ => return Ok((response, current_str, chain)),
            }
        }

        Err(FetchError::TooManyRedirects(url.to_string()))
    }

    // A single network call (request + body), bounded by the timeout.
    async fn send_once(&self, method: Method, url: &Url) -> Result<FetchedResponse, FetchError> {
        let read_body = method != Method::HEAD;
        let call = async {
            let response = self.client.request(method, url.clone()).send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            // Redirect bodies are never inspected
            let body = if read_body && !(300..400).contains(&status) {
                response.text().await?
            } else {
                String::new()
            };
            Ok::<_, reqwest::Error>(FetchedResponse { status, headers, body })
        };

        // Outer Result: did the timer fire? Inner Result: did reqwest fail?
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                ms: self.timeout.as_millis(),
            }),
        }
    }
}
