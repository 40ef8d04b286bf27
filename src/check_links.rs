//! Validator engine: resolve candidate links concurrently
//!
//! One task per candidate, at most `workers` requests in flight at once.
//! Each task owns its candidate; outcomes are collected in completion
//! order at a single point, which also drives progress reporting.

use crate::config::{Config, Method};
use crate::report::Reporter;
use crate::schema::{LinkError, UniqueLink, ValidationOutcome};
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// Resolves one URL to an HTTP status or a failure
pub trait Probe: Send + Sync + 'static {
    fn probe(&self, url: &str) -> impl Future<Output = Result<u16, LinkError>> + Send;
}

/// `reqwest`-backed probe with browser-like headers
pub struct HttpProbe {
    client: Client,
    method: Method,
    timeout_ms: u64,
}

impl HttpProbe {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            method: config.method,
            timeout_ms: config.timeout_ms,
        })
    }

    async fn send(&self, method: reqwest::Method, url: Url) -> Result<StatusCode, LinkError> {
        self.client
            .request(method, url)
            .send()
            .await
            .map(|response| response.status())
            .map_err(|e| categorize_error(&e, self.timeout_ms))
    }
}

impl Probe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<u16, LinkError> {
        let url = Url::parse(url).map_err(|e| LinkError::InvalidUrl(e.to_string()))?;

        let status = match self.method {
            Method::Get => self.send(reqwest::Method::GET, url).await?,
            Method::Head => {
                let status = self.send(reqwest::Method::HEAD, url.clone()).await?;
                if matches!(
                    status,
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) {
                    log::debug!("HEAD rejected with {}, retrying as GET: {}", status, url);
                    self.send(reqwest::Method::GET, url).await?
                } else {
                    status
                }
            }
        };

        classify_status(status)
    }
}

/// Success is an inclusive 200..=399 status; everything else fails
pub fn classify_status(status: StatusCode) -> Result<u16, LinkError> {
    let code = status.as_u16();
    if (200..=399).contains(&code) {
        Ok(code)
    } else {
        Err(LinkError::Status {
            code,
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        })
    }
}

/// Map a transport error to a failure kind
///
/// Keywords are matched against the causes only; the top-level message
/// embeds the URL, which may contain anything.
fn categorize_error(error: &reqwest::Error, timeout_ms: u64) -> LinkError {
    let chain = error_chain(error);
    let detail = chain.join(": ");
    let causes = chain[1..].join(": ").to_lowercase();

    if error.is_timeout() {
        LinkError::Timeout(timeout_ms)
    } else if error.is_redirect() {
        LinkError::Redirect
    } else if causes.contains("certificate") || causes.contains("tls") || causes.contains("ssl") {
        LinkError::Tls(detail)
    } else if error.is_connect() {
        if causes.contains("dns") || causes.contains("lookup") || causes.contains("resolve") {
            LinkError::Dns(detail)
        } else {
            LinkError::Connect(detail)
        }
    } else {
        LinkError::Request(detail)
    }
}

fn error_chain(error: &dyn std::error::Error) -> Vec<String> {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts
}

/// Outcomes of one validation pass
#[derive(Debug, Default)]
pub struct Validation {
    /// In completion order
    pub outcomes: Vec<ValidationOutcome>,
    /// URLs whose task died; cached neither way so they are re-checked
    pub aborted: Vec<String>,
}

/// Bounded-concurrency validator
pub struct Validator<P: Probe> {
    probe: Arc<P>,
    workers: usize,
}

impl<P: Probe> Validator<P> {
    pub fn new(probe: P, workers: usize) -> Self {
        Self {
            probe: Arc::new(probe),
            workers: workers.max(1),
        }
    }

    /// Check every candidate once; no retries
    pub async fn validate_all(
        &self,
        candidates: Vec<UniqueLink>,
        reporter: &dyn Reporter,
    ) -> Validation {
        let total = candidates.len();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        reporter.validation_started(total);

        let mut pending: FuturesUnordered<_> = candidates
            .into_iter()
            .map(|link| {
                let url = link.url().to_string();
                let probe = Arc::clone(&self.probe);
                let semaphore = Arc::clone(&semaphore);

                let handle = tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return ValidationOutcome {
                            link,
                            result: Err(LinkError::Request("worker pool closed".to_string())),
                        };
                    };
                    let result = probe.probe(link.url()).await;
                    ValidationOutcome { link, result }
                });

                async move { (url, handle.await) }
            })
            .collect();

        let mut validation = Validation::default();
        let mut done = 0;

        while let Some((url, joined)) = pending.next().await {
            done += 1;
            match joined {
                Ok(outcome) => {
                    log::debug!("{} -> {:?}", outcome.url(), outcome.result);
                    reporter.link_checked(done, total, &outcome);
                    validation.outcomes.push(outcome);
                }
                Err(e) => {
                    log::error!("Validation task for {} failed: {}", url, e);
                    reporter.task_aborted(&url, &e.to_string());
                    validation.aborted.push(url);
                }
            }
        }

        validation
    }
}
