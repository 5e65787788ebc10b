// src/ingest/providers/mod.rs
//! Source clients plus the retry/backoff and status mapping they share.

pub mod arxiv;
pub mod github;
pub mod huggingface;

use metrics::counter;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;

use crate::ingest::types::{Source, SourceError};

pub use arxiv::ArxivClient;
pub use github::GithubClient;
pub use huggingface::HuggingFaceClient;

pub(crate) const USER_AGENT: &str = concat!("ts-trend-scanner/", env!("CARGO_PKG_VERSION"));
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Exponential backoff for rate-limited calls: `base_delay * 2^n` between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Run `op`, retrying only rate-limit failures. Once retries are exhausted the
/// error reports the total number of attempts.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    source: Source,
    mut op: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut retries = 0u32;
    loop {
        match op().await {
            Err(e) if e.is_retryable() => {
                if retries >= policy.max_retries {
                    return Err(SourceError::RateLimited {
                        attempts: retries + 1,
                    });
                }
                let delay = policy.delay_for(retries);
                tracing::warn!(%source, retry = retries + 1, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
                counter!("scan_rate_limit_retries_total", "source" => source.as_str()).increment(1);
                tokio::time::sleep(delay).await;
                retries += 1;
            }
            other => return other,
        }
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
/// `quota_exhausted` is set when the platform signalled an empty rate quota.
pub(crate) fn classify_status(status: StatusCode, quota_exhausted: bool) -> Option<SourceError> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::UNAUTHORIZED => SourceError::Auth(status.to_string()),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            SourceError::RateLimited { attempts: 1 }
        }
        StatusCode::FORBIDDEN if quota_exhausted => SourceError::RateLimited { attempts: 1 },
        StatusCode::FORBIDDEN => SourceError::Auth(status.to_string()),
        _ => SourceError::Network(format!("http {status}")),
    })
}

pub(crate) fn network_error(e: reqwest::Error) -> SourceError {
    SourceError::Network(e.to_string())
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn delays_double() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(0), Duration::from_secs(1));
        assert_eq!(p.delay_for(1), Duration::from_secs(2));
        assert_eq!(p.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(classify_status(StatusCode::OK, false), None);
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, false),
            Some(SourceError::Auth(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, true),
            Some(SourceError::RateLimited { .. })
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, false),
            Some(SourceError::Auth(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, false),
            Some(SourceError::RateLimited { .. })
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, false),
            Some(SourceError::Network(_))
        ));
    }

    #[tokio::test]
    async fn rate_limit_recovers_within_budget() {
        let calls = AtomicU32::new(0);
        let out = with_backoff(&fast(), Source::Github, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(SourceError::RateLimited { attempts: 1 })
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(out, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rate_limit_exhausts_and_reports_attempts() {
        let calls = AtomicU32::new(0);
        let out: Result<(), _> = with_backoff(&fast(), Source::Arxiv, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::RateLimited { attempts: 1 }) }
        })
        .await;
        assert_eq!(out, Err(SourceError::RateLimited { attempts: 4 }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_retryable_errors_return_immediately() {
        let calls = AtomicU32::new(0);
        let out: Result<(), _> = with_backoff(&fast(), Source::HuggingFace, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::Auth("401".into())) }
        })
        .await;
        assert!(matches!(out, Err(SourceError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
