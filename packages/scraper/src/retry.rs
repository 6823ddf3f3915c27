//! HTTP retry helpers for transient errors.
//!
//! Document downloads should go through [`send_bytes`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so that every request gets
//! automatic retry with exponential backoff for transient failures
//! (timeouts, connection resets, server errors, rate limiting).
//!
//! ```ignore
//! let pdf = retry::send_bytes(|| client.get(&url)).await?;
//! ```

use std::time::Duration;

use crate::ScrapeError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (2s, 4s, 8s, 16s, 32s) the total wait before
/// giving up is 62 seconds.
const MAX_RETRIES: u32 = 5;

/// Maximum number of full re-fetch attempts when the response body cannot
/// be read to the end.
const MAX_BODY_RETRIES: u32 = 2;

/// What to do with a response, judged by its status alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusAction {
    Accept,
    Retry,
    Fail,
}

fn status_action(status: reqwest::StatusCode) -> StatusAction {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusAction::Retry
    } else if status.is_client_error() {
        StatusAction::Fail
    } else {
        StatusAction::Accept
    }
}

const fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt)
}

/// Sends an HTTP request and returns the full response body.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// Connection errors, timeouts, HTTP 429 and HTTP 5xx are retried up to
/// [`MAX_RETRIES`] times. A body that fails mid-read re-fetches the whole
/// request up to [`MAX_BODY_RETRIES`] times. Other 4xx statuses are
/// permanent and returned as [`ScrapeError::Status`] so callers can tell a
/// missing document (404) apart from a failed download.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the request fails after all retries or the
/// server returns a non-retryable status code.
pub async fn send_bytes<F>(build_request: F) -> Result<Vec<u8>, ScrapeError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut body_attempt = 0;
    loop {
        let response = send_inner(&build_request, MAX_RETRIES).await?;
        let url = response.url().to_string();

        match response.bytes().await {
            Ok(bytes) => {
                log::debug!("Downloaded {} bytes from {url}", bytes.len());
                return Ok(bytes.to_vec());
            }
            Err(e) if body_attempt < MAX_BODY_RETRIES => {
                body_attempt += 1;
                let delay = backoff(body_attempt);
                log::warn!(
                    "Body read failed for {url} (body retry {body_attempt}/{MAX_BODY_RETRIES}), \
                     re-fetching in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::error!("Body read failed for {url} after {MAX_BODY_RETRIES} retries: {e}");
                return Err(ScrapeError::Http(e));
            }
        }
    }
}

/// Core retry loop. Returns the first response with an acceptable status.
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, ScrapeError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }
        let last_attempt = attempt >= max_retries;
        attempt += 1;

        match build_request().send().await {
            Err(e) if is_transient(&e) && !last_attempt => {
                log::warn!("  transient error: {e}");
            }
            Err(e) => return Err(ScrapeError::Http(e)),
            Ok(response) => {
                let status = response.status();
                match status_action(status) {
                    StatusAction::Accept => return Ok(response),
                    StatusAction::Retry if !last_attempt => {
                        log::warn!("  HTTP {status} from {}", response.url());
                    }
                    StatusAction::Retry | StatusAction::Fail => {
                        return Err(ScrapeError::Status(status));
                    }
                }
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_retried() {
        assert_eq!(status_action(StatusCode::TOO_MANY_REQUESTS), StatusAction::Retry);
        assert_eq!(status_action(StatusCode::BAD_GATEWAY), StatusAction::Retry);
    }

    #[test]
    fn other_client_errors_are_permanent() {
        assert_eq!(status_action(StatusCode::NOT_FOUND), StatusAction::Fail);
        assert_eq!(status_action(StatusCode::FORBIDDEN), StatusAction::Fail);
    }

    #[test]
    fn success_is_accepted() {
        assert_eq!(status_action(StatusCode::OK), StatusAction::Accept);
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_secs(2));
        assert_eq!(backoff(3), Duration::from_secs(8));
    }
}
