use anyhow::{Context, Error};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Attempts made by [`safe_request`] before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Retries an async operation with a fixed delay between attempts
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `max_attempts`: Total number of runs, including the first one
/// - `delay`: Pause between two attempts
///
/// # Returns
/// Either the successful result or the error of the last attempt
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    max_attempts: usize,
    delay: Duration,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await.map_err(anyhow::Error::from) {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt >= max_attempts {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, max_attempts, err
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// What a single attempt of [`safe_request`] produced. A status error is
/// a complete answer and is handed back as a value so it is not retried.
enum Attempt {
    Body(String),
    Status(reqwest::Error),
}

/// GETs `url` and returns the body text.
///
/// Transport failures (connect errors, timeouts, broken bodies) are retried
/// up to `max_attempts` times. A non-success HTTP status fails immediately.
pub async fn safe_request(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    max_attempts: usize,
    delay: Duration,
) -> anyhow::Result<String> {
    debug!("Requesting {}", url);
    let attempt = with_retry(
        move || async move {
            let response = client.get(url).timeout(timeout).send().await?;
            match response.error_for_status() {
                Ok(response) => response.text().await.map(Attempt::Body),
                Err(status) => Ok(Attempt::Status(status)),
            }
        },
        max_attempts,
        delay,
    )
    .await
    .with_context(|| format!("Failed to fetch {url}"))?;

    match attempt {
        Attempt::Body(body) => Ok(body),
        Attempt::Status(status) => {
            Err(status).with_context(|| format!("Request to {url} returned an error status"))
        }
    }
}
