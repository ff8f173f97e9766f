//! Fail-open utilities for graceful degradation
//!
//! Poll cycles must never take the scheduler down. Steps whose failure only
//! costs one cycle's output (fetching the status document, dispatching a
//! sample) run through [`fail_open`], which logs the error and yields `None`.

use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use overseer_core::fail_open::fail_open;
/// use overseer_core::FetchError;
///
/// async fn fetch_status() -> Result<u32, FetchError> {
///     Ok(3)
/// }
///
/// async fn example() {
///     let queue_size = fail_open("status fetch", || fetch_status()).await;
///     // queue_size is None if fetch_status() failed
/// }
/// ```
pub async fn fail_open<F, Fut, T, E>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FetchError, SinkError};

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", || async { Ok::<_, SinkError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_failure() {
        let result = fail_open("test_op", || async {
            Err::<i32, _>(FetchError::NotAnObject {
                url: "http://localhost:8983/solr".to_string(),
            })
        })
        .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_fail_open_runs_operation_once() {
        let mut attempts = 0;
        let result = fail_open("test_op", || {
            attempts += 1;
            async move { Err::<i32, _>(SinkError::Io(std::io::ErrorKind::BrokenPipe.into())) }
        })
        .await;
        assert_eq!(result, None);
        assert_eq!(attempts, 1);
    }
}
