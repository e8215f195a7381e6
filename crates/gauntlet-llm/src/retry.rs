use std::future::Future;
use std::time::Duration;

/// Execute an async operation with exponential backoff and jitter.
///
/// Retries up to `max_retries` times on failure with delays of
/// 100ms, 200ms, 400ms... plus a small jitter, but only while `retryable`
/// reports the error as worth another attempt. Permanent failures are
/// returned immediately.
pub async fn with_retry<F, Fut, T, E, P>(max_retries: u32, retryable: P, f: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut retries = 0;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) if retries < max_retries && retryable(&e) => {
                retries += 1;
                let base_ms = 100u64 * (1u64 << (retries - 1));
                // Simple jitter using current time nanoseconds (avoids a rand dependency)
                let jitter_ms = (std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos()
                    % 100) as u64;
                tokio::time::sleep(Duration::from_millis(base_ms + jitter_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
