use std::{future::Future, time::Duration};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: usize,
    pub backoff: Duration,
}

/// Runs `submit` followed by `confirm` until both succeed or the attempts run out.
///
/// A failure in either step counts as a failed attempt. Between failed attempts the policy's
/// backoff is awaited; after the last one the error is returned as is.
pub async fn retry_with_backoff<S, SF, P, C, CF, R>(
    policy: &RetryPolicy,
    label: &str,
    mut submit: S,
    mut confirm: C,
) -> eyre::Result<R>
where
    S: FnMut() -> SF,
    SF: Future<Output = eyre::Result<P>>,
    C: FnMut(P) -> CF,
    CF: Future<Output = eyre::Result<R>>,
{
    let max_attempts = policy.max_attempts.max(1);

    let mut attempt = 1;

    loop {
        let result = match submit().await {
            Ok(pending) => confirm(pending).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                tracing::error!(
                    "{label} error (attempt {attempt}/{max_attempts}): {e}. Try again in {} sec",
                    policy.backoff.as_secs_f32()
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!("{label} error (attempt {attempt}/{max_attempts}): {e}");
                return Err(e);
            }
        }
    }
}
