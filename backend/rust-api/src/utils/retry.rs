use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter for transient storage/cache failures.
#[derive(Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(250),
            jitter_max: Some(Duration::from_millis(25)),
        }
    }
}

impl RetryConfig {
    /// Profile for storage reads/writes on the answer path, where a dropped
    /// connection must not surface as a 500.
    pub fn storage() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(800),
            jitter_max: Some(Duration::from_millis(100)),
        }
    }
}

pub async fn retry_with_backoff<F, Fut, T, E>(config: RetryConfig, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempts_left = config.max_attempts;
    let mut backoff = config.base_backoff;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempts_left = attempts_left.saturating_sub(1);
                if attempts_left == 0 {
                    return Err(err);
                }

                tracing::warn!(
                    "Retrying after error ({} attempts left): {}",
                    attempts_left,
                    err
                );

                let jitter = config
                    .jitter_max
                    .map(|max| {
                        let max_ms = max.as_millis() as u64;
                        if max_ms == 0 {
                            Duration::ZERO
                        } else {
                            Duration::from_millis(rand::rng().random_range(0..=max_ms))
                        }
                    })
                    .unwrap_or(Duration::ZERO);

                tokio::time::sleep(backoff + jitter).await;
                backoff = std::cmp::min(backoff * 2, config.max_backoff);
            }
        }
    }
}
