use std::time::Duration;

#[derive(Debug, Clone)]
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
            max_backoff: Duration::from_millis(500),
            jitter_max: Some(Duration::from_millis(50)),
        }
    }
}

impl RetryConfig {
    fn wait_for(&self, backoff: Duration) -> Duration {
        match self.jitter_max {
            Some(jitter_max) => {
                let jitter_ms = jitter_max.as_millis() as u64;
                let extra = if jitter_ms == 0 {
                    0
                } else {
                    rand::random::<u64>() % (jitter_ms + 1)
                };
                backoff + Duration::from_millis(extra)
            }
            None => backoff,
        }
    }
}

/// Runs `f` until it succeeds, the error is not `retryable`, or attempts run
/// out. Backoff doubles each round up to `max_backoff`, plus jitter.
pub async fn retry_async_with_config<F, Fut, T, E, P>(
    config: &RetryConfig,
    mut f: F,
    retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempts_left = config.max_attempts.max(1);
    let mut backoff = config.base_backoff;

    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                attempts_left -= 1;
                if attempts_left == 0 || !retryable(&e) {
                    return Err(e);
                }
                tokio::time::sleep(config.wait_for(backoff)).await;
                backoff = std::cmp::min(backoff * 2, config.max_backoff);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
            jitter_max: None,
        }
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let counter = AtomicUsize::new(0);

        let res: Result<usize, &'static str> = retry_async_with_config(
            &fast(),
            || async {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("blip")
                } else {
                    Ok(n)
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(res, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let counter = AtomicUsize::new(0);

        let res: Result<(), &'static str> = retry_async_with_config(
            &fast(),
            || async {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("always fail")
            },
            |_| true,
        )
        .await;

        assert!(res.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let counter = AtomicUsize::new(0);

        let res: Result<(), &'static str> = retry_async_with_config(
            &fast(),
            || async {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("bad document")
            },
            |e| *e != "bad document",
        )
        .await;

        assert!(res.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
