use connectors::error::StoreError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Whether an error is worth retrying or should bubble up immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

pub fn classify_store_error(err: &StoreError) -> RetryDisposition {
    if err.is_transient() {
        RetryDisposition::Retry
    } else {
        RetryDisposition::Stop
    }
}

/// Terminal result of running an operation under the retry policy.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The error was classified fatal; no further attempts were made.
    Fatal(E),
    /// Every configured attempt failed with a retryable error.
    AttemptsExceeded(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(err) | RetryError::AttemptsExceeded(err) => err,
        }
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Preset tuned for remote-store calls.
    pub fn for_store() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }

    /// Runs `op` until it succeeds, a classifier says stop, or attempts run
    /// out. The classifier sees every error before the attempt counter is
    /// checked, so a fatal error on the last attempt is still reported as
    /// fatal.
    pub async fn run<F, Fut, T, E, C>(&self, mut op: F, classify: C) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDisposition,
    {
        let mut attempt = 0;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if classify(&err) == RetryDisposition::Stop {
                return Err(RetryError::Fatal(err));
            }
            attempt += 1;
            if attempt >= self.max_attempts {
                return Err(RetryError::AttemptsExceeded(err));
            }
            sleep(self.delay_for(attempt - 1)).await;
        }
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16) as u32);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
