use std::fmt;
use std::time::Duration;

/// Bounded retry with a fixed delay between attempts.
///
/// `max_attempts` counts every attempt, including the first. Only errors accepted by
/// the `retryable` predicate are attempted again; any other error ends the run at once.
pub struct RetryPolicy<E> {
    max_attempts: u32,
    delay: Duration,
    retryable: fn(&E) -> bool,
}

/// Successful result and the number of attempts it took.
#[derive(Debug, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// Last error once the policy gives up.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub error: E,
    pub attempts: u32,
}

impl<E> RetryPolicy<E> {
    /// A zero `max_attempts` is raised to one.
    pub fn new(max_attempts: u32, delay: Duration, retryable: fn(&E) -> bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            retryable,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_retryable(&self, error: &E) -> bool {
        (self.retryable)(error)
    }

    /// Run `op` until it succeeds, fails permanently or the budget is spent.
    ///
    /// `op` receives the 1-based attempt number. Sleeps block the current thread.
    pub fn run<T>(&self, mut op: impl FnMut(u32) -> Result<T, E>) -> Result<Retried<T>, Exhausted<E>>
    where
        E: fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => {
                    return Ok(Retried {
                        value,
                        attempts: attempt,
                    });
                }
                Err(error) if attempt < self.max_attempts && self.is_retryable(&error) => {
                    tracing::warn!(
                        %error,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        "attempt failed, retrying"
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
                Err(error) => {
                    return Err(Exhausted {
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RetryPolicy<E> {}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
