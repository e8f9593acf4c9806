/// Bounded retry schedule for idempotent provider calls. Creation calls
/// that mint identities are never driven through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay before the given retry attempt (attempt 1 is the first retry).
    pub fn backoff_delay_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        delay.min(self.max_delay_ms)
    }
}

/// Drives `operation` until success or the attempt bound, waiting through
/// `sleep` between attempts so the schedule stays testable.
pub fn run_with_retry<T>(
    policy: &RetryPolicy,
    mut operation: impl FnMut() -> Result<T, String>,
    mut sleep: impl FnMut(u64),
) -> Result<T, String> {
    let mut last_error = String::new();
    for attempt in 1..=policy.max_attempts.max(1) {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) => last_error = error,
        }

        if attempt < policy.max_attempts {
            sleep(policy.backoff_delay_ms(attempt));
        }
    }

    Err(last_error)
}
