#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;

use reqwest::StatusCode;

/// Decides when a failed authenticated call gets a token refresh and another
/// attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub trigger: StatusCode,
}

impl Default for RetryPolicy {
    fn default() -> RetryPolicy {
        return RetryPolicy {
            max_retries: 1,
            trigger: StatusCode::UNAUTHORIZED,
        };
    }
}

impl RetryPolicy {
    /// `attempt` is zero for the first request.
    pub fn should_refresh(&self, status: StatusCode, attempt: u32) -> bool {
        return status == self.trigger && attempt < self.max_retries;
    }
}
