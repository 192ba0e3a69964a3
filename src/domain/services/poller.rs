#[cfg(test)]
#[path = "poller_test.rs"]
mod tests;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::StatusSource;
use crate::domain::models::SubmissionStatus;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Polls a queued submission until the backend reports a terminal state.
pub struct SubmissionPoller<'a> {
    source: &'a dyn StatusSource,
    interval: Duration,
    max_attempts: u32,
}

impl<'a> SubmissionPoller<'a> {
    pub fn new(source: &'a dyn StatusSource) -> SubmissionPoller<'a> {
        return SubmissionPoller {
            source,
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        };
    }

    pub fn with_interval(mut self, interval: Duration) -> SubmissionPoller<'a> {
        self.interval = interval;
        return self;
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> SubmissionPoller<'a> {
        self.max_attempts = max_attempts;
        return self;
    }

    /// Waits one interval before every query. Each snapshot is sent to
    /// `updates`; query errors are logged and retried on the next interval.
    pub async fn poll(
        &self,
        submission_id: &str,
        updates: mpsc::UnboundedSender<SubmissionStatus>,
        cancel: &CancellationToken,
    ) -> SubmissionStatus {
        for attempt in 0..self.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return SubmissionStatus::cancelled(),
                _ = tokio::time::sleep(self.interval) => {}
            }

            let res = tokio::select! {
                _ = cancel.cancelled() => return SubmissionStatus::cancelled(),
                res = self.source.fetch_status(submission_id) => res,
            };

            let snapshot = match res {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::warn!(submission_id, attempt, error = %err, "Status poll failed");
                    continue;
                }
            };

            tracing::debug!(submission_id, attempt, status = %snapshot.status, "Status poll");
            let _ = updates.send(snapshot.clone());

            if snapshot.status.is_terminal() {
                return snapshot;
            }
        }

        return SubmissionStatus::timeout();
    }
}
