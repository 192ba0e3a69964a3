#[cfg(test)]
#[path = "submissions_test.rs"]
mod tests;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::ApiClient;
use super::RequestOptions;
use super::SubmissionPoller;
use crate::domain::models::wire;
use crate::domain::models::ApiError;
use crate::domain::models::Event;
use crate::domain::models::Platform;
use crate::domain::models::ProgressStep;
use crate::domain::models::ScrapedSolution;
use crate::domain::models::StepStatus;
use crate::domain::models::SubmissionReceipt;
use crate::domain::models::SubmissionRequest;
use crate::domain::models::SubmissionState;
use crate::domain::models::SubmissionStatus;

const STEP_EXTRACT: usize = 0;
const STEP_PUSH: usize = 1;
const STEP_SHEET: usize = 2;

pub async fn submit(
    api: &ApiClient,
    platform: Platform,
    request: &SubmissionRequest,
) -> Result<SubmissionReceipt, ApiError> {
    let body = api
        .call(&platform.submit_path(), RequestOptions::post(request)?)
        .await?;

    let receipt: SubmissionReceipt =
        wire::from_body::<wire::SubmissionReceiptResponse>(body)?.into();
    tracing::info!(
        platform = %platform,
        question_key = %request.question_key,
        status = %receipt.status,
        submission_id = ?receipt.submission_id,
        "Submission queued"
    );

    return Ok(receipt);
}

/// Outcome of one tracked submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackOutcome {
    Rejected(String),
    Queued(SubmissionReceipt),
    Finished(SubmissionStatus),
}

/// Drives a solution through submit and status polling, publishing the
/// progress steps shown to the user.
pub struct SubmissionTracker<'a> {
    api: &'a ApiClient,
    poller: SubmissionPoller<'a>,
    tx: mpsc::UnboundedSender<Event>,
    steps: Vec<ProgressStep>,
}

impl<'a> SubmissionTracker<'a> {
    pub fn new(
        api: &'a ApiClient,
        poller: SubmissionPoller<'a>,
        tx: mpsc::UnboundedSender<Event>,
    ) -> SubmissionTracker<'a> {
        return SubmissionTracker {
            api,
            poller,
            tx,
            steps: vec![
                ProgressStep::new("Extracting code", StepStatus::Loading),
                ProgressStep::new("Pushing to GitHub", StepStatus::Pending),
                ProgressStep::new("Updating sheet", StepStatus::Pending),
            ],
        };
    }

    fn publish(&self) {
        let _ = self.tx.send(Event::Progress(self.steps.clone()));
    }

    fn set_step(&mut self, idx: usize, label: &str, status: StepStatus) {
        self.steps[idx] = ProgressStep::new(label, status);
    }

    fn reject(&self, label: &str) -> TrackOutcome {
        let _ = self.tx.send(Event::Progress(vec![ProgressStep::new(
            label,
            StepStatus::Error,
        )]));

        return TrackOutcome::Rejected(label.to_string());
    }

    fn fail_loading_step(&mut self) {
        if let Some(step) = self
            .steps
            .iter_mut()
            .find(|e| return e.status == StepStatus::Loading)
        {
            step.status = StepStatus::Error;
        }
        self.publish();
    }

    /// Submits `solution` and, unless `wait` is false, polls until the
    /// backend finishes processing it.
    pub async fn run(
        &mut self,
        platform: Platform,
        solution: ScrapedSolution,
        trial_count: u32,
        time_minutes: u32,
        wait: bool,
        cancel: &CancellationToken,
    ) -> Result<TrackOutcome, ApiError> {
        self.publish();

        if self.api.store().get().await?.access_token.is_none() {
            return Ok(self.reject("Not logged in"));
        }

        if !solution.accepted {
            return Ok(self.reject("Submission not accepted yet"));
        }

        if solution.code.trim().is_empty() {
            self.set_step(STEP_EXTRACT, "Extracting code", StepStatus::Error);
            self.publish();
            return Ok(TrackOutcome::Rejected("Code is required".to_string()));
        }

        let request = solution.into_request(trial_count, time_minutes);
        self.set_step(STEP_EXTRACT, "Extracting code", StepStatus::Done);
        self.set_step(STEP_PUSH, "Pushing to GitHub", StepStatus::Loading);
        self.publish();

        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(platform = %platform, "Submission cancelled");
                self.set_step(STEP_PUSH, "Cancelled", StepStatus::Error);
                self.publish();
                return Ok(TrackOutcome::Finished(SubmissionStatus::cancelled()));
            }
            res = submit(self.api, platform, &request) => res,
        };

        let receipt = match res {
            Ok(receipt) => receipt,
            Err(err) => {
                self.fail_loading_step();
                return Err(err);
            }
        };

        self.set_step(STEP_PUSH, "Pushing to GitHub", StepStatus::Done);
        let submission_id = match (&receipt.submission_id, wait) {
            (Some(id), true) => id.to_string(),
            _ => {
                let _ = self.tx.send(Event::Message(format!(
                    "Submitted. Status: {}",
                    receipt.status
                )));
                self.publish();
                return Ok(TrackOutcome::Queued(receipt));
            }
        };

        self.set_step(STEP_SHEET, "Updating sheet", StepStatus::Loading);
        self.publish();

        let final_status = self.track(&submission_id, cancel).await;
        match final_status.status {
            SubmissionState::Completed => {
                self.set_step(STEP_SHEET, "Sheet updated ✓", StepStatus::Done)
            }
            SubmissionState::Failed => {
                self.set_step(STEP_SHEET, "Update failed", StepStatus::Error)
            }
            SubmissionState::Cancelled => {
                self.set_step(STEP_SHEET, "Cancelled", StepStatus::Error)
            }
            _ => self.set_step(STEP_SHEET, "Timed out", StepStatus::Error),
        }
        self.publish();

        return Ok(TrackOutcome::Finished(final_status));
    }

    /// Polls a queued submission, updating the steps from each snapshot.
    pub async fn track(
        &mut self,
        submission_id: &str,
        cancel: &CancellationToken,
    ) -> SubmissionStatus {
        let (status_tx, mut status_rx) = mpsc::unbounded_channel::<SubmissionStatus>();
        let poll = self.poller.poll(submission_id, status_tx, cancel);
        let tx = self.tx.clone();
        let mut steps = self.steps.clone();

        let observe = async move {
            while let Some(snapshot) = status_rx.recv().await {
                if snapshot.is_pushed() {
                    steps[STEP_PUSH] = ProgressStep::new("Pushed to GitHub ✓", StepStatus::Done);
                }
                if snapshot.is_sheet_updated() {
                    steps[STEP_SHEET] = ProgressStep::new("Sheet updated ✓", StepStatus::Done);
                }

                let _ = tx.send(Event::StatusSnapshot(snapshot));
                let _ = tx.send(Event::Progress(steps.clone()));
            }

            return steps;
        };

        let (final_status, steps) = tokio::join!(poll, observe);
        self.steps = steps;

        return final_status;
    }
}
