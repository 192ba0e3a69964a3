use super::ProgressStep;
use super::SubmissionStatus;

/// Updates published to whatever renders submission progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Progress(Vec<ProgressStep>),
    StatusSnapshot(SubmissionStatus),
    Message(String),
}
