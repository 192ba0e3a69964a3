#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Loading,
    Done,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressStep {
    pub label: String,
    pub status: StepStatus,
}

impl ProgressStep {
    pub fn new(label: &str, status: StepStatus) -> ProgressStep {
        return ProgressStep {
            label: label.to_string(),
            status,
        };
    }
}
