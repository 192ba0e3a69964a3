#[cfg(test)]
#[path = "submission_test.rs"]
mod tests;

use serde::Deserialize;
use serde::Serialize;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    LeetCode,
    HackerRank,
    Codeforces,
}

impl Platform {
    pub fn parse(text: &str) -> Option<Platform> {
        let text = text.trim().to_lowercase();
        return Platform::iter().find(|e| return e.to_string() == text);
    }

    pub fn submit_path(&self) -> String {
        return format!("/api/submissions/{self}");
    }
}

/// Payload of `POST /api/submissions/{platform}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub question_url: String,
    pub question_key: String,
    pub title: String,
    pub code: String,
    pub language: String,
    pub trial_count: u32,
    pub time_minutes: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubmissionState {
    Completed,
    Failed,
    Timeout,
    Cancelled,
    #[default]
    #[serde(other)]
    Pending,
}

impl SubmissionState {
    /// States reported by the backend after which polling stops.
    pub fn is_terminal(&self) -> bool {
        return matches!(self, SubmissionState::Completed | SubmissionState::Failed);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmissionStatus {
    pub status: SubmissionState,
    pub github_commit_url: Option<String>,
    pub sheet_updated: Option<bool>,
}

impl SubmissionStatus {
    pub fn new(status: SubmissionState) -> SubmissionStatus {
        return SubmissionStatus {
            status,
            ..SubmissionStatus::default()
        };
    }

    pub fn timeout() -> SubmissionStatus {
        return SubmissionStatus::new(SubmissionState::Timeout);
    }

    pub fn cancelled() -> SubmissionStatus {
        return SubmissionStatus::new(SubmissionState::Cancelled);
    }

    pub fn is_pushed(&self) -> bool {
        return self
            .github_commit_url
            .as_ref()
            .map(|e| return !e.is_empty())
            .unwrap_or(false);
    }

    pub fn is_sheet_updated(&self) -> bool {
        return self.sheet_updated.unwrap_or(false);
    }
}

/// Acknowledgement returned when the backend queues a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub status: String,
    pub submission_id: Option<String>,
}
