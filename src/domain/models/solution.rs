use super::SubmissionRequest;

/// What a site integration extracts from a problem page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScrapedSolution {
    pub question_url: String,
    pub question_key: String,
    pub title: String,
    pub code: String,
    pub language: String,
    pub accepted: bool,
}

impl ScrapedSolution {
    pub fn into_request(self, trial_count: u32, time_minutes: u32) -> SubmissionRequest {
        return SubmissionRequest {
            question_url: self.question_url,
            question_key: self.question_key,
            title: self.title,
            code: self.code.trim().to_string(),
            language: self.language,
            trial_count: trial_count.max(1),
            time_minutes,
        };
    }
}
