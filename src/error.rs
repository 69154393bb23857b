use thiserror::Error;

use crate::schema::integrity::IntegrityIssue;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Schema integrity check failed with {} error(s): {}", .0.len(), format_issues(.0))]
    Integrity(Vec<IntegrityIssue>),

    #[error("Step {step} is out of range for a form with {page_count} page(s)")]
    StepOutOfRange { step: usize, page_count: usize },

    #[error("Submission rejected: {0}")]
    Submission(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

// エラー作成用のヘルパー関数
impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }

    pub fn schema<S: Into<String>>(message: S) -> Self {
        Error::Schema(message.into())
    }
}

fn format_issues(issues: &[IntegrityIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Schema(err.to_string())
    }
}
