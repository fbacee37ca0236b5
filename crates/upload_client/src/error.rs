use shared::error::{OutcomeKind, OutcomeSummary};
use thiserror::Error;

/// No response was received for the upload.
#[derive(Debug, Clone, Error)]
#[error("upload transport failure: {message}")]
pub struct TransportError {
    message: String,
    timed_out: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.timed_out
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::timeout(value.to_string())
        } else {
            Self::new(value.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload rejected with status {status}: {body}")]
    Application { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed upload response: {source}")]
    MalformedResponse {
        #[source]
        source: serde_json::Error,
    },
}

impl UploadError {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            UploadError::Application { .. } => OutcomeKind::ApplicationError,
            UploadError::Transport(_) => OutcomeKind::TransportError,
            UploadError::MalformedResponse { .. } => OutcomeKind::MalformedResponse,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Application { status, .. } => Some(*status),
            UploadError::MalformedResponse { .. } => Some(200),
            UploadError::Transport(_) => None,
        }
    }

    pub fn summary(&self) -> OutcomeSummary {
        let error = match self {
            UploadError::Application { body, .. } => body.clone(),
            other => other.to_string(),
        };
        OutcomeSummary::failure(self.kind(), self.status(), error)
    }
}

/// Submission refused before any request was issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("an upload is already in flight")]
    UploadInFlight,
    #[error("upload form has no file field")]
    MissingFile,
}
