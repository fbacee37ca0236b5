use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    ApplicationError,
    TransportError,
    MalformedResponse,
}

impl OutcomeKind {
    pub fn is_success(self) -> bool {
        self == OutcomeKind::Success
    }
}

/// Serializable summary of a finished upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub outcome: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutcomeSummary {
    pub fn success(
        status: u16,
        message: impl Into<String>,
        layout_image: impl Into<String>,
    ) -> Self {
        Self {
            outcome: OutcomeKind::Success,
            status: Some(status),
            message: Some(message.into()),
            layout_image: Some(layout_image.into()),
            error: None,
        }
    }

    pub fn failure(outcome: OutcomeKind, status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            outcome,
            status,
            message: None,
            layout_image: None,
            error: Some(error.into()),
        }
    }
}
