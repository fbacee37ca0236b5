use serde::{Deserialize, Serialize};

/// Path of the upload endpoint, relative to the server base url.
pub const UPLOAD_PATH: &str = "/upload";

/// Body of a successful (200) upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutResponse {
    pub message: String,
    pub layout_image: String,
}

/// Error body the layout server sends alongside a non-200 status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerErrorBody {
    pub error: String,
}

impl ServerErrorBody {
    /// Best-effort parse of a raw error body; `None` when it is not the
    /// server's `{"error": ...}` shape.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}
