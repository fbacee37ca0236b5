use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Element ids of the upload page.
pub const LOADING_BAR_CONTAINER_ID: &str = "loadingBarContainer";
pub const LOADING_BAR_ID: &str = "loadingBar";
pub const RESULT_ID: &str = "result";
pub const GENERATED_IMAGE_ID: &str = "generatedImage";

/// Form field the layout server reads the spreadsheet from.
pub const DEFAULT_FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(pub Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    pub name: String,
    pub filename: String,
    pub mime_type: Option<String>,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(FileField),
}

/// Named fields of the upload form, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    fields: Vec<(String, FormValue)>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .push((name.into(), FormValue::Text(value.into())));
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        mime_type: Option<String>,
        contents: Vec<u8>,
    ) -> Self {
        let name = name.into();
        self.fields.push((
            name.clone(),
            FormValue::File(FileField {
                name,
                filename: filename.into(),
                mime_type,
                contents,
            }),
        ));
        self
    }

    pub fn fields(&self) -> &[(String, FormValue)] {
        &self.fields
    }

    pub fn has_file(&self) -> bool {
        self.fields
            .iter()
            .any(|(_, value)| matches!(value, FormValue::File(_)))
    }

    pub fn into_fields(self) -> Vec<(String, FormValue)> {
        self.fields
    }
}
