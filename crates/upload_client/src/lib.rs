use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Body, Client,
};
use shared::{
    domain::{FileField, FormValue, UploadForm, UploadId},
    protocol::UPLOAD_PATH,
};
use tracing::{debug, info, warn};
use url::Url;

pub mod controller;
pub mod error;
pub mod progress;
pub mod view;

pub use controller::{SubmitEvent, UploadController, UploadOutcome};
pub use error::{SubmitError, TransportError, UploadError};
pub use progress::{ProgressEvent, ProgressSink};
pub use view::{HtmlView, MemoryView, ResultNode, UploadView, ViewState};

use progress::{progress_stream, UPLOAD_CHUNK_BYTES};

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// The form's fields packaged for one submission.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub id: UploadId,
    pub fields: Vec<(String, FormValue)>,
}

impl UploadRequest {
    pub fn new(form: UploadForm) -> Self {
        Self {
            id: UploadId::new(),
            fields: form.into_fields(),
        }
    }

    pub fn file_bytes(&self) -> u64 {
        self.fields
            .iter()
            .map(|(_, value)| match value {
                FormValue::File(file) => file.contents.len() as u64,
                FormValue::Text(_) => 0,
            })
            .sum()
    }
}

/// Status and raw body of whatever the server answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Sends the request, reporting file progress through `progress`. Any
    /// response, whatever its status, is `Ok`.
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressSink,
    ) -> std::result::Result<RawResponse, TransportError>;
}

pub struct HttpUploadClient {
    http: Client,
    base_url: Url,
    upload_url: Url,
}

impl HttpUploadClient {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(server_url)
            .with_context(|| format!("invalid server url '{server_url}'"))?;
        let upload_url = base_url
            .join(UPLOAD_PATH)
            .with_context(|| format!("failed to resolve {UPLOAD_PATH} against {base_url}"))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url,
            upload_url,
        })
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    /// Resolves a `layout_image` reference (usually a server-relative path)
    /// against the server url.
    pub fn layout_image_url(&self, layout_image: &str) -> Result<Url> {
        self.base_url
            .join(layout_image)
            .with_context(|| format!("invalid layout image reference '{layout_image}'"))
    }

    pub async fn fetch_layout_image(&self, layout_image: &str) -> Result<Vec<u8>> {
        let url = self.layout_image_url(layout_image)?;
        info!(%url, "downloading layout image");
        let bytes = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to request {url}"))?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

fn file_part(
    file: FileField,
    progress: ProgressSink,
) -> std::result::Result<Part, TransportError> {
    let total = file.contents.len() as u64;
    let body = Body::wrap_stream(progress_stream(
        file.contents,
        UPLOAD_CHUNK_BYTES,
        progress,
    ));
    let mime_type = file
        .mime_type
        .or_else(|| {
            mime_guess::from_path(&file.filename)
                .first_raw()
                .map(str::to_string)
        })
        .filter(|mime| {
            let valid = mime.parse::<mime_guess::Mime>().is_ok();
            if !valid {
                warn!(mime_type = %mime, "dropping invalid mime type from upload");
            }
            valid
        });

    let part = Part::stream_with_length(body, total).file_name(file.filename);
    match mime_type {
        Some(mime) => Ok(part.mime_str(&mime)?),
        None => Ok(part),
    }
}

fn build_form(
    fields: Vec<(String, FormValue)>,
    progress: ProgressSink,
) -> std::result::Result<Form, TransportError> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = match value {
            FormValue::Text(text) => form.text(name, text),
            FormValue::File(file) => form.part(name, file_part(file, progress.clone())?),
        };
    }
    Ok(form)
}

#[async_trait]
impl UploadTransport for HttpUploadClient {
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressSink,
    ) -> std::result::Result<RawResponse, TransportError> {
        let form = build_form(request.fields, progress)?;
        debug!(upload_id = %request.id, url = %self.upload_url, "posting multipart upload");

        let response = self
            .http
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
