//! Form submission handling: issues the upload, forwards progress to the view
//! and renders the terminal outcome.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{
    domain::{UploadForm, GENERATED_IMAGE_ID},
    protocol::{LayoutResponse, ServerErrorBody},
};
use tracing::{debug, error, info, warn};

use crate::{
    error::{SubmitError, UploadError},
    progress::{fill_label, fill_width, ProgressEvent, ProgressSink},
    view::{ResultNode, UploadView},
    UploadRequest, UploadTransport,
};

pub const TRANSPORT_ERROR_MESSAGE: &str = "An error occurred. Please try again.";
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Error: unexpected response from server.";

pub type UploadOutcome = Result<LayoutResponse, UploadError>;

/// Submission of the upload form. Handlers must cancel the default
/// navigation; the controller always does.
#[derive(Debug, Default)]
pub struct SubmitEvent {
    default_prevented: bool,
}

impl SubmitEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

pub struct UploadController {
    transport: Arc<dyn UploadTransport>,
    view: Arc<dyn UploadView>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag and re-enables submission, including when the
/// submit future is dropped mid-upload.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    view: &'a dyn UploadView,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.view.set_submit_enabled(true);
    }
}

impl UploadController {
    pub fn new(transport: Arc<dyn UploadTransport>, view: Arc<dyn UploadView>) -> Self {
        Self {
            transport,
            view,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Handles a form submission end to end. Progress notifications are
    /// applied in arrival order and always before the terminal outcome.
    pub async fn on_submit(
        &self,
        event: &mut SubmitEvent,
        form: UploadForm,
    ) -> Result<UploadOutcome, SubmitError> {
        event.prevent_default();

        if !form.has_file() {
            warn!("upload form submitted without a file field");
            return Err(SubmitError::MissingFile);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("upload already in flight; ignoring submission");
            return Err(SubmitError::UploadInFlight);
        }
        let _guard = InFlightGuard {
            flag: &self.in_flight,
            view: self.view.as_ref(),
        };
        self.view.set_submit_enabled(false);

        let request = UploadRequest::new(form);
        let upload_id = request.id;
        info!(
            %upload_id,
            file_bytes = request.file_bytes(),
            fields = request.fields.len(),
            "submitting upload"
        );

        let (sink, mut progress_rx) = ProgressSink::channel();
        let send = self.transport.send(request, sink);
        tokio::pin!(send);

        let result = loop {
            tokio::select! {
                biased;
                Some(progress) = progress_rx.recv() => self.apply_progress(progress),
                result = &mut send => break result,
            }
        };
        while let Ok(progress) = progress_rx.try_recv() {
            self.apply_progress(progress);
        }

        let outcome = match result {
            Ok(response) => self.on_complete(response.status, &response.body),
            Err(err) => {
                error!(%upload_id, error = %err, "upload transport failed");
                self.on_transport_error();
                Err(UploadError::Transport(err))
            }
        };
        if outcome.is_ok() {
            info!(%upload_id, "upload completed");
        }
        Ok(outcome)
    }

    fn apply_progress(&self, progress: ProgressEvent) {
        self.on_upload_progress(progress.loaded, progress.total);
    }

    /// Updates the progress bar; a transfer of unknown size leaves it as is.
    pub fn on_upload_progress(&self, loaded: u64, total: Option<u64>) {
        let Some(percent) = ProgressEvent::new(loaded, total).percent() else {
            return;
        };
        debug!(loaded, ?total, percent, "upload progress");
        self.view.set_progress_visible(true);
        self.view
            .set_progress_fill(&fill_width(percent), &fill_label(percent));
    }

    pub fn on_complete(&self, status: u16, response_body: &str) -> UploadOutcome {
        self.view.set_progress_visible(false);

        if status != 200 {
            match ServerErrorBody::parse(response_body) {
                Some(body) => warn!(status, server_error = %body.error, "upload rejected"),
                None => warn!(status, "upload rejected"),
            }
            self.view.replace_result(vec![ResultNode::Paragraph(format!(
                "Error: {response_body}"
            ))]);
            return Err(UploadError::Application {
                status,
                body: response_body.to_string(),
            });
        }

        match serde_json::from_str::<LayoutResponse>(response_body) {
            Ok(layout) => {
                self.view.replace_result(vec![
                    ResultNode::Paragraph(layout.message.clone()),
                    ResultNode::Image {
                        id: GENERATED_IMAGE_ID.to_string(),
                        src: layout.layout_image.clone(),
                    },
                ]);
                Ok(layout)
            }
            Err(source) => {
                warn!(error = %source, "upload succeeded with malformed response body");
                self.view.replace_result(vec![ResultNode::Paragraph(
                    MALFORMED_RESPONSE_MESSAGE.to_string(),
                )]);
                Err(UploadError::MalformedResponse { source })
            }
        }
    }

    pub fn on_transport_error(&self) {
        self.view.set_progress_visible(false);
        self.view.replace_result(vec![ResultNode::Paragraph(
            TRANSPORT_ERROR_MESSAGE.to_string(),
        )]);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
