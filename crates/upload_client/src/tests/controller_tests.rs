use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use shared::error::OutcomeKind;
use tokio::sync::Notify;

use super::*;
use crate::{view::MemoryView, RawResponse, TransportError};

/// Replays a fixed list of progress events, then answers with `result`.
struct ScriptedTransport {
    progress: Vec<(u64, Option<u64>)>,
    result: Result<RawResponse, TransportError>,
    seen_fields: StdMutex<Vec<String>>,
}

impl ScriptedTransport {
    fn responding(status: u16, body: &str) -> Self {
        Self {
            progress: Vec::new(),
            result: Ok(RawResponse {
                status,
                body: body.to_string(),
            }),
            seen_fields: StdMutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            progress: Vec::new(),
            result: Err(TransportError::new(message)),
            seen_fields: StdMutex::new(Vec::new()),
        }
    }

    fn with_progress(mut self, progress: Vec<(u64, Option<u64>)>) -> Self {
        self.progress = progress;
        self
    }
}

#[async_trait]
impl UploadTransport for ScriptedTransport {
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressSink,
    ) -> Result<RawResponse, TransportError> {
        self.seen_fields
            .lock()
            .expect("fields lock")
            .extend(request.fields.iter().map(|(name, _)| name.clone()));
        for (loaded, total) in &self.progress {
            progress.report(*loaded, *total);
            tokio::task::yield_now().await;
        }
        self.result.clone()
    }
}

/// Blocks inside `send` until released, so a second submission can race it.
struct GatedTransport {
    started: Notify,
    release: Notify,
}

#[async_trait]
impl UploadTransport for GatedTransport {
    async fn send(
        &self,
        _request: UploadRequest,
        _progress: ProgressSink,
    ) -> Result<RawResponse, TransportError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(RawResponse {
            status: 200,
            body: r#"{"message":"done","layout_image":"/static/final_layout.png"}"#.to_string(),
        })
    }
}

/// Records every view mutation in order.
#[derive(Default)]
struct RecordingView {
    calls: StdMutex<Vec<String>>,
}

impl RecordingView {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl UploadView for RecordingView {
    fn set_progress_visible(&self, visible: bool) {
        self.record(format!("visible:{visible}"));
    }

    fn set_progress_fill(&self, width: &str, label: &str) {
        self.record(format!("fill:{width}:{label}"));
    }

    fn replace_result(&self, nodes: Vec<ResultNode>) {
        let text: String = nodes.iter().map(ResultNode::text).collect();
        self.record(format!("result:{text}"));
    }

    fn set_submit_enabled(&self, enabled: bool) {
        self.record(format!("submit:{enabled}"));
    }
}

fn spreadsheet_form() -> UploadForm {
    UploadForm::new().file(
        "file",
        "families.xlsx",
        None,
        b"family,kids,occupation,workplace".to_vec(),
    )
}

fn controller_with(
    transport: impl UploadTransport + 'static,
) -> (UploadController, Arc<MemoryView>) {
    let view = Arc::new(MemoryView::new());
    let controller = UploadController::new(Arc::new(transport), view.clone());
    (controller, view)
}

#[tokio::test]
async fn success_renders_message_and_generated_image() {
    let (controller, view) = controller_with(ScriptedTransport::responding(
        200,
        r#"{"message":"Layout generated","layout_image":"/images/out.png"}"#,
    ));
    let mut event = SubmitEvent::new();

    let outcome = controller
        .on_submit(&mut event, spreadsheet_form())
        .await
        .expect("submitted");

    let layout = outcome.expect("layout");
    assert_eq!(layout.message, "Layout generated");
    let state = view.snapshot();
    assert_eq!(
        state.result,
        vec![
            ResultNode::Paragraph("Layout generated".to_string()),
            ResultNode::Image {
                id: "generatedImage".to_string(),
                src: "/images/out.png".to_string(),
            },
        ]
    );
    assert!(!state.progress_visible);
    assert!(event.default_prevented());
}

#[tokio::test]
async fn non_200_renders_raw_body_verbatim() {
    let (controller, view) = controller_with(ScriptedTransport::responding(404, "not found"));
    let mut event = SubmitEvent::new();

    let outcome = controller
        .on_submit(&mut event, spreadsheet_form())
        .await
        .expect("submitted");

    match outcome {
        Err(UploadError::Application { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "not found");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(view.result_text(), "Error: not found");
    assert!(!view.snapshot().progress_visible);
}

#[tokio::test]
async fn server_json_error_body_is_not_parsed_for_display() {
    let body = r#"{"error": "Missing column: Kids"}"#;
    let (controller, view) = controller_with(ScriptedTransport::responding(400, body));

    let outcome = controller
        .on_submit(&mut SubmitEvent::new(), spreadsheet_form())
        .await
        .expect("submitted");

    assert_eq!(outcome.expect_err("error").kind(), OutcomeKind::ApplicationError);
    assert_eq!(view.result_text(), format!("Error: {body}"));
}

#[tokio::test]
async fn transport_failure_renders_fixed_message_and_hides_bar() {
    let (controller, view) = controller_with(
        ScriptedTransport::failing("connection refused")
            .with_progress(vec![(10, Some(100)), (40, Some(100))]),
    );

    let outcome = controller
        .on_submit(&mut SubmitEvent::new(), spreadsheet_form())
        .await
        .expect("submitted");

    assert!(matches!(outcome, Err(UploadError::Transport(_))));
    let state = view.snapshot();
    assert_eq!(state.result_text(), "An error occurred. Please try again.");
    assert!(!state.progress_visible);
    assert_eq!(state.progress_label, "40%");
}

#[tokio::test]
async fn malformed_success_body_is_a_distinct_error() {
    for body in [
        "<html>oops</html>",
        r#"{"message":"only message"}"#,
        r#"{"layout_image":"/x.png"}"#,
    ] {
        let (controller, view) = controller_with(
            ScriptedTransport::responding(200, body).with_progress(vec![(5, Some(10))]),
        );

        let outcome = controller
            .on_submit(&mut SubmitEvent::new(), spreadsheet_form())
            .await
            .expect("submitted");

        assert!(
            matches!(outcome, Err(UploadError::MalformedResponse { .. })),
            "body {body} should be malformed"
        );
        let state = view.snapshot();
        assert_eq!(state.result_text(), MALFORMED_RESPONSE_MESSAGE);
        assert!(!state.progress_visible);
    }
}

#[tokio::test]
async fn progress_precedes_single_terminal_render() {
    let view = Arc::new(RecordingView::default());
    let controller = UploadController::new(
        Arc::new(
            ScriptedTransport::responding(
                200,
                r#"{"message":"ok","layout_image":"/static/final_layout.png"}"#,
            )
            .with_progress(vec![(1, Some(4)), (2, None), (4, Some(4))]),
        ),
        view.clone(),
    );

    controller
        .on_submit(&mut SubmitEvent::new(), spreadsheet_form())
        .await
        .expect("submitted")
        .expect("layout");

    assert_eq!(
        view.calls(),
        vec![
            "submit:false",
            "visible:true",
            "fill:25%:25%",
            "visible:true",
            "fill:100%:100%",
            "visible:false",
            "result:ok",
            "submit:true",
        ]
    );
}

#[test]
fn progress_with_unknown_total_leaves_bar_untouched() {
    let (controller, view) = controller_with(ScriptedTransport::responding(200, "{}"));

    controller.on_upload_progress(512, None);
    controller.on_upload_progress(0, Some(0));

    let state = view.snapshot();
    assert_eq!(state.progress_updates, 0);
    assert!(!state.progress_visible);
    assert_eq!(state.progress_width, "0%");
}

#[test]
fn progress_label_is_rounded_percentage() {
    let (controller, view) = controller_with(ScriptedTransport::responding(200, "{}"));

    for (loaded, total) in [(1u64, 3u64), (2, 3), (1, 8), (7, 7), (999, 1000)] {
        controller.on_upload_progress(loaded, Some(total));
        let percent = loaded as f64 / total as f64 * 100.0;
        let state = view.snapshot();
        assert!(state.progress_visible);
        assert_eq!(state.progress_label, format!("{}%", percent.round()));
        assert_eq!(state.progress_width, format!("{percent}%"));
    }
    assert_eq!(view.snapshot().progress_label, "100%");
}

#[tokio::test]
async fn missing_file_is_rejected_but_navigation_still_prevented() {
    let transport = ScriptedTransport::responding(200, "{}");
    let (controller, view) = controller_with(transport);
    let mut event = SubmitEvent::new();

    let err = controller
        .on_submit(&mut event, UploadForm::new().text("district", "north"))
        .await
        .expect_err("no file");

    assert_eq!(err, SubmitError::MissingFile);
    assert!(event.default_prevented());
    assert!(view.snapshot().result.is_empty());
}

#[tokio::test]
async fn all_named_fields_reach_the_transport() {
    let transport = Arc::new(ScriptedTransport::responding(
        200,
        r#"{"message":"m","layout_image":"/i.png"}"#,
    ));
    let view = Arc::new(MemoryView::new());
    let controller = UploadController::new(transport.clone(), view);

    let form = spreadsheet_form().text("district", "north").text("note", "batch 2");
    controller
        .on_submit(&mut SubmitEvent::new(), form)
        .await
        .expect("submitted")
        .expect("layout");

    assert_eq!(
        *transport.seen_fields.lock().expect("fields lock"),
        vec!["file", "district", "note"]
    );
}

#[tokio::test]
async fn second_submission_while_in_flight_is_rejected() {
    let transport = Arc::new(GatedTransport {
        started: Notify::new(),
        release: Notify::new(),
    });
    let view = Arc::new(MemoryView::new());
    let controller = UploadController::new(transport.clone(), view.clone());

    let mut first_event = SubmitEvent::new();
    let first = controller.on_submit(&mut first_event, spreadsheet_form());
    tokio::pin!(first);

    tokio::select! {
        _ = &mut first => panic!("first upload finished before release"),
        _ = transport.started.notified() => {}
    }
    assert!(controller.is_uploading());
    assert!(!view.snapshot().submit_enabled);

    let mut second_event = SubmitEvent::new();
    let err = controller
        .on_submit(&mut second_event, spreadsheet_form())
        .await
        .expect_err("in flight");
    assert_eq!(err, SubmitError::UploadInFlight);
    assert!(second_event.default_prevented());

    transport.release.notify_one();
    let layout = first.await.expect("submitted").expect("layout");
    assert_eq!(layout.message, "done");
    assert!(!controller.is_uploading());
    assert!(view.snapshot().submit_enabled);
}

#[tokio::test]
async fn controller_accepts_a_new_upload_after_completion() {
    let (controller, view) = controller_with(ScriptedTransport::responding(503, "busy"));

    for _ in 0..2 {
        let outcome = controller
            .on_submit(&mut SubmitEvent::new(), spreadsheet_form())
            .await
            .expect("submitted");
        assert!(outcome.is_err());
    }
    assert_eq!(view.result_text(), "Error: busy");
}
