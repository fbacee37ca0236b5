//! View capability the upload controller renders into, plus the in-memory and
//! HTML implementations.

use std::sync::{Mutex, MutexGuard, PoisonError};

use shared::domain::{LOADING_BAR_CONTAINER_ID, LOADING_BAR_ID, RESULT_ID};

/// Content node placed in the result area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultNode {
    Paragraph(String),
    Image { id: String, src: String },
}

impl ResultNode {
    pub fn text(&self) -> &str {
        match self {
            ResultNode::Paragraph(text) => text,
            ResultNode::Image { .. } => "",
        }
    }
}

/// The handles the controller mutates: progress container visibility, the
/// progress fill, the result area and the submit control.
pub trait UploadView: Send + Sync {
    fn set_progress_visible(&self, visible: bool);
    fn set_progress_fill(&self, width: &str, label: &str);
    fn replace_result(&self, nodes: Vec<ResultNode>);
    fn set_submit_enabled(&self, _enabled: bool) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub progress_visible: bool,
    pub progress_width: String,
    pub progress_label: String,
    pub result: Vec<ResultNode>,
    pub submit_enabled: bool,
    pub progress_updates: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            progress_visible: false,
            progress_width: "0%".to_string(),
            progress_label: String::new(),
            result: Vec::new(),
            submit_enabled: true,
            progress_updates: 0,
        }
    }
}

impl ViewState {
    /// Concatenated text content of the result area.
    pub fn result_text(&self) -> String {
        self.result.iter().map(ResultNode::text).collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryView {
    state: Mutex<ViewState>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ViewState {
        self.lock().clone()
    }

    pub fn result_text(&self) -> String {
        self.lock().result_text()
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UploadView for MemoryView {
    fn set_progress_visible(&self, visible: bool) {
        self.lock().progress_visible = visible;
    }

    fn set_progress_fill(&self, width: &str, label: &str) {
        let mut state = self.lock();
        state.progress_width = width.to_string();
        state.progress_label = label.to_string();
        state.progress_updates += 1;
    }

    fn replace_result(&self, nodes: Vec<ResultNode>) {
        self.lock().result = nodes;
    }

    fn set_submit_enabled(&self, enabled: bool) {
        self.lock().submit_enabled = enabled;
    }
}

/// Keeps the page state and renders it as markup. All text and attribute
/// values are escaped, so server-provided bodies never become markup.
#[derive(Debug, Default)]
pub struct HtmlView {
    inner: MemoryView,
}

impl HtmlView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ViewState {
        self.inner.snapshot()
    }

    pub fn render_result(&self) -> String {
        let state = self.inner.snapshot();
        let mut html = format!(r#"<div id="{RESULT_ID}">"#);
        for node in &state.result {
            match node {
                ResultNode::Paragraph(text) => {
                    html.push_str("<p>");
                    html.push_str(&escape_html(text));
                    html.push_str("</p>");
                }
                ResultNode::Image { id, src } => {
                    html.push_str(&format!(
                        r#"<img id="{}" src="{}">"#,
                        escape_html(id),
                        escape_html(src)
                    ));
                }
            }
        }
        html.push_str("</div>");
        html
    }

    pub fn render_progress(&self) -> String {
        let state = self.inner.snapshot();
        let display = if state.progress_visible {
            "block"
        } else {
            "none"
        };
        format!(
            r#"<div id="{LOADING_BAR_CONTAINER_ID}" style="display: {display}"><div id="{LOADING_BAR_ID}" style="width: {}">{}</div></div>"#,
            escape_html(&state.progress_width),
            escape_html(&state.progress_label)
        )
    }
}

impl UploadView for HtmlView {
    fn set_progress_visible(&self, visible: bool) {
        self.inner.set_progress_visible(visible);
    }

    fn set_progress_fill(&self, width: &str, label: &str) {
        self.inner.set_progress_fill(width, label);
    }

    fn replace_result(&self, nodes: Vec<ResultNode>) {
        self.inner.replace_result(nodes);
    }

    fn set_submit_enabled(&self, enabled: bool) {
        self.inner.set_submit_enabled(enabled);
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
