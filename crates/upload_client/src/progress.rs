//! Upload progress reporting: events, percentage math and the chunked body
//! stream that emits them.

use futures::{future, stream, Stream, StreamExt};
use tokio::sync::mpsc;

/// Size of the chunks the file body is handed to the HTTP stack in.
pub const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub loaded: u64,
    /// `None` when the transfer size is not known in advance.
    pub total: Option<u64>,
}

impl ProgressEvent {
    pub fn new(loaded: u64, total: Option<u64>) -> Self {
        Self { loaded, total }
    }

    /// Percentage complete, or `None` when it cannot be computed.
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.loaded as f64 / total as f64 * 100.0),
            _ => None,
        }
    }
}

/// Fill width of the progress bar, e.g. `"37.5%"`.
pub fn fill_width(percent: f64) -> String {
    format!("{percent}%")
}

/// Label shown inside the progress bar, rounded to a whole percent.
pub fn fill_label(percent: f64) -> String {
    format!("{}%", percent.round())
}

/// Sending half handed to a transport; the controller owns the receiver.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn report(&self, loaded: u64, total: Option<u64>) {
        // Receiver gone means nobody renders progress anymore.
        let _ = self.tx.send(ProgressEvent::new(loaded, total));
    }
}

/// Splits `contents` into chunks and reports cumulative progress each time
/// the HTTP body pulls one.
pub fn progress_stream(
    contents: Vec<u8>,
    chunk_bytes: usize,
    sink: ProgressSink,
) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + Sync + 'static {
    let total = contents.len() as u64;
    let chunks: Vec<Vec<u8>> = contents
        .chunks(chunk_bytes.max(1))
        .map(<[u8]>::to_vec)
        .collect();

    stream::iter(chunks).scan(0u64, move |sent, chunk| {
        *sent += chunk.len() as u64;
        sink.report(*sent, Some(total));
        future::ready(Some(Ok::<_, std::io::Error>(chunk)))
    })
}
