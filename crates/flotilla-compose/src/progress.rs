//! Progress reporting for bulk operations.
//!
//! The executor emits one event per container state change. Sinks must not
//! block the emitter: [`ChannelSink`] hands events to a renderer task over
//! an unbounded channel, [`TracingSink`] logs them, [`MemorySink`] keeps
//! them for inspection.

use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Status of a progress item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// The mutation has started.
    Working,
    /// The mutation completed, or the target was already gone.
    Done,
    /// The mutation failed.
    Error,
}

/// A per-container progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Stable item key, e.g. `Container shop-web-1`.
    pub id: String,
    /// Item status.
    pub status: EventStatus,
    /// Short status text, e.g. `Removing`.
    pub text: String,
    /// Error message for failed items.
    pub detail: Option<String>,
}

impl ProgressEvent {
    /// A mutation has started on `id`.
    #[must_use]
    pub fn starting(id: impl Into<String>, text: &str) -> Self {
        Self {
            id: id.into(),
            status: EventStatus::Working,
            text: text.to_string(),
            detail: None,
        }
    }

    /// A mutation has completed on `id`.
    #[must_use]
    pub fn completed(id: impl Into<String>, text: &str) -> Self {
        Self {
            id: id.into(),
            status: EventStatus::Done,
            text: text.to_string(),
            detail: None,
        }
    }

    /// A mutation has failed on `id`.
    #[must_use]
    pub fn failed(id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            id: id.into(),
            status: EventStatus::Error,
            text: "Error".to_string(),
            detail: Some(error.to_string()),
        }
    }
}

/// Status texts of one kind of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventLabels {
    /// Title shown above the items.
    pub title: &'static str,
    /// Text of a started item.
    pub working: &'static str,
    /// Text of a finished item.
    pub done: &'static str,
}

/// Labels for container removal.
pub const REMOVING: EventLabels = EventLabels {
    title: "Removing",
    working: "Removing",
    done: "Removed",
};

/// Labels for container stop.
pub const STOPPING: EventLabels = EventLabels {
    title: "Stopping",
    working: "Stopping",
    done: "Stopped",
};

/// Labels for container kill.
pub const KILLING: EventLabels = EventLabels {
    title: "Killing",
    working: "Killing",
    done: "Killed",
};

/// Labels for container pause.
pub const PAUSING: EventLabels = EventLabels {
    title: "Pausing",
    working: "Pausing",
    done: "Paused",
};

/// Labels for container unpause.
pub const UNPAUSING: EventLabels = EventLabels {
    title: "Unpausing",
    working: "Unpausing",
    done: "Unpaused",
};

/// Receives progress of bulk operations.
pub trait ProgressSink: Send + Sync {
    /// An operation titled `title` begins.
    fn begin(&self, title: &str) {
        let _ = title;
    }

    /// A container changed state.
    fn emit(&self, event: ProgressEvent);

    /// The current operation finished.
    fn end(&self) {}

    /// A neutral informational message, e.g. "nothing to do".
    fn notice(&self, message: &str) {
        tracing::info!("{message}");
    }

    /// Resolves once everything sent so far has been displayed.
    fn flush(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(std::future::ready(()))
    }
}

/// Acknowledgement slot of a [`ProgressMessage::Flush`], fired by the
/// renderer once every earlier message is written.
#[derive(Debug, Clone)]
pub struct FlushAck(Arc<Mutex<Option<oneshot::Sender<()>>>>);

impl FlushAck {
    fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self(Arc::new(Mutex::new(Some(tx)))), rx)
    }

    fn fire(&self) {
        let tx = self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(tx) = tx {
            let _ = tx.send(());
        }
    }
}

impl PartialEq for FlushAck {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for FlushAck {}

/// Everything a sink can receive, as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressMessage {
    /// See [`ProgressSink::begin`].
    Begin(String),
    /// See [`ProgressSink::emit`].
    Event(ProgressEvent),
    /// See [`ProgressSink::end`].
    End,
    /// See [`ProgressSink::notice`].
    Notice(String),
    /// See [`ProgressSink::flush`].
    Flush(FlushAck),
}

/// Logs progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn begin(&self, title: &str) {
        tracing::info!(title, "operation started");
    }

    fn emit(&self, event: ProgressEvent) {
        match event.status {
            EventStatus::Error => {
                tracing::warn!(item = %event.id, error = ?event.detail, "{}", event.text);
            }
            _ => tracing::info!(item = %event.id, "{}", event.text),
        }
    }
}

/// Collects every message in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<ProgressMessage>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, message: ProgressMessage) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    /// Returns everything received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<ProgressMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the events received so far, without titles and notices.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                ProgressMessage::Event(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    /// Returns the notices received so far.
    #[must_use]
    pub fn notices(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                ProgressMessage::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for MemorySink {
    fn begin(&self, title: &str) {
        self.push(ProgressMessage::Begin(title.to_string()));
    }

    fn emit(&self, event: ProgressEvent) {
        self.push(ProgressMessage::Event(event));
    }

    fn end(&self) {
        self.push(ProgressMessage::End);
    }

    fn notice(&self, message: &str) {
        self.push(ProgressMessage::Notice(message.to_string()));
    }
}

/// Forwards progress to a renderer over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressMessage>,
}

impl ChannelSink {
    fn send(&self, message: ProgressMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!("progress renderer has shut down");
        }
    }
}

impl ProgressSink for ChannelSink {
    fn begin(&self, title: &str) {
        self.send(ProgressMessage::Begin(title.to_string()));
    }

    fn emit(&self, event: ProgressEvent) {
        self.send(ProgressMessage::Event(event));
    }

    fn end(&self) {
        self.send(ProgressMessage::End);
    }

    fn notice(&self, message: &str) {
        self.send(ProgressMessage::Notice(message.to_string()));
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        let (ack, rx) = FlushAck::new();
        self.send(ProgressMessage::Flush(ack));
        Box::pin(async move {
            // A closed renderer drops the ack; nothing is left to wait for.
            let _ = rx.await;
        })
    }
}

/// Creates a channel sink and the receiving end for a renderer.
#[must_use]
pub fn channel() -> (ChannelSink, mpsc::UnboundedReceiver<ProgressMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

/// Formats one message as a terminal line.
#[must_use]
pub fn render_line(message: &ProgressMessage) -> Option<String> {
    match message {
        ProgressMessage::Begin(title) => Some(format!("[+] {title}")),
        ProgressMessage::Event(event) => Some(match event.status {
            EventStatus::Working => format!(" ⠿ {}  {}", event.id, event.text),
            EventStatus::Done => format!(" ✔ {}  {}", event.id, event.text),
            EventStatus::Error => format!(
                " ✘ {}  {}: {}",
                event.id,
                event.text,
                event.detail.as_deref().unwrap_or("unknown error")
            ),
        }),
        ProgressMessage::End | ProgressMessage::Flush(_) => None,
        ProgressMessage::Notice(notice) => Some(notice.clone()),
    }
}

/// Spawns a task writing every message to `out` until all senders are
/// dropped. The task returns the writer.
pub fn spawn_renderer<W>(mut rx: mpsc::UnboundedReceiver<ProgressMessage>, mut out: W) -> JoinHandle<W>
where
    W: Write + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let ProgressMessage::Flush(ack) = &message {
                let _ = out.flush();
                ack.fire();
                continue;
            }
            if let Some(line) = render_line(&message) {
                if writeln!(out, "{line}").is_err() {
                    tracing::debug!("progress output closed");
                }
            }
        }
        let _ = out.flush();
        out
    })
}

/// Runs `operation` bracketed by `begin(title)` and `end()` on `sink`.
pub async fn run_with_title<F, T>(sink: &dyn ProgressSink, title: &str, operation: F) -> T
where
    F: Future<Output = T>,
{
    sink.begin(title);
    let result = operation.await;
    sink.end();
    result
}
