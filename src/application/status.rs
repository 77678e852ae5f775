use futures::channel::mpsc::UnboundedSender;

use crate::domain::{Phase, StatusUpdate};

/// Anything that displays run progress: a window, a log, a test spy.
///
/// Calls come from the worker and must not block it. Display failures are
/// the sink's own business.
pub trait StatusSink: Send + Sync {
    fn on_status(&self, update: &StatusUpdate);
}

impl<F> StatusSink for F
where
    F: Fn(&StatusUpdate) + Send + Sync,
{
    fn on_status(&self, update: &StatusUpdate) {
        self(update)
    }
}

/// Forwards updates to the UI event loop.
pub struct ChannelSink {
    tx: UnboundedSender<StatusUpdate>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<StatusUpdate>) -> Self {
        Self { tx }
    }
}

impl StatusSink for ChannelSink {
    fn on_status(&self, update: &StatusUpdate) {
        // Receiver gone means the window closed; nothing left to show.
        let _ = self.tx.unbounded_send(update.clone());
    }
}

/// Writes updates to the log, used when running without a window.
#[derive(Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn on_status(&self, update: &StatusUpdate) {
        let percent = update.fraction * 100.0;
        match update.phase {
            Phase::Failed => tracing::error!("{}", update.label),
            Phase::Cancelling | Phase::Cancelled => tracing::warn!("{}", update.label),
            _ if update.track_label.is_empty() => {
                tracing::info!("[{:5.1}%] {}", percent, update.label)
            }
            _ => tracing::info!("[{:5.1}%] {} | {}", percent, update.label, update.track_label),
        }
    }
}
