//! Notifications delivered to the document's subscriber.

use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Line count or line mapping changed; views should re-layout
    LayoutChanged,
    ProgressChanged(u8),
    IndexBatchReady { completed: bool },
    FilterBatchReady { completed: bool },
    SearchBatchReady { completed: bool },
    /// Human-readable status text, optionally shown only for `timeout`
    Message {
        text: String,
        timeout: Option<Duration>,
    },
}

/// Single-subscriber notification fan-out. Emitting without a subscriber is a no-op.
#[derive(Debug, Default)]
pub(crate) struct Notifier {
    subscriber: Option<UnboundedSender<Notification>>,
}

impl Notifier {
    /// Replace the current subscriber with a fresh stream.
    pub(crate) fn subscribe(&mut self) -> UnboundedReceiverStream<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriber = Some(tx);
        UnboundedReceiverStream::new(rx)
    }

    pub(crate) fn emit(&mut self, notification: Notification) {
        if let Some(tx) = &self.subscriber {
            if tx.send(notification).is_err() {
                self.subscriber = None;
            }
        }
    }

    pub(crate) fn message(&mut self, text: impl Into<String>, timeout: Option<Duration>) {
        self.emit(Notification::Message {
            text: text.into(),
            timeout,
        });
    }
}
