//! Fire-and-forget status notifications for host UIs.
//!
//! The core never waits on the receiver: if nobody is listening, reports
//! are dropped silently.

use tokio::sync::mpsc;

/// One status/progress message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub message: String,
}

/// Sending half of the status channel.
#[derive(Debug, Clone)]
pub struct StatusSink {
    sender: Option<mpsc::UnboundedSender<StatusUpdate>>,
}

impl StatusSink {
    /// Create a connected sink and its receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A sink that drops everything, for hosts that don't listen.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Send a status message. Never blocks, never fails.
    pub fn report(&self, message: impl Into<String>) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(StatusUpdate {
                message: message.into(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_sink_delivers() {
        let (sink, mut receiver) = StatusSink::channel();
        sink.report("saving");
        assert_eq!(
            receiver.try_recv().expect("one update").message,
            "saving"
        );
    }

    #[test]
    fn disabled_sink_is_silent() {
        let sink = StatusSink::disabled();
        sink.report("nobody hears this");
    }

    #[test]
    fn dropped_receiver_is_tolerated() {
        let (sink, receiver) = StatusSink::channel();
        drop(receiver);
        sink.report("still fine");
    }
}
