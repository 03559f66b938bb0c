//! Subscription handles and stream line framing
//!
//! Every inbound stream runs on its own task. The task owns a
//! `SubscriptionTracker` that publishes state transitions; callers hold a
//! cloneable `SubscriptionHandle` to watch or cancel it.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one subscription: `Connecting -> Streaming -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Request sent, waiting for the broker's response headers
    Connecting,

    /// Broker accepted the stream, lines are being delivered
    Streaming,

    /// Terminal. Broker closed, request failed, or cancelled
    Closed,
}

/// Handle for watching and cancelling a running subscription
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    path: String,
    cancel: CancellationToken,
    state: watch::Receiver<SubscriptionState>,
}

impl SubscriptionHandle {
    /// Create a handle and the tracker the subscription task will drive
    pub(crate) fn new(path: impl Into<String>) -> (Self, SubscriptionTracker) {
        let (state_tx, state_rx) = watch::channel(SubscriptionState::Connecting);
        let cancel = CancellationToken::new();

        let handle = Self {
            path: path.into(),
            cancel: cancel.clone(),
            state: state_rx,
        };
        let tracker = SubscriptionTracker {
            state: state_tx,
            cancel,
        };
        (handle, tracker)
    }

    /// Broker path this subscription was opened on
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current state
    pub fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SubscriptionState::Closed
    }

    /// Stop delivering lines and drop the underlying connection
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until the subscription reaches `Closed`
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        // Sender is only dropped after it published Closed
        let _ = state
            .wait_for(|s| *s == SubscriptionState::Closed)
            .await;
    }
}

/// Task-side half of a subscription
///
/// Dropping the tracker marks the subscription `Closed`, whatever path the
/// task took to get there.
#[derive(Debug)]
pub(crate) struct SubscriptionTracker {
    state: watch::Sender<SubscriptionState>,
    cancel: CancellationToken,
}

impl SubscriptionTracker {
    pub(crate) fn set(&self, state: SubscriptionState) {
        self.state.send_replace(state);
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

impl Drop for SubscriptionTracker {
    fn drop(&mut self) {
        self.state.send_replace(SubscriptionState::Closed);
    }
}

/// Filter one raw stream line
///
/// Returns `None` for empty lines and `:` comments (keep-alives); every
/// other line is passed through verbatim.
pub fn inbound_line(line: &str) -> Option<&str> {
    if line.is_empty() || line.starts_with(':') {
        None
    } else {
        Some(line)
    }
}
