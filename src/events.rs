use std::sync::Arc;
use tokio::sync::broadcast;

use crate::pin::PinId;

/// Kind of change reported by the remote change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change notification for the pins collection. The payload is advisory
/// only; consumers respond with a full refresh, not an incremental patch.
#[derive(Debug, Clone)]
pub struct PinChangeNotification {
    pub kind: ChangeKind,
    pub pin_id: Option<PinId>,
}

#[derive(Clone)]
pub struct PinChangeBroadcaster {
    sender: Arc<broadcast::Sender<PinChangeNotification>>,
}

impl PinChangeBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PinChangeNotification> {
        self.sender.subscribe()
    }

    pub fn notify(&self, notification: PinChangeNotification) {
        // Ignore errors when there are no active subscribers
        let _ = self.sender.send(notification);
    }
}
