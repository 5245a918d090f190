//! In-process event publication
//!
//! Long-running acquisitions announce themselves here so a UI can render
//! progress. Publishing never blocks and never fails; events published with
//! no subscriber are dropped.

use crate::progress::AggregateProgress;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default number of buffered events per subscriber
const DEFAULT_CAPACITY: usize = 16;

/// What an event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// An image is being saved from the daemon and copied to disk
    SaveImage,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SaveImage => "save-image",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published event with a live progress handle
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    /// Image the event concerns
    pub image: String,
    pub progress: Arc<AggregateProgress>,
}

/// Broadcast bus for [`Event`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to every current subscriber
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Strategy;

    fn save_event() -> Event {
        Event {
            kind: EventKind::SaveImage,
            image: "busybox:latest".to_string(),
            progress: Arc::new(AggregateProgress::new(Strategy::Normalize)),
        }
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::default();
        bus.publish(save_event());
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(save_event());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::SaveImage);
        assert_eq!(event.kind.to_string(), "save-image");
        assert_eq!(event.image, "busybox:latest");
    }
}
