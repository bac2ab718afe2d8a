use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use ngxscope_logs::{EventSource, EventStream, SubscribeError};

/// In-process named event emitter
///
/// Every subscription receives each later emission on its event name, in
/// emission order. Closing the bus ends all live streams.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusState>,
}

#[derive(Default)]
struct BusState {
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<Value>>>,
    closed: bool,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every live subscriber of `event_name`
    ///
    /// Returns the number of subscribers reached.
    pub fn emit(&self, event_name: &str, payload: Value) -> usize {
        let mut state = self.inner.lock();
        let Some(senders) = state.subscribers.get_mut(event_name) else {
            return 0;
        };

        // Drop subscribers whose stream is gone
        senders.retain(|tx| tx.send(payload.clone()).is_ok());
        senders.len()
    }

    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.inner
            .lock()
            .subscribers
            .get(event_name)
            .map_or(0, |senders| senders.iter().filter(|tx| !tx.is_closed()).count())
    }

    /// End every stream and refuse new subscriptions
    pub fn close(&self) {
        let mut state = self.inner.lock();
        state.closed = true;
        state.subscribers.clear();
        debug!("event bus closed");
    }
}

#[async_trait]
impl EventSource for EventBus {
    async fn subscribe(&self, event_name: &str) -> Result<EventStream, SubscribeError> {
        let rx = {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(SubscribeError::Closed);
            }
            let (tx, rx) = mpsc::unbounded_channel();
            state
                .subscribers
                .entry(event_name.to_string())
                .or_default()
                .push(tx);
            rx
        };

        debug!(event = event_name, "event bus subscription");
        Ok(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|payload| (payload, rx))
        })
        .boxed())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_delivers_in_emission_order() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe("access_event").await.unwrap();

        for i in 0..5 {
            assert_eq!(bus.emit("access_event", json!(format!("line {i}"))), 1);
        }

        for i in 0..5 {
            assert_eq!(stream.next().await, Some(json!(format!("line {i}"))));
        }
    }

    #[tokio::test]
    async fn test_events_are_routed_by_name() {
        let bus = EventBus::new();
        let mut access = bus.subscribe("access_event").await.unwrap();
        let mut error = bus.subscribe("error_event").await.unwrap();

        bus.emit("error_event", json!("e"));
        bus.emit("access_event", json!("a"));

        assert_eq!(access.next().await, Some(json!("a")));
        assert_eq!(error.next().await, Some(json!("e")));
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_each_emission() {
        let bus = EventBus::new();
        let mut first = bus.subscribe("error_event").await.unwrap();
        let mut second = bus.subscribe("error_event").await.unwrap();

        assert_eq!(bus.emit("error_event", json!("boom")), 2);
        assert_eq!(first.next().await, Some(json!("boom")));
        assert_eq!(second.next().await, Some(json!("boom")));
    }

    #[tokio::test]
    async fn test_dropped_streams_are_pruned() {
        let bus = EventBus::new();
        let stream = bus.subscribe("access_event").await.unwrap();
        assert_eq!(bus.subscriber_count("access_event"), 1);

        drop(stream);
        assert_eq!(bus.subscriber_count("access_event"), 0);
        assert_eq!(bus.emit("access_event", json!("nobody")), 0);
    }

    #[tokio::test]
    async fn test_close_ends_streams_and_refuses_subscribers() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe("access_event").await.unwrap();

        bus.close();

        assert_eq!(stream.next().await, None);
        assert!(matches!(
            bus.subscribe("access_event").await,
            Err(SubscribeError::Closed)
        ));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.emit("access_event", json!("x")), 0);
    }
}
