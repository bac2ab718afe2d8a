use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use ngxscope_logs::{
    EventSource, EventStream, LogChannel, LogPipeline, LogUpdate, Placeholder, Projection,
    PushListener, SubscribeError,
};

/// In-memory event emitter standing in for the desktop bridge
#[derive(Default)]
struct FakeBridge {
    subscribers: Mutex<HashMap<String, mpsc::UnboundedSender<Value>>>,
    refuse: HashSet<String>,
}

impl FakeBridge {
    fn refusing(event_name: &str) -> Self {
        Self {
            refuse: HashSet::from([event_name.to_string()]),
            ..Default::default()
        }
    }

    fn emit(&self, event_name: &str, payload: Value) -> bool {
        match self.subscribers.lock().unwrap().get(event_name) {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl EventSource for FakeBridge {
    async fn subscribe(&self, event_name: &str) -> Result<EventStream, SubscribeError> {
        if self.refuse.contains(event_name) {
            return Err(SubscribeError::Rejected {
                event: event_name.to_string(),
                reason: "not permitted".to_string(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap()
            .insert(event_name.to_string(), tx);

        Ok(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|payload| (payload, rx))
        })
        .boxed())
    }
}

async fn apply_next(
    pipeline: &mut LogPipeline,
    rx: &mut mpsc::UnboundedReceiver<LogUpdate>,
    count: usize,
) {
    for _ in 0..count {
        let update = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("update within timeout")
            .expect("channel open");
        pipeline.apply(update);
    }
}

#[tokio::test]
async fn test_events_are_appended_in_delivery_order() {
    let bridge = Arc::new(FakeBridge::default());
    let strategy = Box::new(PushListener::new(Arc::clone(&bridge)));
    let (mut pipeline, mut rx) = LogPipeline::start(strategy, 1000).await;

    assert!(bridge.emit("access_event", json!("a1")));
    assert!(bridge.emit("error_event", json!("e1")));
    assert!(bridge.emit("access_event", json!("a2")));
    assert!(bridge.emit("access_event", json!("a2")));
    apply_next(&mut pipeline, &mut rx, 4).await;

    let view = pipeline.view();
    // No deduplication
    assert_eq!(view.visible(LogChannel::Access), vec!["a1", "a2", "a2"]);
    assert_eq!(view.visible(LogChannel::Error), vec!["e1"]);
}

#[tokio::test]
async fn test_push_buffer_stays_bounded() {
    let bridge = Arc::new(FakeBridge::default());
    let strategy = Box::new(PushListener::new(Arc::clone(&bridge)));
    let (mut pipeline, mut rx) = LogPipeline::start(strategy, 10).await;

    for i in 0..25 {
        bridge.emit("error_event", json!(format!("line {i}")));
    }
    apply_next(&mut pipeline, &mut rx, 25).await;

    let lines = pipeline.view().visible(LogChannel::Error);
    assert_eq!(lines.len(), 10);
    assert_eq!(lines.first(), Some(&"line 15"));
    assert_eq!(lines.last(), Some(&"line 24"));
}

#[tokio::test]
async fn test_malformed_payloads_never_enter_the_pipeline() {
    let bridge = Arc::new(FakeBridge::default());
    let strategy = Box::new(PushListener::new(Arc::clone(&bridge)));
    let (mut pipeline, mut rx) = LogPipeline::start(strategy, 1000).await;

    bridge.emit("access_event", json!(42));
    bridge.emit("access_event", json!({"line": "nested"}));
    bridge.emit("access_event", json!("ok"));
    apply_next(&mut pipeline, &mut rx, 1).await;

    assert_eq!(pipeline.view().visible(LogChannel::Access), vec!["ok"]);
}

#[tokio::test]
async fn test_failed_subscription_leaves_channel_empty() {
    let bridge = Arc::new(FakeBridge::refusing("error_event"));
    let strategy = Box::new(PushListener::new(Arc::clone(&bridge)));
    let (mut pipeline, mut rx) = LogPipeline::start(strategy, 1000).await;

    assert!(!bridge.emit("error_event", json!("never delivered")));
    assert!(bridge.emit("access_event", json!("still works")));
    apply_next(&mut pipeline, &mut rx, 1).await;

    assert_eq!(pipeline.view().visible(LogChannel::Access), vec!["still works"]);
    assert_eq!(
        pipeline.view().projection(LogChannel::Error),
        Projection::Empty(Placeholder::NoData)
    );
}

#[tokio::test]
async fn test_no_mutation_after_shutdown() {
    let bridge = Arc::new(FakeBridge::default());
    let strategy = Box::new(PushListener::new(Arc::clone(&bridge)));
    let (mut pipeline, mut rx) = LogPipeline::start(strategy, 1000).await;

    bridge.emit("access_event", json!("before"));
    apply_next(&mut pipeline, &mut rx, 1).await;

    pipeline.shutdown();
    bridge.emit("access_event", json!("after"));

    // Listeners are gone, so the update channel drains and closes
    let drained = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(update) = rx.recv().await {
            assert!(!pipeline.apply(update));
        }
    })
    .await;
    assert!(drained.is_ok(), "update channel should close after shutdown");
    assert_eq!(pipeline.view().visible(LogChannel::Access), vec!["before"]);
}
