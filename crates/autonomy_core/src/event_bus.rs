//! Typed pub/sub with a bounded queue and per-handler failure isolation (§4.1).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::events::{Event, EventKind};

/// Handlers are invoked sequentially, in subscription order, for events of
/// the kind they registered for. A handler error is logged and does not
/// stop later handlers or the dispatcher.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> EventHandler for F
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync,
{
    async fn handle(&self, event: &Event) -> anyhow::Result<()> {
        (self)(event)
    }
}

const DEFAULT_QUEUE_CAPACITY: usize = 1000;
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(1);

struct Inner {
    handlers: RwLock<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>,
    tx: mpsc::Sender<Event>,
    rx: Mutex<Option<mpsc::Receiver<Event>>>,
}

/// Bounded, typed event bus. A single dispatcher task drains the queue once
/// `start()` is called.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
    dispatcher: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                handlers: RwLock::new(HashMap::new()),
                tx,
                rx: Mutex::new(Some(rx)),
            }),
            dispatcher: Arc::new(Mutex::new(None)),
        }
    }

    /// Register a handler for an event kind. Handlers for the same kind run
    /// in the order they were subscribed.
    pub async fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.inner.handlers.write().await;
        handlers.entry(kind).or_default().push(handler);
    }

    /// Publish an event. Waits up to ~1s for queue space; on timeout the
    /// event is dropped and logged. Never blocks the publisher forever.
    pub async fn publish(&self, event: Event) {
        match tokio::time::timeout(PUBLISH_TIMEOUT, self.inner.tx.send(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                tracing::error!("event bus channel closed; dropping event");
            }
            Err(_) => {
                tracing::warn!("event bus queue full after 1s; dropping event");
            }
        }
    }

    /// Start the single dispatcher task. Idempotent: calling twice is a no-op.
    pub async fn start(&self) {
        let mut dispatcher = self.dispatcher.lock().await;
        if dispatcher.is_some() {
            return;
        }
        let mut rx = match self.inner.rx.lock().await.take() {
            Some(rx) => rx,
            None => return,
        };
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let kind = event.kind();
                let handlers = {
                    let guard = inner.handlers.read().await;
                    guard.get(&kind).cloned().unwrap_or_default()
                };
                for handler in handlers {
                    if let Err(e) = handler.handle(&event).await {
                        tracing::error!(?kind, error = %e, "event handler failed");
                    }
                }
            }
        });
        *dispatcher = Some(handle);
    }

    /// Cancel the dispatcher. In-flight handler invocations are allowed to
    /// complete; no new events are drained after this returns.
    pub async fn stop(&self) {
        let mut dispatcher = self.dispatcher.lock().await;
        if let Some(handle) = dispatcher.take() {
            handle.abort();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventPayload, ProactiveImpulse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        order: Arc<Mutex<Vec<usize>>>,
        id: usize,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: &Event) -> anyhow::Result<()> {
            self.order.lock().await.push(self.id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn handlers_run_sequentially_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for id in 0..3 {
            bus.subscribe(
                EventKind::ProactiveImpulse,
                Arc::new(CountingHandler {
                    order: order.clone(),
                    id,
                }),
            )
            .await;
        }
        bus.start().await;
        bus.publish(Event::new(EventPayload::ProactiveImpulse(ProactiveImpulse {
            trigger_reason: "test".into(),
            confidence: 0.5,
        })))
        .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*order.lock().await, vec![0, 1, 2]);
    }

    struct FailingHandler;
    struct MarkerHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, _event: &Event) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    #[async_trait]
    impl EventHandler for MarkerHandler {
        async fn handle(&self, _event: &Event) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn a_failing_handler_does_not_block_later_handlers() {
        let bus = EventBus::new();
        let marker = Arc::new(AtomicUsize::new(0));
        bus.subscribe(EventKind::ProactiveImpulse, Arc::new(FailingHandler))
            .await;
        bus.subscribe(
            EventKind::ProactiveImpulse,
            Arc::new(MarkerHandler(marker.clone())),
        )
        .await;
        bus.start().await;
        bus.publish(Event::new(EventPayload::ProactiveImpulse(ProactiveImpulse {
            trigger_reason: "test".into(),
            confidence: 0.5,
        })))
        .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(marker.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publish_drops_silently_when_queue_is_full_and_undrained() {
        let bus = EventBus::with_capacity(1);
        // Fill the queue without starting the dispatcher.
        bus.publish(Event::new(EventPayload::ProactiveImpulse(ProactiveImpulse {
            trigger_reason: "a".into(),
            confidence: 0.1,
        })))
        .await;
        // Second publish should time out and drop rather than hang.
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            bus.publish(Event::new(EventPayload::ProactiveImpulse(ProactiveImpulse {
                trigger_reason: "b".into(),
                confidence: 0.1,
            }))),
        )
        .await;
        assert!(result.is_ok(), "publish must return, not hang forever");
    }
}
