use super::{ChangeEvent, ChangeEventKind};
use crate::core::Result;
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot};

/// Subscriber of typed change events
#[async_trait]
pub trait ChangeEventHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, event: &ChangeEvent) -> Result<()>;
}

/// Dispatch table from event tag to subscribers
///
/// Handlers run in registration order. A failing handler is logged and does
/// not keep the remaining handlers from seeing the event.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<ChangeEventKind, Vec<Arc<dyn ChangeEventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, kind: ChangeEventKind, handler: Arc<dyn ChangeEventHandler>) {
        debug!("Subscribing '{}' to {:?}", handler.name(), kind);
        let mut handlers = self.handlers.write().await;
        handlers.entry(kind).or_default().push(handler);
    }

    pub async fn subscriber_count(&self, kind: ChangeEventKind) -> usize {
        let handlers = self.handlers.read().await;
        handlers.get(&kind).map(Vec::len).unwrap_or(0)
    }

    /// Delivers `event` to every subscriber of its kind, returns how many ran
    pub async fn post(&self, event: &ChangeEvent) -> usize {
        // Snapshot so a handler may subscribe without deadlocking
        let handlers = {
            let handlers = self.handlers.read().await;
            handlers.get(&event.kind()).cloned().unwrap_or_default()
        };

        for handler in &handlers {
            if let Err(e) = handler.handle(event).await {
                warn!(
                    "Handler '{}' failed on {:?} for schema '{}': {}",
                    handler.name(),
                    event.kind(),
                    event.schema_name(),
                    e
                );
            }
        }

        handlers.len()
    }

    /// Starts the ordered dispatcher task
    ///
    /// Events sent through the returned sender are posted one at a time in
    /// send order. The task ends once every sender is dropped.
    pub fn spawn_dispatcher(self: &Arc<Self>) -> EventSender {
        let (tx, mut rx) = mpsc::unbounded_channel::<Dispatch>();
        let bus = Arc::clone(self);

        tokio::spawn(async move {
            while let Some(dispatch) = rx.recv().await {
                match dispatch {
                    Dispatch::Event(event) => {
                        bus.post(&event).await;
                    }
                    Dispatch::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
            debug!("Event dispatcher stopped");
        });

        EventSender { tx }
    }
}

enum Dispatch {
    Event(ChangeEvent),
    Flush(oneshot::Sender<()>),
}

/// Non-blocking handle for registry notification tasks
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Dispatch>,
}

impl EventSender {
    /// Queues `event`; returns false once the dispatcher is gone
    pub fn send(&self, event: ChangeEvent) -> bool {
        if self.tx.send(Dispatch::Event(event)).is_err() {
            warn!("Event dispatcher is closed, dropping change event");
            return false;
        }
        true
    }

    /// Waits until every event queued before this call has been handled
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Dispatch::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}
