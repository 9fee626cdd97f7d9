//! Event bus with typed pub/sub
//!
//! Every event type gets its own broadcast channel, created on first
//! subscription. [`EventBus::listen`] wraps a subscription in a task and hands
//! back a [`ListenerHandle`] that cancels it, which is how integrations follow
//! `core_config_update` for as long as they care.

use dashmap::DashMap;
use ha_core::{Context, Event, EventData, EventType};
use std::future::Future;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

pub struct EventBus {
    channels: DashMap<EventType, broadcast::Sender<Event>>,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Receive every future event of `event_type`
    pub fn subscribe(&self, event_type: impl Into<EventType>) -> broadcast::Receiver<Event> {
        let event_type = event_type.into();
        trace!(event_type = %event_type, "Subscribing to event type");

        self.channels
            .entry(event_type)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Run `handler` for every future event of `event_type` until the returned
    /// handle is removed.
    ///
    /// The subscription is taken before this returns, so events fired right
    /// after the call are not missed.
    pub fn listen<F, Fut>(&self, event_type: impl Into<EventType>, handler: F) -> ListenerHandle
    where
        F: Fn(Event) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let event_type = event_type.into();
        let mut rx = self.subscribe(event_type.clone());
        let task_type = event_type.clone();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handler(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(event_type = %task_type, skipped, "Listener lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        ListenerHandle { event_type, task }
    }

    /// Deliver an event to the current subscribers of its type
    pub fn fire(&self, event: Event) {
        debug!(event_type = %event.event_type, "Firing event");

        if let Some(sender) = self.channels.get(&event.event_type) {
            // No receivers is not an error
            let _ = sender.send(event);
        }
    }

    /// Serialize `data` and fire it under its own event type
    pub fn fire_typed<T: EventData + serde::Serialize>(&self, data: T, context: Context) {
        let event = Event::typed(data, context);
        match serde_json::to_value(&event.data) {
            Ok(json) => self.fire(event.map(|_| json)),
            Err(err) => warn!(event_type = %event.event_type, %err, "Dropping unserializable event"),
        }
    }

    /// Number of event types with a channel
    pub fn listener_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancels a [`EventBus::listen`] subscription
#[derive(Debug)]
pub struct ListenerHandle {
    event_type: EventType,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Stop listening. Dropping the handle without calling this keeps the
    /// listener alive.
    pub fn remove(self) {
        trace!(event_type = %self.event_type, "Removing listener");
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}
