//! Event Bus implementation.
//!
//! Provides the EventBus struct. Each job owns one bus and hands out
//! subscriptions to its consumers.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{AppEvent, EventCategory};

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Filter to receive only specific event types
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events matching any of these categories.
    Categories(Vec<EventCategory>),
}

impl EventFilter {
    /// Check if an event matches this filter
    pub fn matches(&self, event: &AppEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

type EventHandler = Arc<dyn Fn(AppEvent) + Send + Sync>;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for broadcast receivers.
    pub channel_capacity: usize,
    /// Whether to keep event history.
    pub enable_history: bool,
    /// Maximum number of events to retain in history.
    pub max_history_size: usize,
    /// How long to retain events in history.
    pub history_retention: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            enable_history: false,
            max_history_size: 1000,
            history_retention: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct TimestampedEvent {
    event: AppEvent,
    timestamp: Instant,
}

/// Error types for event bus operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventBusError {
    /// No subscribers are listening
    #[error("No active subscribers")]
    NoSubscribers,
}

/// Typed notification hub shared by a job and its consumers
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
    handlers: RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>,
    history: RwLock<VecDeque<TimestampedEvent>>,
    config: EventBusConfig,
}

impl EventBus {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            config,
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Synchronous handlers run on the publishing thread. Handlers are
    /// collected before they are called, so a handler may itself subscribe,
    /// unsubscribe or publish without deadlocking.
    ///
    /// Returns the number of receivers reached, or `NoSubscribers` when
    /// nobody is listening at all.
    pub fn publish(&self, event: AppEvent) -> Result<usize, EventBusError> {
        if self.config.enable_history {
            self.add_to_history(&event);
        }

        let matching: Vec<EventHandler> = self
            .handlers
            .read()
            .values()
            .filter(|(filter, _)| filter.matches(&event))
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in &matching {
            handler(event.clone());
        }

        match self.sender.send(event) {
            Ok(count) => Ok(count + matching.len()),
            Err(_) if !matching.is_empty() => Ok(matching.len()),
            Err(_) if self.subscriber_count() > 0 => Ok(0),
            Err(_) => Err(EventBusError::NoSubscribers),
        }
    }

    /// Publish an event, treating "nobody listening" as success
    ///
    /// Notifications from the job are fire-and-forget; a headless run with no
    /// consumers is normal.
    pub fn notify(&self, event: AppEvent) {
        tracing::trace!("Event: {}", event.description());
        if let Err(EventBusError::NoSubscribers) = self.publish(event) {
            tracing::trace!("Event dropped, no subscribers");
        }
    }

    /// Subscribe to events with a synchronous handler
    ///
    /// The handler is called on the publishing thread (for job events this is
    /// the background processing thread), so it should return quickly.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(AppEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers.write().insert(id, (filter, Arc::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Get a receiver for async event consumption
    pub fn receiver(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Unsubscribe from events
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Number of synchronous subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Number of live async receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Recent event history (if enabled), since the given instant or all of it
    pub fn history(&self, since: Option<Instant>) -> Vec<AppEvent> {
        if !self.config.enable_history {
            return Vec::new();
        }

        self.history
            .read()
            .iter()
            .filter(|e| since.is_none_or(|since| e.timestamp >= since))
            .map(|e| e.event.clone())
            .collect()
    }

    /// Clear event history
    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    fn add_to_history(&self, event: &AppEvent) {
        let mut history = self.history.write();
        let now = Instant::now();

        history.push_back(TimestampedEvent {
            event: event.clone(),
            timestamp: now,
        });

        let retention = self.config.history_retention;
        while history
            .front()
            .is_some_and(|e| now.duration_since(e.timestamp) > retention)
        {
            history.pop_front();
        }

        while history.len() > self.config.max_history_size {
            history.pop_front();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("receivers", &self.receiver_count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MoveId;
    use crate::event_bus::events::{JobEvent, PlaybackEvent, SelectionEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn finished(generation: u64) -> AppEvent {
        AppEvent::Job(JobEvent::ProcessingFinished {
            generation,
            identity: "part.nc".to_string(),
            move_count: 3,
            diagnostic_count: 0,
        })
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();

        let id = bus.subscribe(EventFilter::All, |_| {});
        assert_eq!(bus.subscriber_count(), 1);

        assert!(bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert!(matches!(
            bus.publish(finished(1)),
            Err(EventBusError::NoSubscribers)
        ));
        // notify swallows the missing-subscriber case
        bus.notify(finished(1));
    }

    #[test]
    fn test_event_filtering() {
        let bus = EventBus::new();
        let job_count = Arc::new(AtomicUsize::new(0));
        let selection_count = Arc::new(AtomicUsize::new(0));

        let jc = job_count.clone();
        bus.subscribe(EventFilter::Categories(vec![EventCategory::Job]), move |_| {
            jc.fetch_add(1, Ordering::SeqCst);
        });

        let sc = selection_count.clone();
        bus.subscribe(
            EventFilter::Categories(vec![EventCategory::Selection]),
            move |_| {
                sc.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.notify(finished(1));
        bus.notify(AppEvent::Selection(SelectionEvent::MoveSelected {
            generation: 1,
            index: 0,
            line: 1,
            move_id: MoveId::new(),
        }));
        bus.notify(AppEvent::Playback(PlaybackEvent::ReachedEnd));

        assert_eq!(job_count.load(Ordering::SeqCst), 1);
        assert_eq!(selection_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_can_publish_reentrantly() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let inner_bus = Arc::clone(&bus);
        bus.subscribe(EventFilter::Categories(vec![EventCategory::Job]), move |_| {
            inner_bus.notify(AppEvent::Playback(PlaybackEvent::RangeChanged { maximum: 2 }));
        });
        let counter = seen.clone();
        bus.subscribe(
            EventFilter::Categories(vec![EventCategory::Playback]),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.notify(finished(1));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_history_max_size() {
        let bus = EventBus::with_config(EventBusConfig {
            enable_history: true,
            max_history_size: 5,
            ..Default::default()
        });

        for generation in 0..10 {
            bus.notify(finished(generation));
        }

        let history = bus.history(None);
        assert_eq!(history.len(), 5);
        assert_eq!(history[0], finished(5));

        bus.clear_history();
        assert!(bus.history(None).is_empty());
    }

    #[test]
    fn test_filter_matches() {
        let event = finished(1);
        assert!(EventFilter::All.matches(&event));
        assert!(EventFilter::Categories(vec![EventCategory::Job]).matches(&event));
        assert!(!EventFilter::Categories(vec![EventCategory::Playback]).matches(&event));
    }

    #[tokio::test]
    async fn test_async_receiver() {
        let bus = EventBus::new();
        let mut receiver = bus.receiver();

        bus.publish(finished(7)).expect("receiver is listening");

        match receiver.recv().await {
            Ok(AppEvent::Job(JobEvent::ProcessingFinished { generation, .. })) => {
                assert_eq!(generation, 7)
            }
            other => panic!("Wrong event received: {:?}", other),
        }
    }
}
