//! Topic-based publish/subscribe for frame results.
//!
//! Each [`Instance`](crate::Instance) owns one [`EventBus`]. The decoding
//! engine publishes on it; callers subscribe through the facade. Dispatch is
//! synchronous: `publish` returns after every matching callback has run.
//!
//! Callbacks are invoked outside the bus lock, so a callback may subscribe,
//! unsubscribe or stop its instance without deadlocking.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::ScanResult;

/// The closed set of event channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A symbol was decoded in a frame
    Detected,
    /// A frame was processed, whether or not anything decoded
    Processed,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Detected => "detected",
            Topic::Processed => "processed",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized event callback.
pub type Callback = Arc<dyn Fn(&ScanResult) + Send + Sync>;

/// An object that wants to be notified of events.
pub trait EventHandler: Send + Sync {
    fn handle(&self, result: &ScanResult);
}

/// Something that can be subscribed to a topic.
///
/// Cloning a subscriber keeps its identity, so the clone can later be used to
/// unsubscribe.
#[derive(Clone)]
pub enum Subscriber {
    /// A plain closure
    Callable(Callback),
    /// A handler object
    Handler(Arc<dyn EventHandler>),
}

impl Subscriber {
    /// Wrap a closure.
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&ScanResult) + Send + Sync + 'static,
    {
        Subscriber::Callable(Arc::new(f))
    }

    /// Wrap a handler object.
    pub fn handler(handler: Arc<dyn EventHandler>) -> Self {
        Subscriber::Handler(handler)
    }

    /// Identity of the underlying allocation.
    fn key(&self) -> usize {
        match self {
            Subscriber::Callable(f) => Arc::as_ptr(f) as *const () as usize,
            Subscriber::Handler(h) => Arc::as_ptr(h) as *const () as usize,
        }
    }

    fn into_callback(self) -> Callback {
        match self {
            Subscriber::Callable(f) => f,
            Subscriber::Handler(h) => Arc::new(move |result: &ScanResult| h.handle(result)),
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscriber::Callable(_) => write!(f, "Subscriber::Callable({:#x})", self.key()),
            Subscriber::Handler(_) => write!(f, "Subscriber::Handler({:#x})", self.key()),
        }
    }
}

struct Subscription {
    key: usize,
    callback: Callback,
    once: bool,
}

/// Per-instance event bus.
#[derive(Default)]
pub struct EventBus {
    topics: Mutex<HashMap<Topic, Vec<Subscription>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe for every future event on `topic`.
    pub fn subscribe(&self, topic: Topic, subscriber: &Subscriber) {
        self.add(topic, subscriber, false);
    }

    /// Subscribe for the next event on `topic` only.
    pub fn once(&self, topic: Topic, subscriber: &Subscriber) {
        self.add(topic, subscriber, true);
    }

    /// Remove a subscriber from `topic`, or every subscriber when `None`.
    pub fn unsubscribe(&self, topic: Topic, subscriber: Option<&Subscriber>) {
        let mut topics = self.lock();
        let Some(subs) = topics.get_mut(&topic) else {
            return;
        };
        match subscriber {
            Some(subscriber) => {
                let key = subscriber.key();
                subs.retain(|s| s.key != key);
            }
            None => subs.clear(),
        }
        tracing::trace!("Unsubscribed from '{}', {} remaining", topic, subs.len());
    }

    /// Deliver `result` to every subscriber of `topic`.
    ///
    /// One-shot subscriptions are removed before any callback runs. Returns
    /// the number of callbacks invoked.
    pub fn publish(&self, topic: Topic, result: &ScanResult) -> usize {
        let callbacks: Vec<Callback> = {
            let mut topics = self.lock();
            let Some(subs) = topics.get_mut(&topic) else {
                return 0;
            };
            let callbacks = subs.iter().map(|s| s.callback.clone()).collect();
            subs.retain(|s| !s.once);
            callbacks
        };

        tracing::trace!("Publishing '{}' to {} subscriber(s)", topic, callbacks.len());
        for callback in &callbacks {
            callback(result);
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.lock().get(&topic).map_or(0, Vec::len)
    }

    fn add(&self, topic: Topic, subscriber: &Subscriber, once: bool) {
        let subscription = Subscription {
            key: subscriber.key(),
            callback: subscriber.clone().into_callback(),
            once,
        };
        self.lock().entry(topic).or_default().push(subscription);
        tracing::trace!("Subscribed to '{}' (once: {})", topic, once);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Topic, Vec<Subscription>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
