//! Incoming message routing for the MQTT event loop.
//!
//! Every service-client subscription registers a handler here under its topic
//! filter. The event loop hands each incoming publish to [`Router::dispatch`],
//! which runs all handlers whose filter matches the topic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rumqttc::QoS;

/// Callback invoked with `(topic, payload)` for each matching publish.
pub type MessageHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Identifies one handler registration. Pass it back to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    topic: String,
    id: u64,
}

impl SubscriptionHandle {
    /// The topic filter this handle is registered under.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

struct Route {
    qos: QoS,
    handlers: Vec<(u64, MessageHandler)>,
}

/// Topic filter → handlers table.
#[derive(Default)]
pub struct Router {
    routes: Mutex<HashMap<String, Route>>,
    next_id: AtomicU64,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. `qos` only applies to a new filter; an existing
    /// one keeps the QoS it was subscribed at.
    pub fn add(&self, filter: &str, qos: QoS, handler: MessageHandler) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut routes = self.routes();
        let route = routes.entry(filter.to_string()).or_insert_with(|| Route {
            qos,
            handlers: Vec::new(),
        });
        route.handlers.push((id, handler));
        SubscriptionHandle {
            topic: filter.to_string(),
            id,
        }
    }

    /// Remove a handler. Returns `true` when it was the filter's last one, in
    /// which case the filter itself is dropped and should be unsubscribed.
    pub fn remove(&self, handle: &SubscriptionHandle) -> bool {
        let mut routes = self.routes();
        let Some(route) = routes.get_mut(&handle.topic) else {
            return false;
        };
        let before = route.handlers.len();
        route.handlers.retain(|(id, _)| *id != handle.id);
        if route.handlers.len() == before || !route.handlers.is_empty() {
            return false;
        }
        routes.remove(&handle.topic);
        true
    }

    /// Run every handler whose filter matches `topic`. Returns how many ran.
    ///
    /// Handlers run outside the routing lock and may subscribe or unsubscribe.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> usize {
        let matched: Vec<MessageHandler> = self
            .routes()
            .iter()
            .filter(|(filter, _)| topic_matches(filter, topic))
            .flat_map(|(_, route)| route.handlers.iter().map(|(_, h)| Arc::clone(h)))
            .collect();

        for handler in &matched {
            handler(topic, payload);
        }
        matched.len()
    }

    /// Every routed filter with the QoS it was subscribed at.
    pub fn filters(&self) -> Vec<(String, QoS)> {
        self.routes()
            .iter()
            .map(|(filter, route)| (filter.clone(), route.qos))
            .collect()
    }

    pub fn handler_count(&self, filter: &str) -> usize {
        self.routes().get(filter).map_or(0, |r| r.handlers.len())
    }

    pub fn is_empty(&self) -> bool {
        self.routes().is_empty()
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<String, Route>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// MQTT topic filter matching with `+` and `#` wildcards.
///
/// Topics starting with `$` never match a filter whose first level is a
/// wildcard.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
