use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

/// Listener count per event type at which growth warnings fire. Registration
/// is never refused; the cap is a diagnostic signal for leaked subscriptions.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Invocation count below which a listener is reported as stale.
pub const DEFAULT_STALE_THRESHOLD: u64 = 10;

/// Envelope delivered to every listener of an event's type. Listeners only
/// ever see `&BusEvent`, so one listener cannot mutate what the next one
/// observes.
#[derive(Debug, Clone, Serialize)]
pub struct BusEvent<P> {
    pub id: String,
    pub seq: i64,
    pub event_type: String,
    pub payload: P,
    /// Unix millis at emission time.
    pub timestamp: i64,
}

pub type Listener<P> = Arc<dyn Fn(&BusEvent<P>) + Send + Sync>;

struct ListenerEntry<P> {
    id: u64,
    callback: Listener<P>,
}

/// A listener reported by [`EventBus::identify_stale_listeners`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleListener {
    pub event_type: String,
    pub invocations: u64,
}

/// In-process publish/subscribe with per-type listener registries.
///
/// Listeners are invoked synchronously, in subscription order, on the
/// emitter's thread. The bus holds non-owning registrations: subscribers own
/// their listener's lifetime through the [`Subscription`] handle.
pub struct EventBus<P> {
    listeners: Mutex<HashMap<String, Vec<ListenerEntry<P>>>>,
    /// Listener id -> times invoked. Kept outside the registry lock so emits
    /// only hold the lock long enough to snapshot the listener list.
    usage: DashMap<u64, u64>,
    seq: AtomicI64,
    next_listener_id: AtomicU64,
    max_listeners: usize,
    monitor: Mutex<Option<tokio::task::JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl<P: 'static> EventBus<P> {
    pub fn new() -> Self {
        Self::with_max_listeners(DEFAULT_MAX_LISTENERS)
    }

    pub fn with_max_listeners(max_listeners: usize) -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            usage: DashMap::new(),
            seq: AtomicI64::new(0),
            next_listener_id: AtomicU64::new(0),
            max_listeners,
            monitor: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    /// Register `listener` for `event_type`. Registering the same `Arc`
    /// twice under one type occupies one slot; the returned handle then
    /// refers to that single registration.
    pub fn subscribe(self: &Arc<Self>, event_type: &str, listener: Listener<P>) -> Subscription<P> {
        let mut registry = self.registry();
        let entries = registry.entry(event_type.to_string()).or_default();

        if let Some(existing) = entries
            .iter()
            .find(|entry| Arc::ptr_eq(&entry.callback, &listener))
        {
            return Subscription::new(self, event_type, existing.id);
        }

        if entries.len() >= self.max_listeners {
            tracing::warn!(
                event_type,
                listeners = entries.len() + 1,
                max = self.max_listeners,
                "listener count exceeds configured maximum; possible subscription leak"
            );
        }

        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        entries.push(ListenerEntry {
            id,
            callback: listener,
        });
        self.usage.insert(id, 0);
        Subscription::new(self, event_type, id)
    }

    /// Build an envelope for `payload` and deliver it to every listener of
    /// `event_type`, in subscription order. Returns `None` without building
    /// anything when nobody is subscribed. A panicking listener is caught and
    /// logged; it never stops the fan-out and never reaches the emitter.
    pub fn emit(&self, event_type: impl Into<String>, payload: P) -> Option<BusEvent<P>> {
        let event_type = event_type.into();
        let snapshot: Vec<(u64, Listener<P>)> = {
            let registry = self.registry();
            match registry.get(&event_type) {
                Some(entries) if !entries.is_empty() => entries
                    .iter()
                    .map(|entry| (entry.id, entry.callback.clone()))
                    .collect(),
                _ => return None,
            }
        };

        let event = BusEvent {
            id: Uuid::new_v4().to_string(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            event_type,
            payload,
            timestamp: Utc::now().timestamp_millis(),
        };

        for (id, callback) in snapshot {
            if let Some(mut count) = self.usage.get_mut(&id) {
                *count += 1;
            }
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                tracing::warn!(
                    event_type = %event.event_type,
                    listener_id = id,
                    "listener panicked during dispatch; continuing fan-out"
                );
            }
        }

        Some(event)
    }

    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.listener_count(event_type) > 0
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.registry().get(event_type).map_or(0, Vec::len)
    }

    /// Current `(event_type, listener count)` pairs, for diagnostics.
    pub fn listener_counts(&self) -> Vec<(String, usize)> {
        self.registry()
            .iter()
            .map(|(event_type, entries)| (event_type.clone(), entries.len()))
            .collect()
    }

    /// Remove all listeners (and their usage counters) for one event type.
    pub fn clear_listeners(&self, event_type: &str) {
        if let Some(entries) = self.registry().remove(event_type) {
            for entry in entries {
                self.usage.remove(&entry.id);
            }
        }
    }

    pub fn clear_all_listeners(&self) {
        self.registry().clear();
        self.usage.clear();
    }

    /// Advisory scan for listeners that have been invoked fewer than
    /// `threshold` times. Reports candidates only; nothing is removed.
    pub fn identify_stale_listeners(&self, threshold: u64) -> Vec<StaleListener> {
        let registry = self.registry();
        let mut stale = Vec::new();
        for (event_type, entries) in registry.iter() {
            for entry in entries {
                let invocations = self.usage.get(&entry.id).map_or(0, |count| *count);
                if invocations < threshold {
                    stale.push(StaleListener {
                        event_type: event_type.clone(),
                        invocations,
                    });
                }
            }
        }
        stale
    }

    /// Stop the leak monitor (if running) and drop every registration.
    /// Idempotent; safe to call from an unmount path.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self
            .monitor
            .lock()
            .expect("monitor handle poisoned")
            .take()
        {
            handle.abort();
        }
        self.clear_all_listeners();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(super) fn max_listeners(&self) -> usize {
        self.max_listeners
    }

    pub(super) fn set_monitor(&self, handle: tokio::task::JoinHandle<()>) {
        let mut slot = self.monitor.lock().expect("monitor handle poisoned");
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<ListenerEntry<P>>>> {
        self.listeners.lock().expect("listener registry poisoned")
    }

    fn remove_listener(&self, event_type: &str, listener_id: u64) {
        let mut registry = self.registry();
        if let Some(entries) = registry.get_mut(event_type) {
            entries.retain(|entry| entry.id != listener_id);
            if entries.is_empty() {
                registry.remove(event_type);
            }
        }
        self.usage.remove(&listener_id);
    }
}

impl<P: 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for exactly one registration. `unsubscribe` removes that listener
/// from that event type; calling it again is a no-op.
pub struct Subscription<P> {
    bus: Weak<EventBus<P>>,
    event_type: String,
    listener_id: u64,
    active: AtomicBool,
}

impl<P: 'static> Subscription<P> {
    fn new(bus: &Arc<EventBus<P>>, event_type: &str, listener_id: u64) -> Self {
        Self {
            bus: Arc::downgrade(bus),
            event_type: event_type.to_string(),
            listener_id,
            active: AtomicBool::new(true),
        }
    }

    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.remove_listener(&self.event_type, self.listener_id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
