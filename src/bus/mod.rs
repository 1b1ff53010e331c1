//! Typed in-process publish/subscribe.
//!
//! The event bus provides:
//! - Per-event-type listener registries with synchronous, in-order fan-out
//! - Non-owning registrations with idempotent unsubscribe handles
//! - Listener usage tracking and stale-listener diagnostics
//! - An optional periodic leak monitor
//!
//! # Architecture
//!
//! Events flow producer → `EventBus` → listeners, all on the emitter's
//! thread; network calls never happen inside a dispatch. The `LeakMonitor`
//! is advisory tooling layered on top of the same registry, never a
//! correctness mechanism.

pub mod event_types;

mod event_bus;
mod monitor;

pub use event_bus::{
    BusEvent, EventBus, Listener, StaleListener, Subscription, DEFAULT_MAX_LISTENERS,
    DEFAULT_STALE_THRESHOLD,
};
pub use monitor::{LeakMonitor, DEFAULT_SCAN_INTERVAL};
