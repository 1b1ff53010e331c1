use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use super::event_bus::DEFAULT_STALE_THRESHOLD;
use super::EventBus;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60);

pub struct LeakMonitor;

impl LeakMonitor {
    /// Spawn a background task that periodically scans the bus and logs
    /// listener-leak candidates:
    ///
    /// - event types whose listener count sits at or above the configured
    ///   maximum
    /// - listeners invoked fewer than the stale threshold times
    ///
    /// The scan is advisory only; nothing is ever removed. The task holds a
    /// weak reference, so dropping the bus (or calling `dispose`, which
    /// aborts the stored handle) ends it.
    pub fn start<P: Send + Sync + 'static>(
        bus: &Arc<EventBus<P>>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(bus);
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            // The first tick fires immediately; skip it so a freshly mounted
            // subscriber set is not reported as stale.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(bus) = weak.upgrade() else {
                    break;
                };
                for (event_type, count) in bus.listener_counts() {
                    if count >= bus.max_listeners() {
                        tracing::warn!(
                            event_type = %event_type,
                            listeners = count,
                            "event type at or above listener cap"
                        );
                    }
                }
                let stale = bus.identify_stale_listeners(DEFAULT_STALE_THRESHOLD);
                if !stale.is_empty() {
                    tracing::warn!(
                        candidates = stale.len(),
                        "listeners with low usage detected; check for missed unsubscribes"
                    );
                }
            }
        })
    }
}

impl<P: Send + Sync + 'static> EventBus<P> {
    /// Start (or restart) the periodic leak scan on this bus.
    pub fn start_leak_monitor(self: &Arc<Self>, interval: Duration) {
        if self.is_disposed() {
            return;
        }
        self.set_monitor(LeakMonitor::start(self, interval));
    }
}
