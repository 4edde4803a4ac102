//! Alert lane: bounded queue, single dispatcher thread, swappable sink
//!
//! Workers push alerts with a bounded wait; one dispatcher thread drains
//! the queue and invokes whichever sink is installed at that moment.
//! Delivery is at most once: a sink failure is counted and logged, never
//! retried.

use crate::stats::EngineCounters;
use common::{Alert, AlertSeverity};
use crossbeam::channel::{Receiver, TryRecvError};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Idle sleep between empty polls of the alert queue
const DISPATCH_IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Consumer of dispatched alerts, invoked from the dispatcher thread
pub trait AlertSink: Send + Sync {
    /// Handle one alert. An `Err` is counted against `sink_errors` and the
    /// alert is not redelivered.
    fn on_alert(&self, alert: Alert) -> anyhow::Result<()>;
}

impl<F> AlertSink for F
where
    F: Fn(Alert) -> anyhow::Result<()> + Send + Sync,
{
    fn on_alert(&self, alert: Alert) -> anyhow::Result<()> {
        self(alert)
    }
}

/// Atomically swappable sink slot shared between the control surface and
/// the dispatcher thread
pub(crate) type SinkSlot = RwLock<Option<Arc<dyn AlertSink>>>;

/// Dispatcher loop. Runs until every producer handle is dropped, then
/// drains whatever is left before exiting.
pub(crate) fn dispatcher_loop(
    rx: &Receiver<Alert>,
    sink: &SinkSlot,
    counters: &EngineCounters,
) {
    debug!("alert dispatcher started");
    loop {
        match rx.try_recv() {
            Ok(alert) => deliver(alert, sink, counters),
            Err(TryRecvError::Empty) => std::thread::sleep(DISPATCH_IDLE_SLEEP),
            Err(TryRecvError::Disconnected) => break,
        }
    }
    debug!("alert dispatcher finished");
}

fn deliver(alert: Alert, sink: &SinkSlot, counters: &EngineCounters) {
    if alert.severity >= AlertSeverity::High {
        warn!(
            pattern = %alert.pattern_name,
            trade_id = %alert.trade_id,
            severity = ?alert.severity,
            title = %alert.title,
            "surveillance alert"
        );
    }

    // Clone the handle out so no lock is held across the sink call.
    let current = sink.read().clone();
    let Some(sink) = current else {
        debug!(trade_id = %alert.trade_id, "no alert sink installed, dropping alert");
        return;
    };

    if let Err(e) = sink.on_alert(alert) {
        counters
            .sink_errors
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        error!(error = %e, "alert sink failed");
    }
}
