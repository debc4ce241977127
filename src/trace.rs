use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub at: DateTime<Utc>,
    pub kind: String,
    pub fields: Value,
}

// Passive trace consumer. `emit` never blocks and never fails the caller;
// events sit in the channel until an explicit `flush` drains them.
pub struct TraceBuffer {
    tx: mpsc::UnboundedSender<TraceEvent>,
    rx: Mutex<mpsc::UnboundedReceiver<TraceEvent>>,
}

impl TraceBuffer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn emit(&self, kind: impl Into<String>, fields: Value) {
        let event = TraceEvent {
            at: Utc::now(),
            kind: kind.into(),
            fields,
        };
        let _ = self.tx.send(event);
    }

    // Drains buffered events to the log sink and returns how many were
    // flushed. Called once before process exit.
    pub fn flush(&self) -> usize {
        let mut rx = self.rx.lock();
        let mut flushed = 0;
        while let Ok(event) = rx.try_recv() {
            debug!(
                at = %event.at.to_rfc3339(),
                kind = %event.kind,
                fields = %event.fields,
                "trace event"
            );
            flushed += 1;
        }
        flushed
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct RunMetrics {
    pub items_total: AtomicU64,
    pub items_passed: AtomicU64,
    pub items_failed: AtomicU64,
    pub duration_sum_ms: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            items_total: AtomicU64::new(0),
            items_passed: AtomicU64::new(0),
            items_failed: AtomicU64::new(0),
            duration_sum_ms: AtomicU64::new(0),
        })
    }

    pub fn record_item(&self, passed: bool, duration_ms: u64) {
        self.items_total.fetch_add(1, Ordering::Relaxed);
        if passed {
            self.items_passed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.items_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.duration_sum_ms
            .fetch_add(duration_ms, Ordering::Relaxed);
    }
}
