//! Bridge telemetry collector and helpers.
//!
//! The collector multiplexes backend registration, forwarded events and
//! contract violations into a bounded history plus async broadcast stream.
//! Each dispatcher owns its collector; there is no process-wide hub.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;

use crate::config::TelemetryConfig;
use crate::error::{BridgeError, ErrorCode};
use crate::lifecycle::Signal;

pub mod events;

pub use events::MetricEvent;

/// Snapshot of collector state for CLI/FFI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub forwarded_events: u64,
    pub violations: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    forwarded_events: AtomicU64,
    violations: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            forwarded_events: AtomicU64::new(0),
            violations: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.channel_capacity, config.history_capacity)
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        match event {
            MetricEvent::EventForwarded { .. } => {
                self.forwarded_events.fetch_add(1, Ordering::Relaxed);
            }
            MetricEvent::Violation { .. } => {
                self.violations.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        // A poisoned history only loses the snapshot, never the live stream
        if let Ok(mut history) = self.history.lock() {
            if self.history_capacity == 0 {
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            } else {
                if history.len() == self.history_capacity {
                    history.pop_front();
                    self.dropped_history.fetch_add(1, Ordering::Relaxed);
                }
                history.push_back(event.clone());
            }
        }

        let _ = self.tx.send(event);
    }

    pub fn record_registered(&self, backend_id: u32) {
        self.publish(MetricEvent::BackendRegistered {
            backend_id,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_deregistered(&self, backend_id: u32) {
        self.publish(MetricEvent::BackendDeregistered {
            backend_id,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_forwarded(&self, backend_id: u32, signal: Signal) {
        self.publish(MetricEvent::EventForwarded { backend_id, signal });
    }

    pub fn record_violation(&self, err: &BridgeError, context: impl Into<String>) {
        self.publish(MetricEvent::Violation {
            backend_id: err.backend_id(),
            code: err.code(),
            context: context.into(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let recent = self
            .history
            .lock()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default();
        TelemetrySnapshot {
            recent,
            total_events: self.total_events.load(Ordering::Relaxed),
            forwarded_events: self.forwarded_events.load(Ordering::Relaxed),
            violations: self.violations.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::from_config(&TelemetryConfig::default())
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
