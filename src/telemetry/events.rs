//! Telemetry event types describing bridge activity, exposed to the
//! diagnostics CLI and flutter_rust_bridge streams.

use serde::{Deserialize, Serialize};

use crate::lifecycle::Signal;

/// Metric events covering backend churn, forwarded events and violations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    BackendRegistered {
        backend_id: u32,
        timestamp_ms: u64,
    },
    BackendDeregistered {
        backend_id: u32,
        timestamp_ms: u64,
    },
    EventForwarded {
        backend_id: u32,
        signal: Signal,
    },
    Violation {
        backend_id: Option<u32>,
        code: i32,
        context: String,
    },
}
