//! Scripted replay of engine callbacks.
//!
//! A replay script is a JSON array of inbound signals. Replaying it through
//! a fresh [`Dispatcher`] shows exactly which events a host would receive
//! and which signals the bridge rejects, which is how engine traces captured
//! on a device are checked offline.
//!
//! ```json
//! [
//!   { "signal": "register", "backend_id": 7 },
//!   { "signal": "init", "backend_id": 7, "status": "success" },
//!   { "signal": "start", "backend_id": 7, "utterance_id": "u1" },
//!   { "signal": "done", "backend_id": 7, "utterance_id": "u1" }
//! ]
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bridge::InitStatus;
use crate::config::BridgeConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{BridgeError, ErrorCode};
use crate::host::{HostEvent, RecordingHostSink};
use crate::telemetry::TelemetrySnapshot;

/// One step of a replay script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum ScriptedSignal {
    Register {
        backend_id: u32,
    },
    Deregister {
        backend_id: u32,
    },
    Purge {
        backend_id: u32,
    },
    Init {
        backend_id: u32,
        status: InitStatus,
    },
    Start {
        backend_id: u32,
        utterance_id: String,
    },
    Stop {
        backend_id: u32,
        utterance_id: String,
        #[serde(default)]
        interrupted: bool,
    },
    Done {
        backend_id: u32,
        utterance_id: String,
    },
    Error {
        backend_id: u32,
        utterance_id: String,
    },
}

impl ScriptedSignal {
    fn apply(&self, dispatcher: &Dispatcher) -> Result<(), BridgeError> {
        match self {
            ScriptedSignal::Register { backend_id } => {
                dispatcher.register_backend(*backend_id).map(|_| ())
            }
            ScriptedSignal::Deregister { backend_id } => dispatcher.deregister_backend(*backend_id),
            ScriptedSignal::Purge { backend_id } => {
                dispatcher.purge_finished(*backend_id).map(|_| ())
            }
            ScriptedSignal::Init { backend_id, status } => {
                dispatcher.notify_init(*backend_id, *status)
            }
            ScriptedSignal::Start {
                backend_id,
                utterance_id,
            } => dispatcher.notify_start(*backend_id, utterance_id),
            ScriptedSignal::Stop {
                backend_id,
                utterance_id,
                interrupted,
            } => dispatcher.notify_stop(*backend_id, utterance_id, *interrupted),
            ScriptedSignal::Done {
                backend_id,
                utterance_id,
            } => dispatcher.notify_done(*backend_id, utterance_id),
            ScriptedSignal::Error {
                backend_id,
                utterance_id,
            } => dispatcher.notify_error(*backend_id, utterance_id),
        }
    }
}

/// A script step the bridge refused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedSignal {
    /// Zero-based position in the script
    pub index: usize,
    pub signal: ScriptedSignal,
    pub code: i32,
    pub message: String,
}

/// Outcome of replaying a script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub steps: usize,
    pub forwarded: Vec<HostEvent>,
    pub rejected: Vec<RejectedSignal>,
    pub telemetry: TelemetrySnapshot,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

pub fn parse_script(json: &str) -> serde_json::Result<Vec<ScriptedSignal>> {
    serde_json::from_str(json)
}

/// Replay `signals` in order through a fresh dispatcher.
pub fn replay(signals: &[ScriptedSignal], config: &BridgeConfig) -> ReplayReport {
    let sink = Arc::new(RecordingHostSink::new());
    let dispatcher = Dispatcher::with_config(sink.clone(), config);

    let rejected = signals
        .iter()
        .enumerate()
        .filter_map(|(index, signal)| {
            signal.apply(&dispatcher).err().map(|err| RejectedSignal {
                index,
                signal: signal.clone(),
                code: err.code(),
                message: err.message(),
            })
        })
        .collect();

    ReplayReport {
        steps: signals.len(),
        forwarded: sink.take(),
        rejected,
        telemetry: dispatcher.telemetry().snapshot(),
    }
}
