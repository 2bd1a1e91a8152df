// Host-facing event types and sinks
//
// Everything that crosses from the bridge to the host runtime is an owned
// HostEvent: identifiers are copied out of engine buffers before delivery,
// so the engine may reuse them as soon as its callback returns.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::bridge::InitStatus;
use crate::lifecycle::Signal;

/// Normalized lifecycle event forwarded to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEvent {
    pub backend_id: u32,
    pub kind: HostEventKind,
}

/// Event payload, one variant per engine signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum HostEventKind {
    Init { status: InitStatus },
    Start { utterance_id: String },
    Stop { utterance_id: String, interrupted: bool },
    Done { utterance_id: String },
    Error { utterance_id: String },
}

impl HostEvent {
    pub fn init(backend_id: u32, status: InitStatus) -> Self {
        Self {
            backend_id,
            kind: HostEventKind::Init { status },
        }
    }

    pub fn start(backend_id: u32, utterance_id: &str) -> Self {
        Self {
            backend_id,
            kind: HostEventKind::Start {
                utterance_id: utterance_id.to_owned(),
            },
        }
    }

    pub fn stop(backend_id: u32, utterance_id: &str, interrupted: bool) -> Self {
        Self {
            backend_id,
            kind: HostEventKind::Stop {
                utterance_id: utterance_id.to_owned(),
                interrupted,
            },
        }
    }

    pub fn done(backend_id: u32, utterance_id: &str) -> Self {
        Self {
            backend_id,
            kind: HostEventKind::Done {
                utterance_id: utterance_id.to_owned(),
            },
        }
    }

    pub fn error(backend_id: u32, utterance_id: &str) -> Self {
        Self {
            backend_id,
            kind: HostEventKind::Error {
                utterance_id: utterance_id.to_owned(),
            },
        }
    }

    pub fn signal(&self) -> Signal {
        match self.kind {
            HostEventKind::Init { .. } => Signal::Init,
            HostEventKind::Start { .. } => Signal::Start,
            HostEventKind::Stop { .. } => Signal::Stop,
            HostEventKind::Done { .. } => Signal::Done,
            HostEventKind::Error { .. } => Signal::Error,
        }
    }

    /// Utterance the event refers to; `None` for init events.
    pub fn utterance_id(&self) -> Option<&str> {
        match &self.kind {
            HostEventKind::Init { .. } => None,
            HostEventKind::Start { utterance_id }
            | HostEventKind::Stop { utterance_id, .. }
            | HostEventKind::Done { utterance_id }
            | HostEventKind::Error { utterance_id } => Some(utterance_id),
        }
    }
}

/// Receiver side of the cross-runtime handoff.
///
/// Delivery is fire-and-forget and runs on the engine's callback thread
/// while the owning bridge holds its lock, so implementations must not
/// block. They must not call back into the dispatcher for the same backend
/// either: the bridge lock is not reentrant and such a call deadlocks.
///
/// A panicking sink leaves the accepted transition in place. The next call
/// on that backend reports `LockPoisoned` once and later calls proceed.
pub trait HostSink: Send + Sync {
    fn deliver(&self, event: HostEvent);
}

/// Host sink backed by a tokio broadcast channel.
///
/// Any number of host-side consumers (Dart stream, CLI, tests) can
/// subscribe. Events sent while nobody is subscribed are discarded, and a
/// slow subscriber lags instead of blocking the engine.
pub struct BroadcastHostSink {
    tx: broadcast::Sender<HostEvent>,
}

impl BroadcastHostSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastHostSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl HostSink for BroadcastHostSink {
    fn deliver(&self, event: HostEvent) {
        // No subscribers is not an error for a fire-and-forget channel
        let _ = self.tx.send(event);
    }
}

/// In-memory sink that keeps every delivered event, in delivery order.
#[derive(Default)]
pub struct RecordingHostSink {
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingHostSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything delivered so far.
    pub fn events(&self) -> Vec<HostEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<HostEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HostSink for RecordingHostSink {
    fn deliver(&self, event: HostEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
