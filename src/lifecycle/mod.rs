//! Utterance lifecycle state machine.
//!
//! Tracks every utterance id a backend has started and decides whether an
//! incoming engine signal is legal:
//!
//! ```text
//! (no entry) --start--> Started --stop--> Stopped { interrupted }
//!                               --done--> Done
//!                               --error-> Errored
//! ```
//!
//! Terminal entries are kept until purged, so a late duplicate `done` is
//! still recognised as a violation instead of looking like an unknown id.
//! The machine itself does no locking; [`crate::bridge::Bridge`] serializes
//! access.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Engine lifecycle signal kinds, shared by inbound callbacks and outbound
/// host events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Init,
    Start,
    Stop,
    Done,
    Error,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::Init => "init",
            Signal::Start => "start",
            Signal::Stop => "stop",
            Signal::Done => "done",
            Signal::Error => "error",
        };
        f.write_str(name)
    }
}

/// Stored state of a known utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UtteranceState {
    Started,
    Stopped { interrupted: bool },
    Done,
    Errored,
}

impl UtteranceState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UtteranceState::Started)
    }
}

impl fmt::Display for UtteranceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UtteranceState::Started => f.write_str("started"),
            UtteranceState::Stopped { interrupted: true } => f.write_str("stopped (interrupted)"),
            UtteranceState::Stopped { interrupted: false } => f.write_str("stopped"),
            UtteranceState::Done => f.write_str("done"),
            UtteranceState::Errored => f.write_str("errored"),
        }
    }
}

/// Rejected transition: the signal that was attempted and the state the
/// utterance was in (`None` when no entry exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionViolation {
    pub signal: Signal,
    pub found: Option<UtteranceState>,
}

/// Per-backend table of utterance states.
#[derive(Debug, Default)]
pub struct UtteranceLifecycle {
    entries: HashMap<String, UtteranceState>,
}

impl UtteranceLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the engine started speaking `utterance_id`.
    ///
    /// Any existing entry, finished or not, is a duplicate start. Callers
    /// that reuse ids must purge finished entries first.
    pub fn on_start(&mut self, utterance_id: &str) -> Result<(), TransitionViolation> {
        if let Some(existing) = self.entries.get(utterance_id) {
            return Err(TransitionViolation {
                signal: Signal::Start,
                found: Some(*existing),
            });
        }
        self.entries
            .insert(utterance_id.to_owned(), UtteranceState::Started);
        Ok(())
    }

    pub fn on_stop(
        &mut self,
        utterance_id: &str,
        interrupted: bool,
    ) -> Result<(), TransitionViolation> {
        self.finish(
            utterance_id,
            Signal::Stop,
            UtteranceState::Stopped { interrupted },
        )
    }

    pub fn on_done(&mut self, utterance_id: &str) -> Result<(), TransitionViolation> {
        self.finish(utterance_id, Signal::Done, UtteranceState::Done)
    }

    pub fn on_error(&mut self, utterance_id: &str) -> Result<(), TransitionViolation> {
        self.finish(utterance_id, Signal::Error, UtteranceState::Errored)
    }

    fn finish(
        &mut self,
        utterance_id: &str,
        signal: Signal,
        terminal: UtteranceState,
    ) -> Result<(), TransitionViolation> {
        match self.entries.get_mut(utterance_id) {
            Some(state) if *state == UtteranceState::Started => {
                *state = terminal;
                Ok(())
            }
            found => Err(TransitionViolation {
                signal,
                found: found.map(|state| *state),
            }),
        }
    }

    pub fn state(&self, utterance_id: &str) -> Option<UtteranceState> {
        self.entries.get(utterance_id).copied()
    }

    /// Number of utterances currently in `Started`.
    pub fn in_flight(&self) -> usize {
        self.entries
            .values()
            .filter(|state| !state.is_terminal())
            .count()
    }

    /// Drop every finished entry, returning how many were removed.
    pub fn purge_finished(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, state| !state.is_terminal());
        before - self.entries.len()
    }

    /// Remove a single entry regardless of state.
    pub fn forget(&mut self, utterance_id: &str) -> Option<UtteranceState> {
        self.entries.remove(utterance_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
