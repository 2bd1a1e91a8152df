//! Engine-facing listener contract.
//!
//! Mirrors Android's `UtteranceProgressListener` + `OnInitListener` pair: an
//! engine adapter holds an [`UtteranceListener`] and calls it from its own
//! callback threads. Unlike the platform interfaces, every method reports
//! whether the signal was accepted.

use std::sync::Arc;

use crate::bridge::InitStatus;
use crate::dispatcher::Dispatcher;
use crate::error::BridgeError;

/// Lifecycle callbacks for a single synthesis backend.
pub trait UtteranceListener: Send + Sync {
    fn on_init(&self, status: InitStatus) -> Result<(), BridgeError>;
    fn on_start(&self, utterance_id: &str) -> Result<(), BridgeError>;
    fn on_stop(&self, utterance_id: &str, interrupted: bool) -> Result<(), BridgeError>;
    fn on_done(&self, utterance_id: &str) -> Result<(), BridgeError>;
    fn on_error(&self, utterance_id: &str) -> Result<(), BridgeError>;
}

/// [`UtteranceListener`] bound to one backend id of a shared dispatcher.
#[derive(Clone)]
pub struct BackendListener {
    dispatcher: Arc<Dispatcher>,
    backend_id: u32,
}

impl BackendListener {
    pub fn new(dispatcher: Arc<Dispatcher>, backend_id: u32) -> Self {
        Self {
            dispatcher,
            backend_id,
        }
    }

    pub fn backend_id(&self) -> u32 {
        self.backend_id
    }
}

impl UtteranceListener for BackendListener {
    fn on_init(&self, status: InitStatus) -> Result<(), BridgeError> {
        self.dispatcher.notify_init(self.backend_id, status)
    }

    fn on_start(&self, utterance_id: &str) -> Result<(), BridgeError> {
        self.dispatcher.notify_start(self.backend_id, utterance_id)
    }

    fn on_stop(&self, utterance_id: &str, interrupted: bool) -> Result<(), BridgeError> {
        self.dispatcher
            .notify_stop(self.backend_id, utterance_id, interrupted)
    }

    fn on_done(&self, utterance_id: &str) -> Result<(), BridgeError> {
        self.dispatcher.notify_done(self.backend_id, utterance_id)
    }

    fn on_error(&self, utterance_id: &str) -> Result<(), BridgeError> {
        self.dispatcher.notify_error(self.backend_id, utterance_id)
    }
}
