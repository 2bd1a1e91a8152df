//! Dispatcher: the single entry point invoked by the synthesis engine.
//!
//! Each `notify_*` call resolves the backend, lets its [`Bridge`] validate
//! and forward the event, and reports the outcome to telemetry. Violations
//! are logged and returned to the caller; nothing invalid reaches the host.
//!
//! ```text
//! engine callback
//!   └─> Dispatcher::notify_done(backend_id, utterance_id)
//!       ├─> BackendRegistry::resolve()      [registry read lock]
//!       ├─> Bridge::on_done()               [bridge lock]
//!       │   ├─> UtteranceLifecycle::on_done()
//!       │   └─> HostSink::deliver()
//!       └─> TelemetryCollector::record_*()
//! ```

use std::sync::Arc;

use log::info;

use crate::bridge::{Bridge, InitStatus};
use crate::config::{BridgeConfig, LifecycleConfig};
use crate::error::{log_bridge_error, BridgeError};
use crate::host::HostSink;
use crate::lifecycle::Signal;
use crate::listener::BackendListener;
use crate::registry::BackendRegistry;
use crate::telemetry::TelemetryCollector;

/// Routes engine lifecycle callbacks to the owning backend's bridge.
pub struct Dispatcher {
    registry: BackendRegistry,
    host: Arc<dyn HostSink>,
    telemetry: Arc<TelemetryCollector>,
    lifecycle: LifecycleConfig,
}

impl Dispatcher {
    /// Create a dispatcher with default lifecycle and telemetry settings.
    pub fn new(host: Arc<dyn HostSink>) -> Self {
        Self::with_config(host, &BridgeConfig::default())
    }

    pub fn with_config(host: Arc<dyn HostSink>, config: &BridgeConfig) -> Self {
        Self {
            registry: BackendRegistry::new(),
            host,
            telemetry: Arc::new(TelemetryCollector::from_config(&config.telemetry)),
            lifecycle: config.lifecycle.clone(),
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn telemetry(&self) -> &Arc<TelemetryCollector> {
        &self.telemetry
    }

    /// Register a fresh bridge for `backend_id`.
    pub fn register_backend(&self, backend_id: u32) -> Result<Arc<Bridge>, BridgeError> {
        let bridge = Bridge::with_config(backend_id, &self.lifecycle);
        let registered = self
            .registry
            .register(bridge)
            .map_err(|err| self.reject(err, "register_backend"))?;
        self.telemetry.record_registered(backend_id);
        Ok(registered)
    }

    /// Remove a backend. The engine must have stopped calling back for it.
    pub fn deregister_backend(&self, backend_id: u32) -> Result<(), BridgeError> {
        let bridge = self
            .registry
            .deregister(backend_id)
            .map_err(|err| self.reject(err, "deregister_backend"))?;
        if let Ok(in_flight) = bridge.in_flight() {
            if in_flight > 0 {
                log::warn!(
                    "[Dispatcher] Backend {} deregistered with {} utterances still in flight",
                    backend_id,
                    in_flight
                );
            }
        }
        self.telemetry.record_deregistered(backend_id);
        Ok(())
    }

    /// Listener bound to one backend, for handing to an engine adapter.
    pub fn listener(self: &Arc<Self>, backend_id: u32) -> BackendListener {
        BackendListener::new(Arc::clone(self), backend_id)
    }

    pub fn notify_init(&self, backend_id: u32, status: InitStatus) -> Result<(), BridgeError> {
        let result = self
            .registry
            .resolve(backend_id)
            .and_then(|bridge| bridge.on_init(status, self.host.as_ref()));
        if result.is_ok() {
            info!(
                "[Dispatcher] Backend {} initialized: {:?}",
                backend_id, status
            );
        }
        self.settle(result, backend_id, Signal::Init, "notify_init")
    }

    pub fn notify_start(&self, backend_id: u32, utterance_id: &str) -> Result<(), BridgeError> {
        let result = self
            .registry
            .resolve(backend_id)
            .and_then(|bridge| bridge.on_start(utterance_id, self.host.as_ref()));
        self.settle(result, backend_id, Signal::Start, "notify_start")
    }

    pub fn notify_stop(
        &self,
        backend_id: u32,
        utterance_id: &str,
        interrupted: bool,
    ) -> Result<(), BridgeError> {
        let result = self
            .registry
            .resolve(backend_id)
            .and_then(|bridge| bridge.on_stop(utterance_id, interrupted, self.host.as_ref()));
        self.settle(result, backend_id, Signal::Stop, "notify_stop")
    }

    pub fn notify_done(&self, backend_id: u32, utterance_id: &str) -> Result<(), BridgeError> {
        let result = self
            .registry
            .resolve(backend_id)
            .and_then(|bridge| bridge.on_done(utterance_id, self.host.as_ref()));
        self.settle(result, backend_id, Signal::Done, "notify_done")
    }

    pub fn notify_error(&self, backend_id: u32, utterance_id: &str) -> Result<(), BridgeError> {
        let result = self
            .registry
            .resolve(backend_id)
            .and_then(|bridge| bridge.on_error(utterance_id, self.host.as_ref()));
        self.settle(result, backend_id, Signal::Error, "notify_error")
    }

    /// Forget finished utterances of one backend; returns how many.
    pub fn purge_finished(&self, backend_id: u32) -> Result<usize, BridgeError> {
        self.registry
            .resolve(backend_id)
            .and_then(|bridge| bridge.purge_finished())
            .map_err(|err| self.reject(err, "purge_finished"))
    }

    fn settle(
        &self,
        result: Result<(), BridgeError>,
        backend_id: u32,
        signal: Signal,
        context: &str,
    ) -> Result<(), BridgeError> {
        match result {
            Ok(()) => {
                self.telemetry.record_forwarded(backend_id, signal);
                Ok(())
            }
            Err(err) => Err(self.reject(err, context)),
        }
    }

    fn reject(&self, err: BridgeError, context: &str) -> BridgeError {
        log_bridge_error(&err, context);
        self.telemetry.record_violation(&err, context);
        err
    }
}
