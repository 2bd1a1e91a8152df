// Public API for flutter_rust_bridge integration
// This module exposes the TTS event bridge to the host application. It is the
// only place (together with the Android JNI exports) where a process-wide
// dispatcher exists; library code always receives its dispatcher explicitly.

#![allow(dead_code)] // FFI functions are called from Dart, not detected by Rust analyzer

use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;

use crate::bridge::InitStatus;
use crate::config::BridgeConfig;
use crate::dispatcher::Dispatcher;
use crate::error::BridgeError;
use crate::host::BroadcastHostSink;
use crate::telemetry::TelemetrySnapshot;

// Re-export error code constants for FFI exposure
pub use crate::error::BridgeErrorCodes;

mod streams;

#[cfg(frb_generated)]
pub use streams::{host_event_stream, telemetry_stream};
pub use streams::{host_events, telemetry_events};

/// Process-level bridge state shared by the FFI and JNI entry points
pub(crate) struct BridgeRuntime {
    pub(crate) host: Arc<BroadcastHostSink>,
    pub(crate) dispatcher: Arc<Dispatcher>,
}

impl BridgeRuntime {
    fn new(config: &BridgeConfig) -> Self {
        let host = Arc::new(BroadcastHostSink::new(config.host.channel_capacity));
        let dispatcher = Arc::new(Dispatcher::with_config(host.clone(), config));
        Self { host, dispatcher }
    }
}

static RUNTIME: Lazy<BridgeRuntime> = Lazy::new(|| BridgeRuntime::new(&BridgeConfig::load()));

pub(crate) fn runtime() -> &'static BridgeRuntime {
    &RUNTIME
}

/// Get the version of the bridge library
#[flutter_rust_bridge::frb(sync)]
pub fn get_version() -> Result<String> {
    Ok(env!("CARGO_PKG_VERSION").to_string())
}

/// Register a synthesis backend
///
/// Must be called before the engine reports init for `backend_id`.
///
/// # Errors
/// - `DuplicateBackend` if the id is already registered
#[flutter_rust_bridge::frb(sync)]
pub fn register_backend(backend_id: u32) -> Result<(), BridgeError> {
    RUNTIME.dispatcher.register_backend(backend_id).map(|_| ())
}

/// Deregister a synthesis backend
///
/// Only call once the engine has been shut down; callbacks already in
/// flight are not fenced.
///
/// # Errors
/// - `UnknownBackend` if the id is not registered
#[flutter_rust_bridge::frb(sync)]
pub fn deregister_backend(backend_id: u32) -> Result<(), BridgeError> {
    RUNTIME.dispatcher.deregister_backend(backend_id)
}

/// Ids of all registered backends, ascending
#[flutter_rust_bridge::frb(sync)]
pub fn registered_backends() -> Result<Vec<u32>, BridgeError> {
    RUNTIME.dispatcher.registry().backend_ids()
}

/// Report the engine's init outcome for a backend
#[flutter_rust_bridge::frb(sync)]
pub fn notify_init(backend_id: u32, status: InitStatus) -> Result<(), BridgeError> {
    RUNTIME.dispatcher.notify_init(backend_id, status)
}

/// Report that the engine started speaking an utterance
#[flutter_rust_bridge::frb(sync)]
pub fn notify_start(backend_id: u32, utterance_id: String) -> Result<(), BridgeError> {
    RUNTIME.dispatcher.notify_start(backend_id, &utterance_id)
}

/// Report that an utterance was stopped, optionally by interruption
#[flutter_rust_bridge::frb(sync)]
pub fn notify_stop(
    backend_id: u32,
    utterance_id: String,
    interrupted: bool,
) -> Result<(), BridgeError> {
    RUNTIME
        .dispatcher
        .notify_stop(backend_id, &utterance_id, interrupted)
}

/// Report that an utterance finished speaking
#[flutter_rust_bridge::frb(sync)]
pub fn notify_done(backend_id: u32, utterance_id: String) -> Result<(), BridgeError> {
    RUNTIME.dispatcher.notify_done(backend_id, &utterance_id)
}

/// Report that an utterance failed
#[flutter_rust_bridge::frb(sync)]
pub fn notify_error(backend_id: u32, utterance_id: String) -> Result<(), BridgeError> {
    RUNTIME.dispatcher.notify_error(backend_id, &utterance_id)
}

/// Forget finished utterances of a backend so their ids can be reused
///
/// # Returns
/// Number of entries removed
#[flutter_rust_bridge::frb(sync)]
pub fn purge_finished(backend_id: u32) -> Result<usize, BridgeError> {
    RUNTIME.dispatcher.purge_finished(backend_id)
}

/// Snapshot of bridge telemetry counters and recent metric events
#[flutter_rust_bridge::frb(sync)]
pub fn bridge_telemetry_snapshot() -> TelemetrySnapshot {
    RUNTIME.dispatcher.telemetry().snapshot()
}

#[cfg(test)]
mod tests;
