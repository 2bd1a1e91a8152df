// Bridge error types and constants

use crate::error::ErrorCode;
use crate::lifecycle::{Signal, UtteranceState};
use flutter_rust_bridge::frb;
use log::error;
use std::fmt;

/// Bridge error code constants exposed to Dart via FFI
///
/// These constants are the single source of truth for error codes shared
/// between Rust, Kotlin and Dart. flutter_rust_bridge generates matching
/// Dart getters from the methods below.
///
/// Error code range: 3001-3006
#[frb(unignore)]
pub struct BridgeErrorCodes {}

#[frb]
impl BridgeErrorCodes {
    /// Event references a backend id with no registered bridge
    pub const UNKNOWN_BACKEND: i32 = 3001;

    /// Registration collides with an existing backend id
    pub const DUPLICATE_BACKEND: i32 = 3002;

    /// Second Init signal for an already initialized backend
    pub const DUPLICATE_INIT: i32 = 3003;

    /// Utterance signal for an absent, finished or out-of-order utterance
    pub const INVALID_TRANSITION: i32 = 3004;

    /// Utterance signal arrived before the backend reported Init
    pub const NOT_INITIALIZED: i32 = 3005;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 3006;

    /// Get UNKNOWN_BACKEND error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn unknown_backend() -> i32 {
        Self::UNKNOWN_BACKEND
    }

    /// Get DUPLICATE_BACKEND error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn duplicate_backend() -> i32 {
        Self::DUPLICATE_BACKEND
    }

    /// Get DUPLICATE_INIT error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn duplicate_init() -> i32 {
        Self::DUPLICATE_INIT
    }

    /// Get INVALID_TRANSITION error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn invalid_transition() -> i32 {
        Self::INVALID_TRANSITION
    }

    /// Get NOT_INITIALIZED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn not_initialized() -> i32 {
        Self::NOT_INITIALIZED
    }

    /// Get LOCK_POISONED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn lock_poisoned() -> i32 {
        Self::LOCK_POISONED
    }
}

/// Log a bridge error with structured context
///
/// `context` names the entry point that rejected the signal, e.g.
/// `notify_done`. The logging is non-blocking and will not panic.
pub fn log_bridge_error(err: &BridgeError, context: &str) {
    error!(
        "Bridge error in {}: code={}, backend={:?}, message={}",
        context,
        err.code(),
        err.backend_id(),
        err.message()
    );
}

/// Contract violations detected while bridging engine callbacks
///
/// None of these are fatal: the affected backend keeps accepting signals
/// for unrelated utterance ids.
///
/// Error code range: 3001-3006
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// No bridge is registered under this backend id
    UnknownBackend { backend_id: u32 },

    /// A bridge is already registered under this backend id
    DuplicateBackend { backend_id: u32 },

    /// Init was already reported for this backend
    DuplicateInit { backend_id: u32 },

    /// The utterance is absent, already finished, or already started
    InvalidTransition {
        backend_id: u32,
        utterance_id: String,
        signal: Signal,
        found: Option<UtteranceState>,
    },

    /// An utterance signal arrived before Init
    NotInitialized { backend_id: u32, signal: Signal },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl BridgeError {
    /// Backend the violation was reported against, if any
    pub fn backend_id(&self) -> Option<u32> {
        match self {
            BridgeError::UnknownBackend { backend_id }
            | BridgeError::DuplicateBackend { backend_id }
            | BridgeError::DuplicateInit { backend_id }
            | BridgeError::InvalidTransition { backend_id, .. }
            | BridgeError::NotInitialized { backend_id, .. } => Some(*backend_id),
            BridgeError::LockPoisoned { .. } => None,
        }
    }
}

impl ErrorCode for BridgeError {
    fn code(&self) -> i32 {
        match self {
            BridgeError::UnknownBackend { .. } => BridgeErrorCodes::UNKNOWN_BACKEND,
            BridgeError::DuplicateBackend { .. } => BridgeErrorCodes::DUPLICATE_BACKEND,
            BridgeError::DuplicateInit { .. } => BridgeErrorCodes::DUPLICATE_INIT,
            BridgeError::InvalidTransition { .. } => BridgeErrorCodes::INVALID_TRANSITION,
            BridgeError::NotInitialized { .. } => BridgeErrorCodes::NOT_INITIALIZED,
            BridgeError::LockPoisoned { .. } => BridgeErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            BridgeError::UnknownBackend { backend_id } => {
                format!("No TTS backend registered with id {}", backend_id)
            }
            BridgeError::DuplicateBackend { backend_id } => {
                format!(
                    "TTS backend {} is already registered. Deregister it first.",
                    backend_id
                )
            }
            BridgeError::DuplicateInit { backend_id } => {
                format!("TTS backend {} already reported its init status", backend_id)
            }
            BridgeError::InvalidTransition {
                backend_id,
                utterance_id,
                signal,
                found,
            } => match found {
                Some(state) => format!(
                    "Invalid {} for utterance '{}' on backend {}: utterance is {}",
                    signal, utterance_id, backend_id, state
                ),
                None => format!(
                    "Invalid {} for utterance '{}' on backend {}: utterance was never started",
                    signal, utterance_id, backend_id
                ),
            },
            BridgeError::NotInitialized { backend_id, signal } => {
                format!(
                    "Received {} before init on TTS backend {}",
                    signal, backend_id
                )
            }
            BridgeError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BridgeError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for BridgeError {}
