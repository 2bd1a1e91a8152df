// Error types for the TTS event bridge
//
// This module defines the contract-violation errors raised while bridging
// engine callbacks, with numeric codes suitable for FFI communication.

mod bridge;

pub use bridge::{log_bridge_error, BridgeError, BridgeErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the FFI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
