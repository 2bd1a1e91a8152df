// TTS Bridge Core - Rust event bridge
// Validates speech engine lifecycle callbacks and forwards them to the host

// Module declarations
pub mod api;
pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod listener;
pub mod registry;
pub mod replay;
pub mod telemetry;

#[cfg(target_os = "android")]
mod android;

// Written by `flutter_rust_bridge_codegen generate`; build.rs enables the cfg
// once the file exists.
#[cfg(frb_generated)]
mod frb_generated;

// Re-exports for convenience
pub use bridge::{Bridge, InitStatus};
pub use config::BridgeConfig;
pub use dispatcher::Dispatcher;
pub use error::{BridgeError, BridgeErrorCodes, ErrorCode};
pub use host::{BroadcastHostSink, HostEvent, HostEventKind, HostSink, RecordingHostSink};
pub use lifecycle::{Signal, UtteranceLifecycle, UtteranceState};
pub use listener::{BackendListener, UtteranceListener};
pub use registry::BackendRegistry;

/// Install the process-wide tracing subscriber
///
/// On Android output goes to logcat under the `TtsBridge` tag, elsewhere to
/// stderr. `log` records are routed through the same subscriber. Calling it
/// again after a subscriber is installed is a no-op.
pub fn init_logging(max_level: tracing::Level) {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "android")] {
            use tracing_subscriber::filter::LevelFilter;
            use tracing_subscriber::layer::SubscriberExt;
            use tracing_subscriber::util::SubscriberInitExt;

            match tracing_android::layer("TtsBridge") {
                Ok(layer) => {
                    let _ = tracing_subscriber::registry()
                        .with(LevelFilter::from_level(max_level))
                        .with(layer)
                        .try_init();
                }
                Err(err) => eprintln!("TtsBridge: failed to open logcat: {}", err),
            }
        } else {
            let _ = tracing_subscriber::fmt()
                .with_max_level(max_level)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
