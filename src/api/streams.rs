use std::thread::{self, JoinHandle};

use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

#[cfg(frb_generated)]
use crate::frb_generated::StreamSink;
use crate::host::HostEvent;
use crate::telemetry::MetricEvent;

use super::RUNTIME;

/// Stream of normalized lifecycle events for the host
///
/// Yields one HostEvent per accepted engine signal, across all backends, in
/// acceptance order per backend. Events sent before subscribing are not
/// replayed. A consumer that falls more than the configured channel capacity
/// behind skips the overflow and keeps receiving newer events.
///
/// # Usage
/// ```dart
/// await for (final event in hostEventStream()) {
///   print('backend ${event.backendId}: ${event.kind}');
/// }
/// ```
#[cfg(frb_generated)]
#[allow(unused_must_use)] // frb macro generates code that triggers this lint
#[flutter_rust_bridge::frb]
pub fn host_event_stream(sink: StreamSink<HostEvent>) {
    let receiver = RUNTIME.host.subscribe();
    if let Err(err) = forward_broadcast("host-event-stream", receiver, move |event| {
        sink.add(event).is_ok()
    }) {
        log::error!("[HostStream] Failed to start forwarding thread: {}", err);
    }
}

/// Stream of bridge telemetry events for debug instrumentation
#[cfg(frb_generated)]
#[allow(unused_must_use)]
#[flutter_rust_bridge::frb]
pub fn telemetry_stream(sink: StreamSink<MetricEvent>) {
    let receiver = RUNTIME.dispatcher.telemetry().subscribe();
    if let Err(err) = forward_broadcast("telemetry-stream", receiver, move |event| {
        sink.add(event).is_ok()
    }) {
        log::error!("[Telemetry] Failed to start forwarding thread: {}", err);
    }
}

/// Pump a broadcast receiver into `add` on a dedicated thread.
///
/// Stops when `add` returns false (the Dart side closed its stream) or the
/// channel closes. Lagged receivers log the skipped count and continue.
pub(crate) fn forward_broadcast<T, F>(
    name: &str,
    mut receiver: broadcast::Receiver<T>,
    mut add: F,
) -> std::io::Result<JoinHandle<()>>
where
    T: Clone + Send + 'static,
    F: FnMut(T) -> bool + Send + 'static,
{
    let label = name.to_owned();
    thread::Builder::new().name(label.clone()).spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(err) => {
                log::error!("[{}] Failed to create Tokio runtime: {}", label, err);
                return;
            }
        };

        rt.block_on(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if !add(event) {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("[{}] Subscriber lagged, skipped {} events", label, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    })
}

/// Rust-side view of the host event stream.
#[flutter_rust_bridge::frb(ignore)]
pub fn host_events() -> impl Stream<Item = HostEvent> {
    BroadcastStream::new(RUNTIME.host.subscribe()).filter_map(|item| match item {
        Ok(event) => Some(event),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            log::warn!("[HostStream] Subscriber lagged, skipped {} events", skipped);
            None
        }
    })
}

/// Rust-side view of the telemetry stream.
#[flutter_rust_bridge::frb(ignore)]
pub fn telemetry_events() -> impl Stream<Item = MetricEvent> {
    BroadcastStream::new(RUNTIME.dispatcher.telemetry().subscribe())
        .filter_map(|item| item.ok())
}
