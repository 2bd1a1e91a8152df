// Every test uses its own backend ids: the FFI runtime is shared by the
// whole test binary.

use std::sync::mpsc;
use std::time::Duration;

use super::streams::forward_broadcast;
use super::*;
use crate::host::HostEvent;
use futures::StreamExt;
use tokio::sync::broadcast;

#[test]
fn test_get_version() {
    let result = get_version().unwrap();
    assert_eq!(result, "0.1.0");
}

#[test]
fn test_ffi_lifecycle_round() {
    register_backend(1001).unwrap();
    notify_init(1001, InitStatus::Success).unwrap();
    notify_start(1001, "greeting".to_string()).unwrap();
    notify_stop(1001, "greeting".to_string(), true).unwrap();

    assert!(matches!(
        notify_done(1001, "greeting".to_string()),
        Err(BridgeError::InvalidTransition { backend_id: 1001, .. })
    ));
    assert!(registered_backends().unwrap().contains(&1001));

    assert_eq!(purge_finished(1001).unwrap(), 1);
    deregister_backend(1001).unwrap();
    assert!(!registered_backends().unwrap().contains(&1001));
}

#[test]
fn test_ffi_rejects_unknown_backend() {
    assert_eq!(
        notify_init(1999, InitStatus::Success),
        Err(BridgeError::UnknownBackend { backend_id: 1999 })
    );
    assert_eq!(
        notify_error(1999, "u1".to_string()),
        Err(BridgeError::UnknownBackend { backend_id: 1999 })
    );
}

#[test]
fn test_host_events_receive_backend_events() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    runtime.block_on(async {
        let stream = host_events();
        tokio::pin!(stream);

        register_backend(1002).unwrap();
        notify_init(1002, InitStatus::Failure).unwrap();

        // Other tests publish into the same channel; skip their events
        let event = loop {
            let event = stream.next().await.expect("stream open");
            if event.backend_id == 1002 {
                break event;
            }
        };
        assert_eq!(event, HostEvent::init(1002, InitStatus::Failure));
    });
}

#[test]
fn test_telemetry_snapshot_counts_violations() {
    let before = bridge_telemetry_snapshot().violations;
    let _ = notify_start(1998, "orphan".to_string());
    assert!(bridge_telemetry_snapshot().violations > before);
}

#[test]
fn test_forwarder_pumps_host_events_until_sink_closes() {
    register_backend(1003).unwrap();
    let (tx, rx) = mpsc::channel();
    let mut accepted = 0;
    let receiver = runtime().host.subscribe();
    let forwarder = forward_broadcast("test-host-forwarder", receiver, move |event: HostEvent| {
        if event.backend_id != 1003 {
            return true;
        }
        accepted += 1;
        let _ = tx.send(event);
        // Dart closes the stream after the second event
        accepted < 2
    })
    .unwrap();

    notify_init(1003, InitStatus::Success).unwrap();
    notify_start(1003, "hello".to_string()).unwrap();
    notify_done(1003, "hello".to_string()).unwrap();

    let timeout = Duration::from_secs(5);
    assert_eq!(
        rx.recv_timeout(timeout).unwrap(),
        HostEvent::init(1003, InitStatus::Success)
    );
    assert_eq!(rx.recv_timeout(timeout).unwrap(), HostEvent::start(1003, "hello"));
    forwarder.join().expect("forwarder panicked");
    assert!(rx.try_recv().is_err(), "nothing forwarded after the sink closed");
}

#[test]
fn test_forwarder_stops_when_channel_closes() {
    let (sender, receiver) = broadcast::channel::<u32>(4);
    let (tx, rx) = mpsc::channel();
    let forwarder = forward_broadcast("test-closing-forwarder", receiver, move |value| {
        tx.send(value).is_ok()
    })
    .unwrap();

    sender.send(7).unwrap();
    drop(sender);

    forwarder.join().expect("forwarder panicked");
    assert_eq!(rx.try_recv().unwrap(), 7);
}
