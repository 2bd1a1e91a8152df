//! Integration tests for the engine → bridge → host path
//!
//! These tests validate the bridge through its public API:
//! - The documented backend 7 / backend 9 scenarios
//! - Per-utterance ordering seen by the host
//! - Isolation of backends driven from separate threads
//! - Host delivery through the broadcast sink with tokio subscribers

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use tts_bridge::{
    BridgeError, BroadcastHostSink, Dispatcher, HostEvent, HostEventKind, HostSink, InitStatus,
    RecordingHostSink, Signal, UtteranceListener,
};

fn recording_dispatcher() -> (Arc<RecordingHostSink>, Arc<Dispatcher>) {
    let sink = Arc::new(RecordingHostSink::new());
    let dispatcher = Arc::new(Dispatcher::new(sink.clone()));
    (sink, dispatcher)
}

/// Register backend 7, run one utterance, then replay a duplicate done
#[test]
fn test_backend_seven_end_to_end() {
    let (sink, dispatcher) = recording_dispatcher();
    dispatcher.register_backend(7).unwrap();

    dispatcher.notify_init(7, InitStatus::Success).unwrap();
    assert_eq!(
        sink.take(),
        vec![HostEvent {
            backend_id: 7,
            kind: HostEventKind::Init {
                status: InitStatus::Success
            }
        }]
    );

    dispatcher.notify_start(7, "u1").unwrap();
    assert_eq!(sink.take(), vec![HostEvent::start(7, "u1")]);

    dispatcher.notify_done(7, "u1").unwrap();
    assert_eq!(sink.take(), vec![HostEvent::done(7, "u1")]);

    let err = dispatcher.notify_done(7, "u1").unwrap_err();
    assert!(matches!(err, BridgeError::InvalidTransition { .. }));
    assert!(sink.is_empty(), "rejected done must not reach the host");

    let err = dispatcher.notify_stop(7, "u2", true).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::InvalidTransition {
            signal: Signal::Stop,
            ..
        }
    ));
}

#[test]
fn test_unregistered_backend_never_mutates_state() {
    let (sink, dispatcher) = recording_dispatcher();

    assert_eq!(
        dispatcher.notify_init(9, InitStatus::Success),
        Err(BridgeError::UnknownBackend { backend_id: 9 })
    );
    assert!(dispatcher.notify_start(9, "u1").is_err());
    assert!(dispatcher.notify_done(9, "u1").is_err());

    assert!(sink.is_empty());
    assert!(dispatcher.registry().is_empty());

    // Registering afterwards yields a pristine bridge
    let bridge = dispatcher.register_backend(9).unwrap();
    assert_eq!(bridge.init_status().unwrap(), None);
    assert_eq!(bridge.utterance_state("u1").unwrap(), None);
}

#[test]
fn test_invalid_sequences_produce_no_events() {
    let invalid: Vec<Vec<Signal>> = vec![
        vec![Signal::Stop],
        vec![Signal::Done],
        vec![Signal::Error],
        vec![Signal::Start, Signal::Done, Signal::Done],
        vec![Signal::Start, Signal::Stop, Signal::Error],
        vec![Signal::Start, Signal::Start],
    ];

    for sequence in invalid {
        let (sink, dispatcher) = recording_dispatcher();
        dispatcher.register_backend(1).unwrap();
        dispatcher.notify_init(1, InitStatus::Success).unwrap();
        sink.take();

        let mut accepted = 0;
        let mut last = Ok(());
        for signal in &sequence {
            last = match signal {
                Signal::Start => dispatcher.notify_start(1, "id"),
                Signal::Stop => dispatcher.notify_stop(1, "id", false),
                Signal::Done => dispatcher.notify_done(1, "id"),
                Signal::Error => dispatcher.notify_error(1, "id"),
                Signal::Init => unreachable!(),
            };
            if last.is_ok() {
                accepted += 1;
            }
        }

        assert!(
            matches!(last, Err(BridgeError::InvalidTransition { .. })),
            "{sequence:?} should end in InvalidTransition"
        );
        assert_eq!(sink.len(), accepted, "{sequence:?}");
    }
}

/// Two backends with disjoint id spaces on separate threads
#[test]
fn test_backends_isolated_across_threads() {
    const UTTERANCES: usize = 200;

    let (sink, dispatcher) = recording_dispatcher();
    for backend_id in [1, 2] {
        dispatcher.register_backend(backend_id).unwrap();
        dispatcher
            .notify_init(backend_id, InitStatus::Success)
            .unwrap();
    }

    let workers: Vec<_> = [1u32, 2u32]
        .into_iter()
        .map(|backend_id| {
            let listener = dispatcher.listener(backend_id);
            thread::spawn(move || {
                for n in 0..UTTERANCES {
                    let id = format!("b{backend_id}-{n}");
                    listener.on_start(&id).unwrap();
                    if n % 2 == 0 {
                        listener.on_done(&id).unwrap();
                    } else {
                        listener.on_stop(&id, true).unwrap();
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked");
    }

    let events = sink.events();
    assert_eq!(events.len(), 2 + 2 * 2 * UTTERANCES);

    for backend_id in [1u32, 2u32] {
        let prefix = format!("b{backend_id}-");
        let own: Vec<&HostEvent> = events
            .iter()
            .filter(|event| event.backend_id == backend_id)
            .collect();
        assert_eq!(own.len(), 1 + 2 * UTTERANCES);
        assert!(own
            .iter()
            .filter_map(|event| event.utterance_id())
            .all(|id| id.starts_with(&prefix)));

        let bridge = dispatcher.registry().resolve(backend_id).unwrap();
        assert_eq!(bridge.in_flight().unwrap(), 0);
    }
}

/// Racing callbacks for the same utterance never reach the host out of order
#[test]
fn test_racing_terminals_forward_exactly_one() {
    let (sink, dispatcher) = recording_dispatcher();
    dispatcher.register_backend(3).unwrap();
    dispatcher.notify_init(3, InitStatus::Success).unwrap();

    for round in 0..50 {
        let id = format!("race-{round}");
        dispatcher.notify_start(3, &id).unwrap();

        let racers: Vec<_> = (0..4)
            .map(|n| {
                let dispatcher = Arc::clone(&dispatcher);
                let id = id.clone();
                thread::spawn(move || match n % 3 {
                    0 => dispatcher.notify_done(3, &id).is_ok(),
                    1 => dispatcher.notify_error(3, &id).is_ok(),
                    _ => dispatcher.notify_stop(3, &id, true).is_ok(),
                })
            })
            .collect();

        let winners = racers
            .into_iter()
            .map(|racer| racer.join().expect("racer panicked"))
            .filter(|accepted| *accepted)
            .count();
        assert_eq!(winners, 1, "round {round}");
    }

    let events = sink.events();
    for round in 0..50 {
        let id = format!("race-{round}");
        let signals: Vec<Signal> = events
            .iter()
            .filter(|event| event.utterance_id() == Some(id.as_str()))
            .map(HostEvent::signal)
            .collect();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0], Signal::Start);
    }
}

#[test]
fn test_broadcast_host_receives_events() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build test runtime");

    let host = Arc::new(BroadcastHostSink::new(16));
    let dispatcher = Arc::new(Dispatcher::new(host.clone()));
    let mut rx = host.subscribe();

    let engine = {
        let dispatcher = Arc::clone(&dispatcher);
        thread::spawn(move || {
            dispatcher.register_backend(11).unwrap();
            dispatcher.notify_init(11, InitStatus::Success).unwrap();
            dispatcher.notify_start(11, "hello").unwrap();
            dispatcher.notify_error(11, "hello").unwrap();
        })
    };
    engine.join().expect("engine thread panicked");

    let received = runtime.block_on(async move {
        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(rx.recv().await.expect("host channel open"));
        }
        received
    });

    assert_eq!(
        received,
        vec![
            HostEvent::init(11, InitStatus::Success),
            HostEvent::start(11, "hello"),
            HostEvent::error(11, "hello"),
        ]
    );
}

/// Host sink that panics on one utterance of backend 21
struct FlakyHost {
    delivered: RecordingHostSink,
}

impl HostSink for FlakyHost {
    fn deliver(&self, event: HostEvent) {
        if event.backend_id == 21 && event.utterance_id() == Some("boom") {
            panic!("host rejected event");
        }
        self.delivered.deliver(event);
    }
}

#[test]
fn test_panicking_host_does_not_disable_backend() {
    let host = Arc::new(FlakyHost {
        delivered: RecordingHostSink::new(),
    });
    let dispatcher = Dispatcher::new(host.clone());
    for backend_id in [21, 22] {
        dispatcher.register_backend(backend_id).unwrap();
        dispatcher
            .notify_init(backend_id, InitStatus::Success)
            .unwrap();
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatcher.notify_start(21, "boom")));
    assert!(outcome.is_err());

    // The other backend never noticed
    dispatcher.notify_start(22, "u1").unwrap();

    assert!(matches!(
        dispatcher.notify_start(21, "u1"),
        Err(BridgeError::LockPoisoned { .. })
    ));
    dispatcher.notify_start(21, "u1").unwrap();
    dispatcher.notify_done(21, "u1").unwrap();

    assert_eq!(dispatcher.telemetry().snapshot().violations, 1);
    let tail: Vec<HostEvent> = host.delivered.events().into_iter().skip(2).collect();
    assert_eq!(
        tail,
        vec![
            HostEvent::start(22, "u1"),
            HostEvent::start(21, "u1"),
            HostEvent::done(21, "u1"),
        ]
    );
}
