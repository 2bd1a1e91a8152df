//! Per-backend bridge state.
//!
//! A [`Bridge`] owns the one-shot init status and the utterance state
//! machine for a single synthesis backend. Every operation takes the
//! bridge's lock, applies the transition, and delivers the resulting host
//! event before releasing it, so the host observes events for one backend in
//! exactly the order they were accepted.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::config::LifecycleConfig;
use crate::error::BridgeError;
use crate::host::{HostEvent, HostSink};
use crate::lifecycle::{Signal, TransitionViolation, UtteranceLifecycle, UtteranceState};

/// Outcome of engine initialization, reported once per backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStatus {
    Success,
    Failure,
}

impl InitStatus {
    /// `TextToSpeech.SUCCESS` on Android.
    pub const ANDROID_SUCCESS: i32 = 0;

    /// Map Android's `OnInitListener.onInit(status)` code.
    pub fn from_android(status: i32) -> Self {
        if status == Self::ANDROID_SUCCESS {
            InitStatus::Success
        } else {
            InitStatus::Failure
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InitStatus::Success)
    }
}

struct BridgeState {
    init: Option<InitStatus>,
    lifecycle: UtteranceLifecycle,
}

/// Bridge for one registered synthesis backend.
pub struct Bridge {
    backend_id: u32,
    purge_on_terminal: bool,
    state: Mutex<BridgeState>,
}

impl Bridge {
    pub fn new(backend_id: u32) -> Self {
        Self::with_config(backend_id, &LifecycleConfig::default())
    }

    pub fn with_config(backend_id: u32, config: &LifecycleConfig) -> Self {
        Self {
            backend_id,
            purge_on_terminal: config.purge_on_terminal,
            state: Mutex::new(BridgeState {
                init: None,
                lifecycle: UtteranceLifecycle::new(),
            }),
        }
    }

    pub fn backend_id(&self) -> u32 {
        self.backend_id
    }

    /// Lock the bridge state.
    ///
    /// Every transition is committed before host delivery, so a panic while
    /// the lock is held cannot leave the state half-updated. The poison flag
    /// is cleared and reported once as `LockPoisoned`; later calls see the
    /// state as it was when the panic happened.
    fn lock_state(&self) -> Result<MutexGuard<'_, BridgeState>, BridgeError> {
        self.state.lock().map_err(|_| {
            self.state.clear_poison();
            tracing::warn!(
                backend_id = self.backend_id,
                "recovered from a panic while the bridge lock was held"
            );
            BridgeError::LockPoisoned {
                component: format!("bridge {}", self.backend_id),
            }
        })
    }

    pub fn init_status(&self) -> Result<Option<InitStatus>, BridgeError> {
        Ok(self.lock_state()?.init)
    }

    /// Record the engine's init outcome and forward it to the host.
    pub fn on_init(&self, status: InitStatus, sink: &dyn HostSink) -> Result<(), BridgeError> {
        let mut state = self.lock_state()?;
        if state.init.is_some() {
            return Err(BridgeError::DuplicateInit {
                backend_id: self.backend_id,
            });
        }
        state.init = Some(status);
        sink.deliver(HostEvent::init(self.backend_id, status));
        tracing::debug!(backend_id = self.backend_id, ?status, "init forwarded");
        Ok(())
    }

    pub fn on_start(&self, utterance_id: &str, sink: &dyn HostSink) -> Result<(), BridgeError> {
        self.apply(
            Signal::Start,
            utterance_id,
            sink,
            |lifecycle| lifecycle.on_start(utterance_id),
            || HostEvent::start(self.backend_id, utterance_id),
        )
    }

    pub fn on_stop(
        &self,
        utterance_id: &str,
        interrupted: bool,
        sink: &dyn HostSink,
    ) -> Result<(), BridgeError> {
        self.apply(
            Signal::Stop,
            utterance_id,
            sink,
            |lifecycle| lifecycle.on_stop(utterance_id, interrupted),
            || HostEvent::stop(self.backend_id, utterance_id, interrupted),
        )
    }

    pub fn on_done(&self, utterance_id: &str, sink: &dyn HostSink) -> Result<(), BridgeError> {
        self.apply(
            Signal::Done,
            utterance_id,
            sink,
            |lifecycle| lifecycle.on_done(utterance_id),
            || HostEvent::done(self.backend_id, utterance_id),
        )
    }

    pub fn on_error(&self, utterance_id: &str, sink: &dyn HostSink) -> Result<(), BridgeError> {
        self.apply(
            Signal::Error,
            utterance_id,
            sink,
            |lifecycle| lifecycle.on_error(utterance_id),
            || HostEvent::error(self.backend_id, utterance_id),
        )
    }

    fn apply(
        &self,
        signal: Signal,
        utterance_id: &str,
        sink: &dyn HostSink,
        transition: impl FnOnce(&mut UtteranceLifecycle) -> Result<(), TransitionViolation>,
        event: impl FnOnce() -> HostEvent,
    ) -> Result<(), BridgeError> {
        let mut state = self.lock_state()?;
        if state.init.is_none() {
            return Err(BridgeError::NotInitialized {
                backend_id: self.backend_id,
                signal,
            });
        }

        transition(&mut state.lifecycle).map_err(|violation| BridgeError::InvalidTransition {
            backend_id: self.backend_id,
            utterance_id: utterance_id.to_owned(),
            signal: violation.signal,
            found: violation.found,
        })?;

        sink.deliver(event());

        if self.purge_on_terminal && signal != Signal::Start {
            state.lifecycle.forget(utterance_id);
        }

        tracing::debug!(
            backend_id = self.backend_id,
            utterance_id,
            %signal,
            "utterance event forwarded"
        );
        Ok(())
    }

    pub fn utterance_state(&self, utterance_id: &str) -> Result<Option<UtteranceState>, BridgeError> {
        Ok(self.lock_state()?.lifecycle.state(utterance_id))
    }

    pub fn in_flight(&self) -> Result<usize, BridgeError> {
        Ok(self.lock_state()?.lifecycle.in_flight())
    }

    /// Forget finished utterances so their ids may be started again.
    pub fn purge_finished(&self) -> Result<usize, BridgeError> {
        Ok(self.lock_state()?.lifecycle.purge_finished())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;
    use crate::host::RecordingHostSink;

    /// Panics on delivery of events for one utterance id.
    struct PanickingSink {
        inner: RecordingHostSink,
        trigger: &'static str,
    }

    impl HostSink for PanickingSink {
        fn deliver(&self, event: HostEvent) {
            if event.utterance_id() == Some(self.trigger) {
                panic!("host sink failed on {}", self.trigger);
            }
            self.inner.deliver(event);
        }
    }

    fn initialized(backend_id: u32, sink: &RecordingHostSink) -> Bridge {
        let bridge = Bridge::new(backend_id);
        bridge.on_init(InitStatus::Success, sink).unwrap();
        bridge
    }

    #[test]
    fn test_init_status_from_android() {
        assert_eq!(InitStatus::from_android(0), InitStatus::Success);
        assert_eq!(InitStatus::from_android(-1), InitStatus::Failure);
        assert!(!InitStatus::from_android(3).is_success());
    }

    #[test]
    fn test_init_is_one_shot() {
        let sink = RecordingHostSink::new();
        let bridge = Bridge::new(5);
        assert_eq!(bridge.init_status().unwrap(), None);

        bridge.on_init(InitStatus::Failure, &sink).unwrap();
        assert_eq!(
            bridge.on_init(InitStatus::Success, &sink),
            Err(BridgeError::DuplicateInit { backend_id: 5 })
        );

        // The first status sticks and only one event reached the host
        assert_eq!(bridge.init_status().unwrap(), Some(InitStatus::Failure));
        assert_eq!(sink.events(), vec![HostEvent::init(5, InitStatus::Failure)]);
    }

    #[test]
    fn test_utterance_before_init_is_rejected() {
        let sink = RecordingHostSink::new();
        let bridge = Bridge::new(2);

        assert_eq!(
            bridge.on_start("u1", &sink),
            Err(BridgeError::NotInitialized {
                backend_id: 2,
                signal: Signal::Start
            })
        );
        assert!(sink.is_empty());
        assert_eq!(bridge.utterance_state("u1").unwrap(), None);
    }

    #[test]
    fn test_rejected_transition_forwards_nothing() {
        let sink = RecordingHostSink::new();
        let bridge = initialized(7, &sink);
        sink.take();

        let err = bridge.on_stop("u2", true, &sink).unwrap_err();
        assert_eq!(
            err,
            BridgeError::InvalidTransition {
                backend_id: 7,
                utterance_id: "u2".to_string(),
                signal: Signal::Stop,
                found: None,
            }
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn test_full_utterance_forwards_in_order() {
        let sink = RecordingHostSink::new();
        let bridge = initialized(7, &sink);

        bridge.on_start("u1", &sink).unwrap();
        assert_eq!(bridge.in_flight().unwrap(), 1);
        bridge.on_error("u1", &sink).unwrap();

        assert_eq!(
            sink.events(),
            vec![
                HostEvent::init(7, InitStatus::Success),
                HostEvent::start(7, "u1"),
                HostEvent::error(7, "u1"),
            ]
        );
        assert_eq!(
            bridge.utterance_state("u1").unwrap(),
            Some(UtteranceState::Errored)
        );
    }

    #[test]
    fn test_purge_on_terminal_config() {
        let sink = RecordingHostSink::new();
        let bridge = Bridge::with_config(
            1,
            &LifecycleConfig {
                purge_on_terminal: true,
            },
        );
        bridge.on_init(InitStatus::Success, &sink).unwrap();

        bridge.on_start("u1", &sink).unwrap();
        bridge.on_done("u1", &sink).unwrap();
        assert_eq!(bridge.utterance_state("u1").unwrap(), None);

        // A second terminal is still a violation, a fresh start is allowed
        assert!(bridge.on_done("u1", &sink).is_err());
        bridge.on_start("u1", &sink).unwrap();
    }

    #[test]
    fn test_purge_finished_keeps_running_utterances() {
        let sink = RecordingHostSink::new();
        let bridge = initialized(1, &sink);
        bridge.on_start("a", &sink).unwrap();
        bridge.on_start("b", &sink).unwrap();
        bridge.on_stop("a", false, &sink).unwrap();

        assert_eq!(bridge.purge_finished().unwrap(), 1);
        assert_eq!(bridge.in_flight().unwrap(), 1);
        bridge.on_start("a", &sink).unwrap();
    }

    #[test]
    fn test_panicking_sink_poisons_once_then_recovers() {
        let sink = PanickingSink {
            inner: RecordingHostSink::new(),
            trigger: "boom",
        };
        let bridge = Bridge::new(6);
        bridge.on_init(InitStatus::Success, &sink).unwrap();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| bridge.on_start("boom", &sink)));
        assert!(outcome.is_err());

        assert_eq!(
            bridge.on_start("calm", &sink),
            Err(BridgeError::LockPoisoned {
                component: "bridge 6".to_string()
            })
        );

        // The transition accepted before the panic is kept
        assert_eq!(
            bridge.utterance_state("boom").unwrap(),
            Some(UtteranceState::Started)
        );
        bridge.on_start("calm", &sink).unwrap();
        bridge.on_done("calm", &sink).unwrap();
        assert_eq!(
            sink.inner.events(),
            vec![
                HostEvent::init(6, InitStatus::Success),
                HostEvent::start(6, "calm"),
                HostEvent::done(6, "calm"),
            ]
        );
    }

    #[test]
    fn test_many_finished_utterances_are_reclaimable() {
        const CYCLES: usize = 10_000;

        let sink = RecordingHostSink::new();
        let bridge = initialized(8, &sink);
        for n in 0..CYCLES {
            let id = format!("u{n}");
            bridge.on_start(&id, &sink).unwrap();
            bridge.on_done(&id, &sink).unwrap();
        }
        assert!(bridge.on_start("u0", &sink).is_err());

        assert_eq!(bridge.purge_finished().unwrap(), CYCLES);
        assert_eq!(bridge.utterance_state("u9999").unwrap(), None);
        bridge.on_start("u0", &sink).unwrap();
    }

    #[test]
    fn test_purge_on_terminal_keeps_lifecycle_bounded() {
        let sink = RecordingHostSink::new();
        let bridge = Bridge::with_config(
            8,
            &LifecycleConfig {
                purge_on_terminal: true,
            },
        );
        bridge.on_init(InitStatus::Success, &sink).unwrap();

        for _ in 0..10_000 {
            bridge.on_start("reused", &sink).unwrap();
            bridge.on_done("reused", &sink).unwrap();
        }
        assert_eq!(bridge.purge_finished().unwrap(), 0);
        assert_eq!(bridge.in_flight().unwrap(), 0);
    }
}
