//! Android JNI exports for the `rs.tts.Bridge` listener class.
//!
//! The Kotlin side extends `UtteranceProgressListener` and implements
//! `TextToSpeech.OnInitListener`; each override forwards to one of the
//! `external` methods below. The backend id is read from the object's
//! `backendId` field, so one native entry point serves every backend:
//!
//! ```text
//! external fun nativeRegister()
//! external fun nativeDeregister()
//! external fun nativePurgeFinished(): Int
//! external fun nativeOnInit(status: Int)
//! external fun nativeOnStart(utteranceId: String)
//! external fun nativeOnStop(utteranceId: String, interrupted: Boolean)
//! external fun nativeOnDone(utteranceId: String)
//! external fun nativeOnError(utteranceId: String)
//! ```
//!
//! Finished utterances are kept until `nativePurgeFinished` is called, so a
//! host that reuses utterance ids should purge after each terminal callback.
//!
//! Rejected signals are raised as `java.lang.IllegalStateException` on the
//! calling engine thread. Java strings are copied into owned Rust strings
//! before dispatch; nothing borrowed from the JVM outlives the call.

use std::fmt;

use jni::objects::{JObject, JString};
use jni::sys::{jboolean, jint, JNI_FALSE};
use jni::JNIEnv;

use crate::api::runtime;
use crate::bridge::InitStatus;
use crate::error::BridgeError;

const BACKEND_ID_FIELD: &str = "backendId";
const EXCEPTION_CLASS: &str = "java/lang/IllegalStateException";

enum CallbackFailure {
    Jni(jni::errors::Error),
    NegativeBackendId(jint),
    Bridge(BridgeError),
}

impl From<jni::errors::Error> for CallbackFailure {
    fn from(err: jni::errors::Error) -> Self {
        CallbackFailure::Jni(err)
    }
}

impl From<BridgeError> for CallbackFailure {
    fn from(err: BridgeError) -> Self {
        CallbackFailure::Bridge(err)
    }
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackFailure::Jni(err) => write!(f, "JNI failure: {}", err),
            CallbackFailure::NegativeBackendId(id) => {
                write!(f, "backendId must be non-negative (got {})", id)
            }
            CallbackFailure::Bridge(err) => write!(f, "{}", err),
        }
    }
}

fn read_backend_id(env: &mut JNIEnv, this: &JObject) -> Result<u32, CallbackFailure> {
    let raw = env.get_field(this, BACKEND_ID_FIELD, "I")?.i()?;
    u32::try_from(raw).map_err(|_| CallbackFailure::NegativeBackendId(raw))
}

fn copy_string(env: &mut JNIEnv, value: &JString) -> Result<String, CallbackFailure> {
    Ok(env.get_string(value)?.into())
}

/// Resolve the backend id, run `callback`, and turn failures into a Java
/// exception.
fn guarded<F>(mut env: JNIEnv, this: JObject, context: &str, callback: F)
where
    F: FnOnce(&mut JNIEnv, u32) -> Result<(), CallbackFailure>,
{
    let result = read_backend_id(&mut env, &this).and_then(|backend_id| callback(&mut env, backend_id));
    let Err(failure) = result else {
        return;
    };

    // Bridge violations were already logged by the dispatcher
    if !matches!(failure, CallbackFailure::Bridge(_)) {
        log::error!("[JNI] {} failed: {}", context, failure);
    }

    // A failed JNI call may already have a Java exception pending
    if env.exception_check().unwrap_or(false) {
        return;
    }
    if let Err(err) = env.throw_new(EXCEPTION_CLASS, failure.to_string()) {
        log::error!("[JNI] Could not raise exception from {}: {}", context, err);
    }
}

#[no_mangle]
pub extern "system" fn Java_rs_tts_Bridge_nativeRegister<'local>(
    env: JNIEnv<'local>,
    this: JObject<'local>,
) {
    guarded(env, this, "nativeRegister", |_, backend_id| {
        runtime().dispatcher.register_backend(backend_id)?;
        Ok(())
    });
}

#[no_mangle]
pub extern "system" fn Java_rs_tts_Bridge_nativeDeregister<'local>(
    env: JNIEnv<'local>,
    this: JObject<'local>,
) {
    guarded(env, this, "nativeDeregister", |_, backend_id| {
        runtime().dispatcher.deregister_backend(backend_id)?;
        Ok(())
    });
}

/// Returns the number of finished utterances removed, or -1 after raising.
#[no_mangle]
pub extern "system" fn Java_rs_tts_Bridge_nativePurgeFinished<'local>(
    env: JNIEnv<'local>,
    this: JObject<'local>,
) -> jint {
    let mut purged: jint = -1;
    guarded(env, this, "nativePurgeFinished", |_, backend_id| {
        let removed = runtime().dispatcher.purge_finished(backend_id)?;
        purged = jint::try_from(removed).unwrap_or(jint::MAX);
        Ok(())
    });
    purged
}

#[no_mangle]
pub extern "system" fn Java_rs_tts_Bridge_nativeOnInit<'local>(
    env: JNIEnv<'local>,
    this: JObject<'local>,
    status: jint,
) {
    guarded(env, this, "nativeOnInit", |_, backend_id| {
        runtime()
            .dispatcher
            .notify_init(backend_id, InitStatus::from_android(status))?;
        Ok(())
    });
}

#[no_mangle]
pub extern "system" fn Java_rs_tts_Bridge_nativeOnStart<'local>(
    env: JNIEnv<'local>,
    this: JObject<'local>,
    utterance_id: JString<'local>,
) {
    guarded(env, this, "nativeOnStart", |env, backend_id| {
        let utterance_id = copy_string(env, &utterance_id)?;
        runtime().dispatcher.notify_start(backend_id, &utterance_id)?;
        Ok(())
    });
}

#[no_mangle]
pub extern "system" fn Java_rs_tts_Bridge_nativeOnStop<'local>(
    env: JNIEnv<'local>,
    this: JObject<'local>,
    utterance_id: JString<'local>,
    interrupted: jboolean,
) {
    guarded(env, this, "nativeOnStop", |env, backend_id| {
        let utterance_id = copy_string(env, &utterance_id)?;
        runtime()
            .dispatcher
            .notify_stop(backend_id, &utterance_id, interrupted != JNI_FALSE)?;
        Ok(())
    });
}

#[no_mangle]
pub extern "system" fn Java_rs_tts_Bridge_nativeOnDone<'local>(
    env: JNIEnv<'local>,
    this: JObject<'local>,
    utterance_id: JString<'local>,
) {
    guarded(env, this, "nativeOnDone", |env, backend_id| {
        let utterance_id = copy_string(env, &utterance_id)?;
        runtime().dispatcher.notify_done(backend_id, &utterance_id)?;
        Ok(())
    });
}

#[no_mangle]
pub extern "system" fn Java_rs_tts_Bridge_nativeOnError<'local>(
    env: JNIEnv<'local>,
    this: JObject<'local>,
    utterance_id: JString<'local>,
) {
    guarded(env, this, "nativeOnError", |env, backend_id| {
        let utterance_id = copy_string(env, &utterance_id)?;
        runtime().dispatcher.notify_error(backend_id, &utterance_id)?;
        Ok(())
    });
}

/// JNI_OnLoad is called when the native library is loaded by Android
///
/// Installs Android logging before the first callback can arrive.
#[no_mangle]
pub extern "system" fn JNI_OnLoad(_vm: jni::JavaVM, _reserved: *mut std::ffi::c_void) -> jint {
    crate::init_logging(tracing::Level::DEBUG);
    log::info!("[JNI] JNI_OnLoad called - TTS bridge library loaded");
    jni::sys::JNI_VERSION_1_6
}
