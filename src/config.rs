//! Configuration management for the TTS event bridge
//!
//! Runtime configuration is loaded from a JSON file so channel sizes and
//! lifecycle retention can be tuned per embedding without recompiling.
//! Missing sections fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Host event channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Broadcast buffer for host events; slow subscribers lag past this
    pub channel_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Utterance lifecycle retention
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Drop finished utterances right after forwarding their terminal event.
    /// When false, finished entries stay until `purge_finished` is called and
    /// a repeated start for the same id is rejected.
    pub purge_on_terminal: bool,
}

/// Telemetry collector sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Broadcast buffer for live metric subscribers
    pub channel_capacity: usize,
    /// Number of recent metric events kept for snapshots
    pub history_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            history_capacity: 64,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// its JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Configuration on Android
    ///
    /// The library is loaded by the TTS host app without a readable asset
    /// path, so defaults are used.
    #[cfg(target_os = "android")]
    pub fn load() -> Self {
        log::info!("[Config] Using default configuration on Android");
        Self::default()
    }

    /// Load configuration for non-Android platforms
    #[cfg(not(target_os = "android"))]
    pub fn load() -> Self {
        Self::load_from_file("assets/tts_bridge.json")
    }
}
