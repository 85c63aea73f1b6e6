//! Shared application configuration updated on connect/disconnect.
//!
//! The lifecycle controller is the only writer; the core never reads the
//! config back. UI layers watch this document to learn the channel status.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::Storage;

/// Fixed storage key for the channel configuration document.
const CHANNEL_CONFIG_KEY: &str = "channel-config";

/// Partial update pushed by connect/disconnect transitions. `None` fields
/// are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub is_connected: Option<bool>,
    pub authorized_number: Option<String>,
    pub qr_code: Option<String>,
}

/// The materialized configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub authorized_number: String,
    #[serde(default)]
    pub qr_code: String,
}

impl ChannelConfig {
    fn merge(&mut self, update: ConfigUpdate) {
        if let Some(is_connected) = update.is_connected {
            self.is_connected = is_connected;
        }
        if let Some(authorized_number) = update.authorized_number {
            self.authorized_number = authorized_number;
        }
        if let Some(qr_code) = update.qr_code {
            self.qr_code = qr_code;
        }
    }
}

/// Receives partial config updates from the lifecycle controller.
pub trait ConfigSink: Send + Sync {
    fn apply(&self, update: ConfigUpdate);
}

/// Persists the merged [`ChannelConfig`] under its own fixed storage key.
///
/// Loads with defaults when the stored document is missing or malformed;
/// config is advisory state, never a reason to fail a transition.
pub struct StorageConfigSink {
    storage: Arc<dyn Storage>,
}

impl StorageConfigSink {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        StorageConfigSink { storage }
    }

    fn load(&self) -> ChannelConfig {
        self.storage
            .get(CHANNEL_CONFIG_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

impl ConfigSink for StorageConfigSink {
    fn apply(&self, update: ConfigUpdate) {
        let mut config = self.load();
        config.merge(update);

        let payload = match serde_json::to_string_pretty(&config) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "Failed to serialize channel config");
                return;
            }
        };
        if let Err(err) = self.storage.set(CHANNEL_CONFIG_KEY, &payload) {
            warn!(error = %err, "Failed to write channel config");
        }
    }
}

/// Records every applied update. Test double.
#[derive(Default)]
pub struct RecordingConfigSink {
    updates: Mutex<Vec<ConfigUpdate>>,
}

impl RecordingConfigSink {
    pub fn new() -> Self {
        RecordingConfigSink::default()
    }

    pub fn updates(&self) -> Vec<ConfigUpdate> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<ConfigUpdate> {
        self.updates().pop()
    }
}

impl ConfigSink for RecordingConfigSink {
    fn apply(&self, update: ConfigUpdate) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(update);
    }
}
