// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine configuration and live reconfiguration.
//!
//! This module owns everything the engine is told from outside:
//!
//! - **`EngineConfig`**: timing settings, the keys-enabled toggle and gates
//! - **`ConfigMessage`**: one binding or one setting, applied as a unit
//! - **`ConfigSnapshot`**: a full configuration, with diffing into messages
//! - **`ConfigManager`**: reads snapshots from disk
//! - **`ConfigWatcher`**: turns file modifications into messages
//!
//! # Example
//!
//! ```no_run
//! use key_gesture_engine::config::ConfigManager;
//!
//! let manager = ConfigManager::new("/etc/key-gestures.conf".into())?;
//! let loaded = manager.load()?;
//! println!("{} bindings", loaded.snapshot.bindings.bound().count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod watcher;

pub use error::ConfigError;
pub use watcher::ConfigWatcher;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::warn;

use crate::core::parser::{parse_config_file, ConfigEntry, ParseError};
use crate::core::settings::{Setting, TriggerGate};
use crate::core::types::{
    ActionBinding, ActionId, Channel, TriggerKind, CHANNEL_COUNT, TRIGGER_COUNT,
};
use crate::engine::registry::{ActionRegistry, RegistryError};

/// Default double-tap window.
pub const DEFAULT_DOUBLE_TAP_WINDOW_MS: u32 = 300;

/// Default long-press timeout.
pub const DEFAULT_LONG_PRESS_TIMEOUT_MS: u32 = 500;

/// Timing and policy settings read by the engine.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EngineConfig {
    /// Window in which a second press counts as a double tap
    pub double_tap_window_ms: u32,

    /// Hold time before a long press fires
    pub default_long_press_timeout_ms: u32,

    /// Hold time overrides for actions that deserve a deliberate hold
    /// (e.g. force-stopping the foreground app)
    pub per_action_long_press_timeout_ms: HashMap<ActionId, u32>,

    /// User toggle for the physical keys
    pub global_keys_enabled: bool,

    /// Per-trigger interception gates, indexed by `Channel::index()` then
    /// `TriggerKind::index()`
    pub trigger_gates: [[TriggerGate; TRIGGER_COUNT]; CHANNEL_COUNT],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            double_tap_window_ms: DEFAULT_DOUBLE_TAP_WINDOW_MS,
            default_long_press_timeout_ms: DEFAULT_LONG_PRESS_TIMEOUT_MS,
            per_action_long_press_timeout_ms: HashMap::new(),
            global_keys_enabled: true,
            trigger_gates: [[TriggerGate::Always; TRIGGER_COUNT]; CHANNEL_COUNT],
        }
    }
}

impl EngineConfig {
    /// Long-press timeout for an action: its override, else the default.
    pub fn timeout_for(&self, action: ActionId) -> u32 {
        self.per_action_long_press_timeout_ms
            .get(&action)
            .copied()
            .unwrap_or(self.default_long_press_timeout_ms)
    }

    /// Gate configured for one `(channel, trigger)` slot.
    pub fn gate_for(&self, channel: Channel, kind: TriggerKind) -> TriggerGate {
        self.trigger_gates
            .get(channel.index())
            .and_then(|gates| gates.get(kind.index()))
            .copied()
            .unwrap_or_default()
    }

    /// Replaces the one field a setting addresses.
    pub fn apply(&mut self, setting: &Setting) {
        match setting {
            Setting::DoubleTapWindowMs(ms) => self.double_tap_window_ms = *ms,
            Setting::DefaultLongPressTimeoutMs(ms) => self.default_long_press_timeout_ms = *ms,
            Setting::ActionLongPressTimeoutMs { action, timeout_ms: Some(ms) } => {
                self.per_action_long_press_timeout_ms.insert(*action, *ms);
            }
            Setting::ActionLongPressTimeoutMs { action, timeout_ms: None } => {
                self.per_action_long_press_timeout_ms.remove(action);
            }
            Setting::GlobalKeysEnabled(enabled) => self.global_keys_enabled = *enabled,
            Setting::TriggerGate { channel, kind, gate } => {
                if let Some(slot) = self
                    .trigger_gates
                    .get_mut(channel.index())
                    .and_then(|gates| gates.get_mut(kind.index()))
                {
                    *slot = *gate;
                }
            }
        }
    }

    /// Settings that turn `self` into `newer`, one per differing field.
    pub fn diff(&self, newer: &EngineConfig) -> Vec<Setting> {
        let mut settings = Vec::new();

        if self.double_tap_window_ms != newer.double_tap_window_ms {
            settings.push(Setting::DoubleTapWindowMs(newer.double_tap_window_ms));
        }
        if self.default_long_press_timeout_ms != newer.default_long_press_timeout_ms {
            settings.push(Setting::DefaultLongPressTimeoutMs(newer.default_long_press_timeout_ms));
        }

        let actions: BTreeSet<ActionId> = self
            .per_action_long_press_timeout_ms
            .keys()
            .chain(newer.per_action_long_press_timeout_ms.keys())
            .copied()
            .collect();
        for action in actions {
            let old = self.per_action_long_press_timeout_ms.get(&action);
            let new = newer.per_action_long_press_timeout_ms.get(&action);
            if old != new {
                settings.push(Setting::ActionLongPressTimeoutMs {
                    action,
                    timeout_ms: new.copied(),
                });
            }
        }

        if self.global_keys_enabled != newer.global_keys_enabled {
            settings.push(Setting::GlobalKeysEnabled(newer.global_keys_enabled));
        }

        for channel in Channel::ALL {
            for kind in TriggerKind::ALL {
                let gate = newer.gate_for(channel, kind);
                if self.gate_for(channel, kind) != gate {
                    settings.push(Setting::TriggerGate { channel, kind, gate });
                }
            }
        }

        settings
    }
}

/// One configuration change, applied as soon as it is received.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ConfigMessage {
    /// A `(channel, trigger)` slot got a new binding
    BindingChanged {
        channel: Channel,
        kind: TriggerKind,
        binding: ActionBinding,
    },
    /// One `EngineConfig` field changed
    SettingChanged(Setting),
}

impl fmt::Display for ConfigMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigMessage::BindingChanged { channel, kind, binding } => {
                write!(f, "bind = {}, {}, {}", channel, kind, binding)
            }
            ConfigMessage::SettingChanged(setting) => write!(f, "{}", setting),
        }
    }
}

impl From<Setting> for ConfigMessage {
    fn from(setting: Setting) -> Self {
        ConfigMessage::SettingChanged(setting)
    }
}

/// Sending side of the engine's configuration queue.
///
/// Cloneable and `Send`: settings storage can push changes from any thread.
/// The engine drains the queue at the start of each entry point.
#[derive(Clone, Debug)]
pub struct ConfigHandle {
    tx: Sender<ConfigMessage>,
}

impl ConfigHandle {
    pub(crate) fn new(tx: Sender<ConfigMessage>) -> Self {
        Self { tx }
    }

    /// Queues a message for the engine.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EngineGone` if the engine has been dropped.
    pub fn send(&self, message: ConfigMessage) -> Result<(), ConfigError> {
        self.tx.send(message).map_err(|_| ConfigError::EngineGone)
    }
}

/// A complete configuration: settings plus bindings.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConfigSnapshot {
    /// Timing and policy settings
    pub config: EngineConfig,
    /// Binding table
    pub bindings: ActionRegistry,
}

impl ConfigSnapshot {
    /// Builds a snapshot from parsed config lines.
    ///
    /// Later lines win. Bindings that fail validation are stored as the
    /// default and reported in the second element.
    pub fn from_entries(entries: Vec<ConfigEntry>) -> (Self, Vec<RegistryError>) {
        let mut snapshot = Self::default();
        let mut rejected = Vec::new();

        for entry in entries {
            let message = match entry {
                ConfigEntry::Bind { channel, kind, binding } => ConfigMessage::BindingChanged {
                    channel,
                    kind,
                    binding,
                },
                ConfigEntry::Setting(setting) => ConfigMessage::SettingChanged(setting),
            };

            if let Err(e) = snapshot.apply(message) {
                rejected.push(e);
            }
        }

        (snapshot, rejected)
    }

    /// Parses snapshot text.
    pub fn parse(content: &str) -> Result<(Self, Vec<RegistryError>), ParseError> {
        Ok(Self::from_entries(parse_config_file(content)?))
    }

    /// Applies one message.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if a binding was rejected and stored as the
    /// default instead.
    pub fn apply(&mut self, message: ConfigMessage) -> Result<(), RegistryError> {
        match message {
            ConfigMessage::BindingChanged { channel, kind, binding } => {
                self.bindings.set_binding(channel, kind, binding)
            }
            ConfigMessage::SettingChanged(setting) => {
                self.config.apply(&setting);
                Ok(())
            }
        }
    }

    /// Messages that turn `self` into `newer`.
    pub fn diff(&self, newer: &ConfigSnapshot) -> Vec<ConfigMessage> {
        let mut messages: Vec<ConfigMessage> = self
            .config
            .diff(&newer.config)
            .into_iter()
            .map(ConfigMessage::from)
            .collect();

        for (channel, kind, binding) in newer.bindings.iter() {
            if self.bindings.binding(channel, kind) != binding {
                messages.push(ConfigMessage::BindingChanged {
                    channel,
                    kind,
                    binding: binding.clone(),
                });
            }
        }

        messages
    }
}

/// A snapshot read from disk plus the bindings that were rejected.
#[derive(Debug)]
pub struct LoadedConfig {
    /// The usable configuration
    pub snapshot: ConfigSnapshot,
    /// Bindings that fell back to the default
    pub rejected: Vec<RegistryError>,
}

/// Reads configuration snapshots from a file.
#[derive(Clone, Debug)]
pub struct ConfigManager {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager for the given config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the config file doesn't exist.
    pub fn new(config_path: PathBuf) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path));
        }

        Ok(Self { config_path })
    }

    /// Path of the managed file.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Reads the current configuration file content.
    pub fn read_config(&self) -> Result<String, ConfigError> {
        Ok(fs::read_to_string(&self.config_path)?)
    }

    /// Reads and parses the configuration file.
    ///
    /// Rejected bindings are logged and returned alongside the snapshot;
    /// only I/O and syntax errors fail the load.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let content = self.read_config()?;

        let (snapshot, rejected) = ConfigSnapshot::parse(&content).map_err(|source| {
            ConfigError::Parse {
                path: self.config_path.clone(),
                source,
            }
        })?;

        for e in &rejected {
            warn!(path = %self.config_path.display(), "{}", e);
        }

        Ok(LoadedConfig { snapshot, rejected })
    }
}

#[cfg(test)]
mod tests;
