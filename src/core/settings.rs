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

//! Individually addressable engine settings
//!
//! Settings storage talks to the engine one field at a time. `Setting` is
//! that unit: every variant replaces exactly one field of `EngineConfig`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::types::{ActionId, Channel, TriggerKind, UnknownName};

/// Extra condition a trigger must satisfy before the engine claims it.
///
/// A gated-out trigger is left with its platform behaviour; the channel's
/// other triggers are unaffected.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum TriggerGate {
    /// No extra condition
    #[default]
    Always,
    /// Only while a secure lock screen is showing
    SecureLockOnly,
    /// Only while no secure lock screen is showing
    UnlockedOnly,
}

impl TriggerGate {
    /// Whether the gate is open given the lock-screen state.
    pub fn allows(self, secure_lock_showing: bool) -> bool {
        match self {
            TriggerGate::Always => true,
            TriggerGate::SecureLockOnly => secure_lock_showing,
            TriggerGate::UnlockedOnly => !secure_lock_showing,
        }
    }
}

impl fmt::Display for TriggerGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerGate::Always => write!(f, "always"),
            TriggerGate::SecureLockOnly => write!(f, "secure_lock"),
            TriggerGate::UnlockedOnly => write!(f, "unlocked"),
        }
    }
}

impl FromStr for TriggerGate {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(TriggerGate::Always),
            "secure_lock" => Ok(TriggerGate::SecureLockOnly),
            "unlocked" => Ok(TriggerGate::UnlockedOnly),
            _ => Err(UnknownName {
                kind: "gate",
                name: s.to_string(),
            }),
        }
    }
}

/// One engine setting with its new value.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Setting {
    /// Window in which a second press counts as a double tap
    DoubleTapWindowMs(u32),
    /// Hold time before a long press fires
    DefaultLongPressTimeoutMs(u32),
    /// Per-action hold time; `None` removes the override
    ActionLongPressTimeoutMs {
        /// Action the override applies to
        action: ActionId,
        /// New timeout, or `None` to fall back to the default
        timeout_ms: Option<u32>,
    },
    /// User toggle for physical keys
    GlobalKeysEnabled(bool),
    /// Interception gate for one `(channel, trigger)` slot
    TriggerGate {
        channel: Channel,
        kind: TriggerKind,
        /// New gate
        gate: TriggerGate,
    },
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::DoubleTapWindowMs(ms) => write!(f, "double_tap_window = {}", ms),
            Setting::DefaultLongPressTimeoutMs(ms) => write!(f, "long_press_timeout = {}", ms),
            Setting::ActionLongPressTimeoutMs { action, timeout_ms: Some(ms) } => {
                write!(f, "long_press_timeout[{}] = {}", action, ms)
            }
            Setting::ActionLongPressTimeoutMs { action, timeout_ms: None } => {
                write!(f, "long_press_timeout[{}] = default", action)
            }
            Setting::GlobalKeysEnabled(enabled) => write!(f, "keys_enabled = {}", enabled),
            Setting::TriggerGate { channel, kind, gate } => {
                write!(f, "gate {} {} = {}", channel, kind, gate)
            }
        }
    }
}
