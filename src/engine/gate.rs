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

//! Gate / policy evaluation
//!
//! Decides, per event, whether the classifier sees the event at all. The
//! rules are a conjunction:
//! 1. The event came from the platform, not from a replay
//! 2. No kiosk / locked-task mode is active
//!
//! Lock-screen gates are narrower: they apply to one `(channel, trigger)`
//! slot and are checked by the classifier when a press cycle starts, so a
//! gated long press does not take the channel's double tap down with it.
//!
//! Host state lives in `HostConditions`, which the platform adapter may
//! update from any thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::types::{Channel, RawKeyEvent, TriggerKind};

#[derive(Debug, Default)]
struct HostFlags {
    substitute_input_active: AtomicBool,
    kiosk_mode: AtomicBool,
    secure_lock_showing: AtomicBool,
}

/// Externally supplied predicates the gate consults.
///
/// Cloning shares the underlying flags.
#[derive(Clone, Debug, Default)]
pub struct HostConditions {
    flags: Arc<HostFlags>,
}

impl HostConditions {
    /// All conditions false: no on-screen navigation, no kiosk mode, unlocked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an on-screen substitute for the physical keys is showing.
    pub fn substitute_input_active(&self) -> bool {
        self.flags.substitute_input_active.load(Ordering::Relaxed)
    }

    /// Updates the substitute input flag.
    pub fn set_substitute_input_active(&self, active: bool) {
        self.flags.substitute_input_active.store(active, Ordering::Relaxed);
    }

    /// Whether kiosk / locked-task mode is active.
    pub fn kiosk_mode(&self) -> bool {
        self.flags.kiosk_mode.load(Ordering::Relaxed)
    }

    /// Updates the kiosk mode flag.
    pub fn set_kiosk_mode(&self, active: bool) {
        self.flags.kiosk_mode.store(active, Ordering::Relaxed);
    }

    /// Whether a secure lock screen is showing.
    pub fn secure_lock_showing(&self) -> bool {
        self.flags.secure_lock_showing.load(Ordering::Relaxed)
    }

    /// Updates the lock screen flag.
    pub fn set_secure_lock_showing(&self, showing: bool) {
        self.flags.secure_lock_showing.store(showing, Ordering::Relaxed);
    }
}

/// Why an event skipped the classifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BypassReason {
    /// Event was synthesised (a replay must never re-enter the classifier)
    Synthetic,
    /// Kiosk / locked-task mode is active
    KioskMode,
}

impl fmt::Display for BypassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BypassReason::Synthetic => write!(f, "synthetic event"),
            BypassReason::KioskMode => write!(f, "kiosk mode"),
        }
    }
}

/// Result of gate evaluation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateDecision {
    /// Hand the event to the classifier
    Intercept,
    /// Pass the event through untouched
    Bypass(BypassReason),
}

impl GateDecision {
    /// True for `Intercept`.
    pub fn should_intercept(self) -> bool {
        self == GateDecision::Intercept
    }
}

/// Evaluates the event-level gate rules.
pub fn evaluate(event: &RawKeyEvent, host: &HostConditions) -> GateDecision {
    if !event.from_system {
        return GateDecision::Bypass(BypassReason::Synthetic);
    }

    if host.kiosk_mode() {
        return GateDecision::Bypass(BypassReason::KioskMode);
    }

    GateDecision::Intercept
}

/// Whether the lock-screen gate of one `(channel, trigger)` slot is open.
pub fn trigger_allowed(
    config: &EngineConfig,
    host: &HostConditions,
    channel: Channel,
    kind: TriggerKind,
) -> bool {
    config
        .gate_for(channel, kind)
        .allows(host.secure_lock_showing())
}

/// Whether physical keys are effectively disabled.
///
/// The user toggle only takes effect while a substitute input surface is
/// showing; without one the engine keeps owning the keys so the device is
/// never left without navigation.
pub fn keys_disabled(config: &EngineConfig, host: &HostConditions) -> bool {
    !config.global_keys_enabled && host.substitute_input_active()
}
