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

//! src/core/types.rs
//!
//! Core type definitions for gesture classification
//!
//! This module defines the fundamental types used throughout the engine:
//! - `Channel`: One logical button (MENU, HOME, BACK, RECENTS, CUSTOM)
//! - `TriggerKind`: A resolved gesture (single tap, long press, double tap)
//! - `ActionId` / `ActionBinding`: What a gesture is bound to
//! - `RawKeyEvent` / `Outcome`: The normalised input feed and the per-event answer
//!
//! All value types implement serialization so that adapters can ship them
//! across process boundaries unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of channels tracked by the engine.
pub const CHANNEL_COUNT: usize = 5;

/// Number of trigger kinds a channel can bind.
pub const TRIGGER_COUNT: usize = 3;

/// Error returned when a channel, trigger or action name is not recognised.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("Unknown {kind} '{name}'")]
pub struct UnknownName {
    /// What was being parsed ("channel", "trigger", ...)
    pub kind: &'static str,
    /// The offending input
    pub name: String,
}

/// One logical button tracked independently by the engine.
///
/// The set is fixed and enumerable. Adding a channel means adding a variant
/// here and an entry in `Channel::ALL`; the classifier is table driven and
/// needs no change.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Channel {
    /// Menu key
    Menu,
    /// Home key
    Home,
    /// Back key
    Back,
    /// Recent apps / app switch key
    Recents,
    /// Vendor specific extra key
    Custom,
}

impl Channel {
    /// Every channel, in table order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Menu,
        Channel::Home,
        Channel::Back,
        Channel::Recents,
        Channel::Custom,
    ];

    /// Position of this channel in per-channel tables.
    pub const fn index(self) -> usize {
        match self {
            Channel::Menu => 0,
            Channel::Home => 1,
            Channel::Back => 2,
            Channel::Recents => 3,
            Channel::Custom => 4,
        }
    }

    /// Whether this channel can bind the given trigger kind.
    ///
    /// HOME keeps its platform single-tap behaviour; it only offers
    /// long-press and double-tap overrides.
    pub const fn supports(self, kind: TriggerKind) -> bool {
        !matches!((self, kind), (Channel::Home, TriggerKind::SingleTap))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Menu => write!(f, "MENU"),
            Channel::Home => write!(f, "HOME"),
            Channel::Back => write!(f, "BACK"),
            Channel::Recents => write!(f, "RECENTS"),
            Channel::Custom => write!(f, "CUSTOM"),
        }
    }
}

impl FromStr for Channel {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MENU" => Ok(Channel::Menu),
            "HOME" => Ok(Channel::Home),
            "BACK" => Ok(Channel::Back),
            "RECENTS" | "APP_SWITCH" => Ok(Channel::Recents),
            "CUSTOM" => Ok(Channel::Custom),
            _ => Err(UnknownName {
                kind: "channel",
                name: s.to_string(),
            }),
        }
    }
}

/// A resolved gesture classification.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum TriggerKind {
    /// Press and release with no companion tap
    SingleTap,
    /// Held past the long-press timeout
    LongPress,
    /// Second press within the double-tap window
    DoubleTap,
}

impl TriggerKind {
    /// Every trigger kind, in table order.
    pub const ALL: [TriggerKind; TRIGGER_COUNT] = [
        TriggerKind::SingleTap,
        TriggerKind::LongPress,
        TriggerKind::DoubleTap,
    ];

    /// Position of this kind in per-trigger tables.
    pub const fn index(self) -> usize {
        match self {
            TriggerKind::SingleTap => 0,
            TriggerKind::LongPress => 1,
            TriggerKind::DoubleTap => 2,
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::SingleTap => write!(f, "single_tap"),
            TriggerKind::LongPress => write!(f, "long_press"),
            TriggerKind::DoubleTap => write!(f, "double_tap"),
        }
    }
}

impl FromStr for TriggerKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single_tap" | "tap" => Ok(TriggerKind::SingleTap),
            "long_press" | "hold" => Ok(TriggerKind::LongPress),
            "double_tap" => Ok(TriggerKind::DoubleTap),
            _ => Err(UnknownName {
                kind: "trigger",
                name: s.to_string(),
            }),
        }
    }
}

/// Identifier of a bindable action.
///
/// `Default` is the sentinel for "no override": the original key event is
/// passed through to the platform untouched.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum ActionId {
    /// No override
    #[default]
    Default,
    /// Open search
    Search,
    /// Open voice search
    VoiceSearch,
    /// Switch to the previously used app
    PreviousApp,
    /// Force-stop the foreground app
    KillForeground,
    /// Put the device to sleep
    Sleep,
    /// Show recent apps
    RecentApps,
    /// Launch the app named by the binding payload
    LaunchApp,
    /// Inject a MENU key
    Menu,
    /// Inject a BACK key
    Back,
    /// Inject a HOME key
    Home,
    /// Take a screenshot
    Screenshot,
    /// Show the power menu
    PowerMenu,
    /// Toggle the torch
    Torch,
    /// Expand the notification shade
    ExpandNotifications,
    /// Expand quick settings
    ExpandQuickSettings,
    /// Toggle rotation lock
    ToggleRotationLock,
    /// Show the app launcher dialog
    AppLauncher,
}

impl ActionId {
    /// Config-file name of this action.
    pub const fn name(self) -> &'static str {
        match self {
            ActionId::Default => "default",
            ActionId::Search => "search",
            ActionId::VoiceSearch => "voice_search",
            ActionId::PreviousApp => "previous_app",
            ActionId::KillForeground => "kill_foreground",
            ActionId::Sleep => "sleep",
            ActionId::RecentApps => "recent_apps",
            ActionId::LaunchApp => "launch_app",
            ActionId::Menu => "menu",
            ActionId::Back => "back",
            ActionId::Home => "home",
            ActionId::Screenshot => "screenshot",
            ActionId::PowerMenu => "power_menu",
            ActionId::Torch => "torch",
            ActionId::ExpandNotifications => "expand_notifications",
            ActionId::ExpandQuickSettings => "expand_quick_settings",
            ActionId::ToggleRotationLock => "toggle_rotation_lock",
            ActionId::AppLauncher => "app_launcher",
        }
    }

    /// Parses an action name, mapping anything unrecognised to `Default`.
    ///
    /// Unknown actions are never a hard failure: an unrecognised binding
    /// simply leaves the key with its platform behaviour.
    pub fn parse_lenient(name: &str) -> ActionId {
        name.parse().unwrap_or(ActionId::Default)
    }

    /// Whether the action needs a payload to do anything.
    pub const fn requires_payload(self) -> bool {
        matches!(self, ActionId::LaunchApp)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionId {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ALL_ACTIONS
            .iter()
            .copied()
            .find(|action| action.name() == wanted)
            .ok_or_else(|| UnknownName {
                kind: "action",
                name: s.to_string(),
            })
    }
}

const ALL_ACTIONS: &[ActionId] = &[
    ActionId::Default,
    ActionId::Search,
    ActionId::VoiceSearch,
    ActionId::PreviousApp,
    ActionId::KillForeground,
    ActionId::Sleep,
    ActionId::RecentApps,
    ActionId::LaunchApp,
    ActionId::Menu,
    ActionId::Back,
    ActionId::Home,
    ActionId::Screenshot,
    ActionId::PowerMenu,
    ActionId::Torch,
    ActionId::ExpandNotifications,
    ActionId::ExpandQuickSettings,
    ActionId::ToggleRotationLock,
    ActionId::AppLauncher,
];

/// The action bound to one `(Channel, TriggerKind)` pair.
///
/// # Example
/// ```ignore
/// let binding = ActionBinding::with_payload(ActionId::LaunchApp, "org.example.notes");
/// // Represents: bind = MENU, long_press, launch_app, org.example.notes
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ActionBinding {
    /// What to run
    pub action: ActionId,

    /// Optional argument for the action (e.g. the app to launch)
    pub payload: Option<String>,
}

impl ActionBinding {
    /// Binding without a payload.
    pub fn new(action: ActionId) -> Self {
        Self {
            action,
            payload: None,
        }
    }

    /// Binding carrying a payload.
    pub fn with_payload(action: ActionId, payload: &str) -> Self {
        Self {
            action,
            payload: Some(payload.to_string()),
        }
    }

    /// True for the pass-through sentinel.
    pub fn is_default(&self) -> bool {
        self.action == ActionId::Default
    }
}

impl fmt::Display for ActionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.action)?;

        if let Some(payload) = &self.payload {
            write!(f, ", {}", payload)?;
        }

        Ok(())
    }
}

/// Press or release.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum KeyPhase {
    /// Key went down (or is repeating while held)
    Down,
    /// Key came up
    Up,
}

impl fmt::Display for KeyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPhase::Down => write!(f, "down"),
            KeyPhase::Up => write!(f, "up"),
        }
    }
}

/// A normalised key event as delivered by the platform adapter.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RawKeyEvent {
    /// Which logical button
    pub channel: Channel,

    /// Press or release
    pub phase: KeyPhase,

    /// 0 for the initial press, >0 for auto-repeat while held
    pub repeat_count: u32,

    /// False for events the engine (or anyone else) synthesised
    pub from_system: bool,

    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl RawKeyEvent {
    /// Initial press delivered by the platform.
    pub fn down(channel: Channel, timestamp_ms: u64) -> Self {
        Self {
            channel,
            phase: KeyPhase::Down,
            repeat_count: 0,
            from_system: true,
            timestamp_ms,
        }
    }

    /// Release delivered by the platform.
    pub fn up(channel: Channel, timestamp_ms: u64) -> Self {
        Self {
            channel,
            phase: KeyPhase::Up,
            repeat_count: 0,
            from_system: true,
            timestamp_ms,
        }
    }

    /// Same event with a different repeat count.
    pub fn repeated(mut self, repeat_count: u32) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    /// Same event marked as synthesised.
    pub fn synthetic(mut self) -> Self {
        self.from_system = false;
        self
    }
}

impl fmt::Display for RawKeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @{}ms", self.channel, self.phase, self.timestamp_ms)?;

        if self.repeat_count > 0 {
            write!(f, " repeat={}", self.repeat_count)?;
        }
        if !self.from_system {
            write!(f, " synthetic")?;
        }

        Ok(())
    }
}

/// What the platform adapter must do with an event.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Outcome {
    /// The engine handled it; drop the event
    Consume,
    /// The engine declines; let the platform run its default behaviour
    PassThroughDefault,
    /// The engine claimed the key earlier and now needs the adapter to
    /// synthesise the platform's default behaviour for it
    ReplayOriginal,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Consume => write!(f, "consume"),
            Outcome::PassThroughDefault => write!(f, "pass-through"),
            Outcome::ReplayOriginal => write!(f, "replay"),
        }
    }
}

/// A fired gesture together with the binding it resolved to.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Trigger {
    /// Button the gesture happened on
    pub channel: Channel,

    /// Which gesture
    pub kind: TriggerKind,

    /// Binding in effect when the press cycle was armed
    pub binding: ActionBinding,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} → {}", self.channel, self.kind, self.binding)
    }
}
