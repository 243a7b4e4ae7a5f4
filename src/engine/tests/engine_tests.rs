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

//! Engine facade tests
//!
//! Dispatcher failures, externally driven timers, the config queue and
//! shutdown.

use super::support::*;
use crate::config::{ConfigMessage, ConfigSnapshot};
use crate::core::settings::Setting;
use crate::core::types::{ActionBinding, ActionId, Channel, Outcome, RawKeyEvent, Trigger, TriggerKind};
use crate::dispatch::{ActionDispatcher, DispatchError};
use crate::engine::{Engine, HostConditions};
use std::cell::Cell;
use std::thread;

/// Counts attempts and always fails.
#[derive(Default)]
struct FailingDispatcher {
    attempts: Cell<usize>,
}

impl ActionDispatcher for FailingDispatcher {
    fn dispatch(&self, trigger: &Trigger) -> Result<(), DispatchError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(DispatchError::Unavailable {
            action: trigger.binding.action,
            reason: "target app not installed".to_string(),
        })
    }
}

/// Counts attempts and panics.
#[derive(Default)]
struct PanickingDispatcher {
    attempts: Cell<usize>,
}

impl ActionDispatcher for PanickingDispatcher {
    fn dispatch(&self, _trigger: &Trigger) -> Result<(), DispatchError> {
        self.attempts.set(self.attempts.get() + 1);
        panic!("dispatcher bug");
    }
}

fn snapshot(text: &str) -> ConfigSnapshot {
    ConfigSnapshot::parse(text).unwrap().0
}

fn tap<D: ActionDispatcher>(engine: &mut Engine<D>, channel: Channel, at: u64) -> Outcome {
    engine.on_event(RawKeyEvent::down(channel, at));
    engine.on_event(RawKeyEvent::up(channel, at + 40)).outcome
}

// ============================================================================
// Dispatcher failures
// ============================================================================

#[test]
fn test_dispatch_failure_does_not_affect_state() {
    let mut engine = Engine::from_snapshot(
        snapshot("bind = MENU, single_tap, launch_app, org.example/.Notes\n"),
        HostConditions::new(),
        FailingDispatcher::default(),
    );

    assert_eq!(tap(&mut engine, Channel::Menu, 0), Outcome::Consume);
    assert_eq!(tap(&mut engine, Channel::Menu, 1_000), Outcome::Consume);

    assert_eq!(engine.dispatcher().attempts.get(), 2);
    assert_quiescent(&engine);
}

#[test]
fn test_dispatcher_panic_is_contained() {
    let mut engine = Engine::from_snapshot(
        snapshot("bind = BACK, long_press, sleep\nbind = BACK, single_tap, torch\n"),
        HostConditions::new(),
        PanickingDispatcher::default(),
    );

    engine.on_event(RawKeyEvent::down(Channel::Back, 0));
    let expired = engine.advance_to(600);
    assert_eq!(expired.len(), 1);

    let up = engine.on_event(RawKeyEvent::up(Channel::Back, 700));
    assert_eq!(up.outcome, Outcome::Consume);

    assert_eq!(tap(&mut engine, Channel::Back, 1_000), Outcome::Consume);
    assert_eq!(engine.dispatcher().attempts.get(), 2);
    assert_quiescent(&engine);
}

// ============================================================================
// Externally driven timers
// ============================================================================

#[test]
fn test_external_timer_delivery() {
    let mut engine = engine("bind = BACK, long_press, kill_foreground\n");

    engine.on_event(RawKeyEvent::down(Channel::Back, 0));
    let handle = engine.next_timer().unwrap();
    assert_eq!(engine.next_deadline(), Some(500));

    let response = engine.on_timer_fired(handle).unwrap();
    assert_eq!(response.trigger.map(|t| t.kind), Some(TriggerKind::LongPress));
    assert_eq!(engine.clock_ms(), 500);

    // Delivered twice by a sloppy host
    assert!(engine.on_timer_fired(handle).is_none());
    assert_eq!(fired(&engine).len(), 1);
}

#[test]
fn test_stale_timer_after_release_is_ignored() {
    let mut engine = engine("bind = BACK, long_press, kill_foreground\n");

    engine.on_event(RawKeyEvent::down(Channel::Back, 0));
    let handle = engine.next_timer().unwrap();

    let up = engine.on_event(RawKeyEvent::up(Channel::Back, 100));
    assert_eq!(up.outcome, Outcome::ReplayOriginal);

    assert!(engine.on_timer_fired(handle).is_none());
    assert!(fired(&engine).is_empty());
    assert_quiescent(&engine);
}

// ============================================================================
// Configuration queue
// ============================================================================

#[test]
fn test_config_handle_from_another_thread() {
    let mut engine = engine("");
    let handle = engine.config_handle();

    thread::spawn(move || {
        handle
            .send(ConfigMessage::BindingChanged {
                channel: Channel::Recents,
                kind: TriggerKind::SingleTap,
                binding: ActionBinding::new(ActionId::ExpandNotifications),
            })
            .unwrap();
        handle
            .send(ConfigMessage::SettingChanged(Setting::DoubleTapWindowMs(250)))
            .unwrap();
    })
    .join()
    .unwrap();

    assert_eq!(tap(&mut engine, Channel::Recents, 0), Outcome::Consume);
    assert_eq!(engine.config().double_tap_window_ms, 250);
    assert_eq!(
        fired(&engine),
        vec![(Channel::Recents, TriggerKind::SingleTap, ActionId::ExpandNotifications)]
    );
}

#[test]
fn test_invalid_binding_message_falls_back_to_default() {
    let mut engine = engine("bind = HOME, long_press, voice_search\n");

    // HOME has no single tap; launch_app without a payload is invalid anyway
    engine.on_config_changed(ConfigMessage::BindingChanged {
        channel: Channel::Home,
        kind: TriggerKind::SingleTap,
        binding: ActionBinding::new(ActionId::Search),
    });
    engine.on_config_changed(ConfigMessage::BindingChanged {
        channel: Channel::Home,
        kind: TriggerKind::LongPress,
        binding: ActionBinding::new(ActionId::LaunchApp),
    });

    assert_eq!(engine.registry().bound().count(), 0);
    assert_eq!(tap(&mut engine, Channel::Home, 0), Outcome::PassThroughDefault);
}

// ============================================================================
// Reset and shutdown
// ============================================================================

#[test]
fn test_reset_cancels_everything() {
    let mut engine = engine(
        "bind = BACK, long_press, sleep\n         bind = MENU, double_tap, torch\n",
    );

    engine.on_event(RawKeyEvent::down(Channel::Back, 0));
    engine.on_event(RawKeyEvent::down(Channel::Menu, 10));
    engine.on_event(RawKeyEvent::up(Channel::Menu, 20));
    assert_eq!(engine.pending_timers(), 2);

    engine.reset();
    assert_quiescent(&engine);

    // The held key's release now belongs to nobody
    let up = engine.on_event(RawKeyEvent::up(Channel::Back, 100));
    assert_eq!(up.outcome, Outcome::PassThroughDefault);
    assert!(engine.advance_to(5_000).is_empty());
    assert!(fired(&engine).is_empty());
}

#[test]
fn test_shutdown_degrades_to_untimed_gestures() {
    let mut engine = engine(
        "bind = BACK, double_tap, screenshot\n         bind = MENU, single_tap, search\n         bind = MENU, long_press, power_menu\n",
    );

    engine.shutdown();

    let down = engine.on_event(RawKeyEvent::down(Channel::Back, 0));
    assert_eq!(down.outcome, Outcome::PassThroughDefault);
    engine.on_event(RawKeyEvent::up(Channel::Back, 40));

    assert_eq!(tap(&mut engine, Channel::Menu, 100), Outcome::Consume);
    assert_eq!(engine.pending_timers(), 0);
    assert_eq!(fired(&engine), vec![(Channel::Menu, TriggerKind::SingleTap, ActionId::Search)]);
}

#[test]
fn test_clock_never_runs_backwards() {
    let mut engine = engine("");

    engine.advance_to(1_000);
    engine.on_event(RawKeyEvent::down(Channel::Back, 500));

    assert_eq!(engine.clock_ms(), 1_000);
}
