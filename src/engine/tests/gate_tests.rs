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

//! Gate policy tests

use super::support::*;
use crate::core::types::{ActionId, Channel, Outcome, RawKeyEvent, TriggerKind};
use crate::engine::gate::{BypassReason, GateDecision};
use crate::engine::HostConditions;

// ============================================================================
// Synthetic events
// ============================================================================

#[test]
fn test_synthetic_events_bypass_classifier() {
    let mut engine = engine("bind = BACK, single_tap, torch\n");

    let down = engine.on_event(RawKeyEvent::down(Channel::Back, 0).synthetic());
    let up = engine.on_event(RawKeyEvent::up(Channel::Back, 10).synthetic());

    assert_eq!(down.gate, GateDecision::Bypass(BypassReason::Synthetic));
    assert_eq!(down.outcome, Outcome::PassThroughDefault);
    assert_eq!(up.outcome, Outcome::PassThroughDefault);
    assert!(fired(&engine).is_empty());
    assert_quiescent(&engine);
}

#[test]
fn test_replayed_tap_does_not_disturb_cycle_in_flight() {
    let mut engine = engine(
        "bind = BACK, single_tap, torch\n         bind = BACK, double_tap, screenshot\n",
    );

    engine.on_event(RawKeyEvent::down(Channel::Back, 0));
    engine.on_event(RawKeyEvent::up(Channel::Back, 50));

    engine.on_event(RawKeyEvent::down(Channel::Back, 60).synthetic());
    engine.on_event(RawKeyEvent::up(Channel::Back, 61).synthetic());
    assert!(engine.channel_state(Channel::Back).double_tap_armed);

    engine.on_event(RawKeyEvent::down(Channel::Back, 120));
    assert_eq!(
        fired(&engine),
        vec![(Channel::Back, TriggerKind::DoubleTap, ActionId::Screenshot)]
    );
}

// ============================================================================
// Kiosk mode
// ============================================================================

#[test]
fn test_kiosk_mode_passes_everything_through() {
    let host = HostConditions::new();
    let mut engine = engine_with_host("bind = BACK, single_tap, torch\n", host.clone());

    host.set_kiosk_mode(true);
    let down = engine.on_event(RawKeyEvent::down(Channel::Back, 0));
    let up = engine.on_event(RawKeyEvent::up(Channel::Back, 50));

    assert_eq!(down.gate, GateDecision::Bypass(BypassReason::KioskMode));
    assert_eq!(up.outcome, Outcome::PassThroughDefault);
    assert!(fired(&engine).is_empty());
}

#[test]
fn test_kiosk_mode_mid_press_abandons_cycle() {
    let host = HostConditions::new();
    let mut engine = engine_with_host("bind = BACK, long_press, kill_foreground\n", host.clone());

    engine.on_event(RawKeyEvent::down(Channel::Back, 0));
    assert_eq!(engine.pending_timers(), 1);

    host.set_kiosk_mode(true);
    let up = engine.on_event(RawKeyEvent::up(Channel::Back, 100));

    // The consumed Down is made good by replaying the press
    assert_eq!(up.outcome, Outcome::ReplayOriginal);
    assert!(!up.replay_interrupted_tap);
    assert_quiescent(&engine);
    assert!(engine.advance_to(2_000).is_empty());
    assert!(fired(&engine).is_empty());
}

#[test]
fn test_kiosk_mode_between_taps_replays_consumed_first_tap() {
    let host = HostConditions::new();
    let mut engine = engine_with_host("bind = HOME, double_tap, torch
", host.clone());

    engine.on_event(RawKeyEvent::down(Channel::Home, 0));
    let first_up = engine.on_event(RawKeyEvent::up(Channel::Home, 50));
    assert_eq!(first_up.outcome, Outcome::Consume);

    host.set_kiosk_mode(true);
    let down = engine.on_event(RawKeyEvent::down(Channel::Home, 100));

    assert_eq!(down.outcome, Outcome::PassThroughDefault);
    assert!(down.replay_interrupted_tap);
    assert_quiescent(&engine);

    let up = engine.on_event(RawKeyEvent::up(Channel::Home, 150));
    assert_eq!(up.outcome, Outcome::PassThroughDefault);
    assert!(!up.replay_interrupted_tap);
    assert!(fired(&engine).is_empty());
}

#[test]
fn test_kiosk_mode_after_long_press_owes_nothing() {
    let host = HostConditions::new();
    let mut engine = engine_with_host("bind = BACK, long_press, kill_foreground
", host.clone());

    engine.on_event(RawKeyEvent::down(Channel::Back, 0));
    engine.advance_to(600);
    assert_eq!(fired(&engine).len(), 1);

    host.set_kiosk_mode(true);
    let up = engine.on_event(RawKeyEvent::up(Channel::Back, 700));

    assert_eq!(up.outcome, Outcome::PassThroughDefault);
    assert!(!up.replay_interrupted_tap);
    assert_quiescent(&engine);
}

// ============================================================================
// Trigger gates
// ============================================================================

#[test]
fn test_secure_lock_gate() {
    let host = HostConditions::new();
    let mut engine = engine_with_host(
        "gate HOME long_press = secure_lock\n         bind = HOME, long_press, voice_search\n",
        host.clone(),
    );

    // Nothing else bound, so the unlocked press is left to the platform
    let unlocked = engine.on_event(RawKeyEvent::down(Channel::Home, 0));
    assert_eq!(unlocked.gate, GateDecision::Intercept);
    assert_eq!(unlocked.outcome, Outcome::PassThroughDefault);
    engine.on_event(RawKeyEvent::up(Channel::Home, 700));
    assert!(fired(&engine).is_empty());

    host.set_secure_lock_showing(true);
    let locked = engine.on_event(RawKeyEvent::down(Channel::Home, 1_000));
    assert_eq!(locked.outcome, Outcome::Consume);

    engine.advance_to(1_500);
    assert_eq!(
        fired(&engine),
        vec![(Channel::Home, TriggerKind::LongPress, ActionId::VoiceSearch)]
    );
}

#[test]
fn test_gated_long_press_keeps_double_tap_on_same_channel() {
    let host = HostConditions::new();
    let mut engine = engine_with_host(
        "gate HOME long_press = secure_lock\n         bind = HOME, long_press, voice_search\n         bind = HOME, double_tap, torch\n",
        host.clone(),
    );

    // Unlocked: the long press is out of the cycle, the double tap still works
    let down = engine.on_event(RawKeyEvent::down(Channel::Home, 0));
    assert_eq!(down.outcome, Outcome::Consume);
    assert_eq!(engine.pending_timers_for(Channel::Home), 1);
    engine.on_event(RawKeyEvent::up(Channel::Home, 50));
    let second = engine.on_event(RawKeyEvent::down(Channel::Home, 120));
    engine.on_event(RawKeyEvent::up(Channel::Home, 170));

    assert_eq!(second.outcome, Outcome::Consume);
    assert_eq!(fired(&engine), vec![(Channel::Home, TriggerKind::DoubleTap, ActionId::Torch)]);
    assert_quiescent(&engine);

    // Holding past the long-press timeout while unlocked fires nothing
    engine.on_event(RawKeyEvent::down(Channel::Home, 1_000));
    assert!(engine.advance_to(1_600).is_empty());
    engine.on_event(RawKeyEvent::up(Channel::Home, 1_700).repeated(3));
    assert_eq!(fired(&engine).len(), 1);
    assert_quiescent(&engine);

    // Locked: the long press is back
    host.set_secure_lock_showing(true);
    engine.on_event(RawKeyEvent::down(Channel::Home, 3_000));
    engine.advance_to(3_600);
    assert_eq!(
        fired(&engine).last(),
        Some(&(Channel::Home, TriggerKind::LongPress, ActionId::VoiceSearch))
    );
}

#[test]
fn test_unlocked_gate_only_affects_its_channel() {
    let host = HostConditions::new();
    host.set_secure_lock_showing(true);
    let mut engine = engine_with_host(
        "gate MENU single_tap = unlocked\n         bind = MENU, single_tap, search\n         bind = BACK, single_tap, torch\n",
        host,
    );

    assert_eq!(
        engine.on_event(RawKeyEvent::down(Channel::Menu, 0)).outcome,
        Outcome::PassThroughDefault
    );
    assert_eq!(engine.on_event(RawKeyEvent::down(Channel::Back, 0)).outcome, Outcome::Consume);
}

// ============================================================================
// Disabled keys
// ============================================================================

#[test]
fn test_disabled_keys_with_substitute_input_are_swallowed() {
    let host = HostConditions::new();
    host.set_substitute_input_active(true);
    let mut engine = engine_with_host(
        "keys_enabled = false\n         bind = BACK, single_tap, torch\n",
        host,
    );

    // Bound and unbound channels alike
    for channel in [Channel::Back, Channel::Menu] {
        let down = engine.on_event(RawKeyEvent::down(channel, 0));
        let repeat = engine.on_event(RawKeyEvent::down(channel, 400).repeated(1));
        let up = engine.on_event(RawKeyEvent::up(channel, 500).repeated(1));

        assert_eq!(down.outcome, Outcome::Consume);
        assert_eq!(repeat.outcome, Outcome::Consume);
        assert_eq!(up.outcome, Outcome::Consume);
    }

    assert!(fired(&engine).is_empty());
    assert_quiescent(&engine);
}

#[test]
fn test_disabled_keys_without_substitute_input_still_work() {
    let mut engine = engine(
        "keys_enabled = false\n         bind = BACK, single_tap, torch\n",
    );

    engine.on_event(RawKeyEvent::down(Channel::Back, 0));
    engine.on_event(RawKeyEvent::up(Channel::Back, 50));

    assert_eq!(
        engine.on_event(RawKeyEvent::down(Channel::Menu, 100)).outcome,
        Outcome::PassThroughDefault
    );
    assert_eq!(fired(&engine), vec![(Channel::Back, TriggerKind::SingleTap, ActionId::Torch)]);
}
