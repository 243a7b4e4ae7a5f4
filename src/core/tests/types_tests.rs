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

use crate::core::types::{ActionBinding, ActionId, Channel, Outcome, RawKeyEvent, Trigger, TriggerKind};

#[test]
fn test_channel_from_str_is_case_insensitive() {
    assert_eq!("back".parse::<Channel>(), Ok(Channel::Back));
    assert_eq!("Recents".parse::<Channel>(), Ok(Channel::Recents));
    assert_eq!("APP_SWITCH".parse::<Channel>(), Ok(Channel::Recents));
    assert!("volume_up".parse::<Channel>().is_err());
}

#[test]
fn test_trigger_display() {
    assert_eq!(format!("{}", TriggerKind::SingleTap), "single_tap");
    assert_eq!(format!("{}", TriggerKind::LongPress), "long_press");
    assert_eq!(format!("{}", TriggerKind::DoubleTap), "double_tap");
}

#[test]
fn test_every_action_name_parses_back() {
    let names = [
        "default", "search", "voice_search", "previous_app", "kill_foreground",
        "sleep", "recent_apps", "launch_app", "menu", "back", "home",
        "screenshot", "power_menu", "torch", "expand_notifications",
        "expand_quick_settings", "toggle_rotation_lock", "app_launcher",
    ];

    for name in names {
        let action: ActionId = name.parse().unwrap();
        assert_eq!(action.name(), name);
    }
}

#[test]
fn test_only_launch_app_requires_payload() {
    assert!(ActionId::LaunchApp.requires_payload());
    assert!(!ActionId::Torch.requires_payload());
    assert!(!ActionId::Default.requires_payload());
}

#[test]
fn test_trigger_display_includes_binding() {
    let trigger = Trigger {
        channel: Channel::Menu,
        kind: TriggerKind::LongPress,
        binding: ActionBinding::with_payload(ActionId::LaunchApp, "org.example.notes"),
    };

    let display = format!("{}", trigger);
    assert!(display.contains("MENU"));
    assert!(display.contains("long_press"));
    assert!(display.contains("launch_app"));
    assert!(display.contains("org.example.notes"));
}

#[test]
fn test_plain_event_display_has_no_flags() {
    let event = RawKeyEvent::up(Channel::Home, 250);
    assert_eq!(format!("{}", event), "HOME up @250ms");
    assert!(event.from_system);
}

#[test]
fn test_outcome_display() {
    assert_eq!(Outcome::Consume.to_string(), "consume");
    assert_eq!(Outcome::PassThroughDefault.to_string(), "pass-through");
    assert_eq!(Outcome::ReplayOriginal.to_string(), "replay");
}
