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

use crate::core::{
    types::{ActionBinding, ActionId, Channel, TriggerKind},
    validator::{check_shell_metacharacters, validate_binding, validate_payload, validate_trigger, ValidationError},
};

#[test]
fn test_detects_semicolon_injection() {
    let malicious = "org.example; rm -rf /";
    assert!(matches!(
        check_shell_metacharacters(malicious),
        Err(ValidationError::ShellMetacharacters(_))
    ));
}

#[test]
fn test_detects_backtick_and_dollar() {
    assert!(check_shell_metacharacters("org.example`whoami`").is_err());
    assert!(check_shell_metacharacters("org.example$(whoami)").is_err());
}

#[test]
fn test_detects_control_characters() {
    assert!(check_shell_metacharacters("org.example\nbind").is_err());
    assert!(check_shell_metacharacters("org.example\u{7}").is_err());
}

#[test]
fn test_allows_component_names() {
    assert!(validate_payload(ActionId::LaunchApp, Some("org.example.notes")).is_ok());
    assert!(validate_payload(ActionId::LaunchApp, Some("org.example.notes/.MainActivity")).is_ok());
    assert!(validate_payload(ActionId::LaunchApp, Some("com.android.settings/com.android.settings.Settings")).is_ok());
}

#[test]
fn test_rejects_malformed_component_names() {
    assert!(matches!(
        validate_payload(ActionId::LaunchApp, Some("notes")),
        Err(ValidationError::InvalidPayload { .. })
    ));
    assert!(matches!(
        validate_payload(ActionId::LaunchApp, Some("../etc/passwd")),
        Err(ValidationError::InvalidPayload { .. })
    ));
    assert!(matches!(
        validate_payload(ActionId::LaunchApp, Some("org.example notes")),
        Err(ValidationError::InvalidPayload { .. })
    ));
}

#[test]
fn test_payload_length_limit() {
    let long_payload = format!("org.{}", "a".repeat(300));

    assert!(matches!(
        validate_payload(ActionId::LaunchApp, Some(&long_payload)),
        Err(ValidationError::PayloadTooLong(304))
    ));
}

#[test]
fn test_payload_optional_for_plain_actions() {
    assert!(validate_payload(ActionId::Torch, None).is_ok());
    assert!(validate_payload(ActionId::Screenshot, Some("full")).is_ok());
}

#[test]
fn test_validate_trigger_per_channel() {
    for kind in TriggerKind::ALL {
        assert!(validate_trigger(Channel::Back, kind).is_ok());
        assert!(validate_trigger(Channel::Menu, kind).is_ok());
    }
    assert!(validate_trigger(Channel::Home, TriggerKind::SingleTap).is_err());
}

#[test]
fn test_validates_complete_binding_success() {
    let binding = ActionBinding::with_payload(ActionId::LaunchApp, "org.example.notes");
    let normalised = validate_binding(Channel::Menu, TriggerKind::LongPress, &binding).unwrap();
    assert_eq!(normalised, binding);
}

#[test]
fn test_validates_complete_binding_shell_injection() {
    let binding = ActionBinding::with_payload(ActionId::LaunchApp, "org.example|nc");

    assert!(matches!(
        validate_binding(Channel::Menu, TriggerKind::LongPress, &binding),
        Err(ValidationError::ShellMetacharacters(_))
    ));
}

#[test]
fn test_default_on_home_single_tap_is_fine() {
    // Clearing an unsupported slot is always allowed
    let binding = ActionBinding::default();
    assert!(validate_binding(Channel::Home, TriggerKind::SingleTap, &binding).is_ok());
}
