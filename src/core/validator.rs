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

//! Binding validation
//!
//! Bindings arrive from settings storage that this crate does not own, so
//! every binding is checked before it reaches the registry:
//! - The `(channel, trigger)` pair must be one the channel supports
//! - Payloads must not carry shell metacharacters or control characters
//! - `launch_app` payloads must look like a package or component name
//!
//! # Whitelist, not blacklist
//! Payload formats are matched against an allow pattern. Anything that does
//! not match is rejected; the registry then falls back to the pass-through
//! sentinel instead of failing.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::core::types::{ActionBinding, ActionId, Channel, TriggerKind};

/// Longest payload accepted.
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Channel cannot bind this trigger kind
    #[error("{channel} does not support {kind}")]
    UnsupportedTrigger { channel: Channel, kind: TriggerKind },

    /// Action needs a payload but none was given
    #[error("Action '{0}' requires a payload")]
    MissingPayload(ActionId),

    /// Payload does not have the shape the action expects
    #[error("Invalid payload for '{action}': '{payload}'")]
    InvalidPayload { action: ActionId, payload: String },

    /// Dangerous shell metacharacters detected in the payload
    #[error("Dangerous shell metacharacters detected in payload: '{0}'")]
    ShellMetacharacters(String),

    /// Payload exceeds maximum length
    #[error("Payload too long: {0} characters (max 256)")]
    PayloadTooLong(usize),
}

/// Package name with an optional activity, e.g. `org.example.notes/.Main`.
fn component_pattern() -> Result<&'static Regex, ValidationError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z0-9_]+)+(/[A-Za-z0-9_.]+)?$"))
        .as_ref()
        .map_err(|e| ValidationError::InvalidPayload {
            action: ActionId::LaunchApp,
            payload: e.to_string(),
        })
}

/// Checks for shell metacharacters and control characters
///
/// Detects: ; | & $ ` ( ) { } [ ] < > \ " ' and any control character
pub fn check_shell_metacharacters(input: &str) -> Result<(), ValidationError> {
    const DANGEROUS_CHARS: &[char] = &[
        ';', '|', '&', '$', '`', '(', ')', '{', '}',
        '[', ']', '<', '>', '\\', '"', '\'',
    ];

    if input.chars().any(|c| DANGEROUS_CHARS.contains(&c) || c.is_control()) {
        return Err(ValidationError::ShellMetacharacters(input.to_string()));
    }

    Ok(())
}

/// Checks that a channel may bind the trigger kind
pub fn validate_trigger(channel: Channel, kind: TriggerKind) -> Result<(), ValidationError> {
    if channel.supports(kind) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedTrigger { channel, kind })
    }
}

/// Validates a payload against what its action expects
pub fn validate_payload(action: ActionId, payload: Option<&str>) -> Result<(), ValidationError> {
    let Some(payload) = payload else {
        return if action.requires_payload() {
            Err(ValidationError::MissingPayload(action))
        } else {
            Ok(())
        };
    };

    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ValidationError::PayloadTooLong(payload.len()));
    }

    check_shell_metacharacters(payload)?;

    if action == ActionId::LaunchApp && !component_pattern()?.is_match(payload) {
        return Err(ValidationError::InvalidPayload {
            action,
            payload: payload.to_string(),
        });
    }

    Ok(())
}

/// Validates a complete binding and returns its normalised form
///
/// Performs all checks:
/// - Trigger supported by the channel
/// - Payload length limit (256 chars)
/// - Shell metacharacter detection
/// - Action-specific payload format
///
/// Default bindings always validate; their payload is dropped.
pub fn validate_binding(
    channel: Channel,
    kind: TriggerKind,
    binding: &ActionBinding,
) -> Result<ActionBinding, ValidationError> {
    if binding.is_default() {
        return Ok(ActionBinding::default());
    }

    validate_trigger(channel, kind)?;
    validate_payload(binding.action, binding.payload.as_deref())?;

    Ok(binding.clone())
}
