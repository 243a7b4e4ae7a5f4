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

//! Action binding registry
//!
//! A fixed `channel × trigger` table of bindings with O(1) lookup. Slots
//! that were never configured hold the pass-through sentinel.
//!
//! Writes are validated one slot at a time. A binding that fails
//! validation is stored as `ActionId::Default` rather than rejected
//! outright, so a bad settings value can only ever give the key back to the
//! platform.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{ActionBinding, Channel, TriggerKind, CHANNEL_COUNT, TRIGGER_COUNT};
use crate::core::validator::{validate_binding, ValidationError};

/// A binding write that was replaced by the default.
#[derive(Debug, Error, PartialEq)]
#[error("Binding for {channel} {kind} rejected, falling back to default: {source}")]
pub struct RegistryError {
    /// Channel of the rejected write
    pub channel: Channel,
    /// Trigger of the rejected write
    pub kind: TriggerKind,
    /// Why validation failed
    #[source]
    pub source: ValidationError,
}

/// The three bindings of one channel.
///
/// The classifier copies this at the start of a press cycle and resolves
/// the whole cycle against the copy.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChannelBindings {
    slots: [ActionBinding; TRIGGER_COUNT],
}

impl ChannelBindings {
    /// Binding for one trigger kind.
    pub fn get(&self, kind: TriggerKind) -> &ActionBinding {
        // TriggerKind::index() is always < TRIGGER_COUNT
        &self.slots[kind.index()]
    }

    /// Whether the trigger kind has a non-default binding.
    pub fn is_bound(&self, kind: TriggerKind) -> bool {
        !self.get(kind).is_default()
    }

    /// Whether any trigger kind has a non-default binding.
    pub fn any_bound(&self) -> bool {
        self.slots.iter().any(|binding| !binding.is_default())
    }

    /// Drops one binding from this copy.
    pub fn clear(&mut self, kind: TriggerKind) {
        self.slots[kind.index()] = ActionBinding::default();
    }

    fn set(&mut self, kind: TriggerKind, binding: ActionBinding) {
        self.slots[kind.index()] = binding;
    }
}

/// Holds the current `channel → trigger → action` configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActionRegistry {
    table: [ChannelBindings; CHANNEL_COUNT],
}

impl ActionRegistry {
    /// Creates a registry with every slot set to the default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up one binding.
    ///
    /// Time complexity: O(1)
    pub fn binding(&self, channel: Channel, kind: TriggerKind) -> &ActionBinding {
        self.channel(channel).get(kind)
    }

    /// All bindings of one channel.
    pub fn channel(&self, channel: Channel) -> &ChannelBindings {
        // Channel::index() is always < CHANNEL_COUNT
        &self.table[channel.index()]
    }

    /// Copy of one channel's bindings for an in-flight press cycle.
    pub fn snapshot(&self, channel: Channel) -> ChannelBindings {
        self.channel(channel).clone()
    }

    /// Whether the channel has any non-default binding.
    pub fn has_any_binding(&self, channel: Channel) -> bool {
        self.channel(channel).any_bound()
    }

    /// Replaces one binding.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` when validation fails. The slot has been
    /// reset to the default in that case; the error is informational.
    pub fn set_binding(
        &mut self,
        channel: Channel,
        kind: TriggerKind,
        binding: ActionBinding,
    ) -> Result<(), RegistryError> {
        let slot = &mut self.table[channel.index()];

        match validate_binding(channel, kind, &binding) {
            Ok(normalised) => {
                slot.set(kind, normalised);
                Ok(())
            }
            Err(source) => {
                slot.set(kind, ActionBinding::default());
                Err(RegistryError {
                    channel,
                    kind,
                    source,
                })
            }
        }
    }

    /// Every slot in table order, defaults included.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, TriggerKind, &ActionBinding)> + '_ {
        Channel::ALL.into_iter().flat_map(move |channel| {
            TriggerKind::ALL
                .into_iter()
                .map(move |kind| (channel, kind, self.binding(channel, kind)))
        })
    }

    /// Every non-default slot in table order.
    pub fn bound(&self) -> impl Iterator<Item = (Channel, TriggerKind, &ActionBinding)> + '_ {
        self.iter().filter(|(_, _, binding)| !binding.is_default())
    }
}
