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

//! Shared helpers for engine tests

use crate::config::ConfigSnapshot;
use crate::core::types::{ActionId, Channel, TriggerKind};
use crate::dispatch::{ActionDispatcher, RecordingDispatcher};
use crate::engine::{Engine, HostConditions};

/// Engine with a recording dispatcher, built from config text.
pub fn engine(config: &str) -> Engine<RecordingDispatcher> {
    engine_with_host(config, HostConditions::new())
}

/// Same as `engine`, sharing the given host conditions.
pub fn engine_with_host(config: &str, host: HostConditions) -> Engine<RecordingDispatcher> {
    let (snapshot, rejected) = ConfigSnapshot::parse(config).unwrap();
    assert!(rejected.is_empty(), "test config rejected: {:?}", rejected);
    Engine::from_snapshot(snapshot, host, RecordingDispatcher::new())
}

/// Everything dispatched so far, as `(channel, trigger, action)`.
pub fn fired(engine: &Engine<RecordingDispatcher>) -> Vec<(Channel, TriggerKind, ActionId)> {
    engine
        .dispatcher()
        .calls()
        .into_iter()
        .map(|t| (t.channel, t.kind, t.binding.action))
        .collect()
}

/// Asserts that no channel has anything in flight.
pub fn assert_quiescent<D: ActionDispatcher>(engine: &Engine<D>) {
    for channel in Channel::ALL {
        assert!(
            engine.channel_state(channel).is_at_rest(),
            "{} not at rest: {:?}",
            channel,
            engine.channel_state(channel)
        );
        assert_eq!(engine.pending_timers_for(channel), 0, "{} has pending timers", channel);
    }
}
