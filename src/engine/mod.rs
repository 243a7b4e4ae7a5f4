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

//! Gesture engine
//!
//! Wires the four stateful parts together behind one entry point per input:
//!
//! - **gate**: decides whether an event is the engine's business at all
//! - **classifier**: per-channel state machines producing outcomes and triggers
//! - **scheduler**: long-press and double-tap-reset timers
//! - **registry**: the current `channel × trigger → action` table
//!
//! The engine runs in one serialized context. Key events and due timers are
//! both delivered through `&mut self`, so they interleave but never overlap.
//! Configuration may change from other threads through a `ConfigHandle`;
//! queued messages are applied at the start of every entry point.
//!
//! # Example
//! ```
//! use key_gesture_engine::config::{ConfigSnapshot, ConfigMessage};
//! use key_gesture_engine::core::{ActionBinding, ActionId, Channel, Outcome, RawKeyEvent, TriggerKind};
//! use key_gesture_engine::dispatch::RecordingDispatcher;
//! use key_gesture_engine::engine::{Engine, HostConditions};
//!
//! let mut engine = Engine::from_snapshot(
//!     ConfigSnapshot::default(),
//!     HostConditions::new(),
//!     RecordingDispatcher::new(),
//! );
//! engine.on_config_changed(ConfigMessage::BindingChanged {
//!     channel: Channel::Back,
//!     kind: TriggerKind::LongPress,
//!     binding: ActionBinding::new(ActionId::KillForeground),
//! });
//!
//! assert_eq!(engine.on_event(RawKeyEvent::down(Channel::Back, 0)).outcome, Outcome::Consume);
//! engine.advance_to(600);
//! assert_eq!(engine.dispatcher().calls().len(), 1);
//! ```

pub mod classifier;
pub mod gate;
pub mod registry;
pub mod scheduler;

pub use classifier::{ChannelState, GestureClassifier, Resolution};
pub use gate::{BypassReason, GateDecision, HostConditions};
pub use registry::{ActionRegistry, ChannelBindings, RegistryError};
pub use scheduler::{SchedulerError, TimerHandle, TimerKind, TimerScheduler};

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigHandle, ConfigMessage, ConfigSnapshot, EngineConfig};
use crate::core::types::{Channel, KeyPhase, Outcome, RawKeyEvent, Trigger};
use crate::dispatch::ActionDispatcher;
use classifier::ClassifierEnv;

/// What the engine decided for one key event.
#[derive(Clone, Debug, PartialEq)]
pub struct EventResponse {
    /// What the platform adapter must do with the event
    pub outcome: Outcome,
    /// Gesture the event resolved, already dispatched
    pub trigger: Option<Trigger>,
    /// Gate decision for the event
    pub gate: GateDecision,
    /// Timers that came due before the event and were run first
    pub expired: Vec<TimerResponse>,
    /// The gate cut short a cycle whose first tap was already consumed; the
    /// adapter must replay that tap before acting on `outcome`
    pub replay_interrupted_tap: bool,
}

/// What a timer resolved.
///
/// `ReplayOriginal` means the cycle ended without a bound single tap and the
/// adapter must synthesise the channel's default tap.
#[derive(Clone, Debug, PartialEq)]
pub struct TimerResponse {
    /// The timer that ran
    pub handle: TimerHandle,
    /// What the adapter must do
    pub outcome: Outcome,
    /// Gesture the timer fired, already dispatched
    pub trigger: Option<Trigger>,
}

/// The gesture disambiguation and action-binding engine.
pub struct Engine<D: ActionDispatcher> {
    settings: ConfigSnapshot,
    host: HostConditions,
    scheduler: TimerScheduler,
    classifier: GestureClassifier,
    dispatcher: D,
    config_tx: Sender<ConfigMessage>,
    config_rx: Receiver<ConfigMessage>,
    clock_ms: u64,
}

impl<D: ActionDispatcher> Engine<D> {
    /// Creates an engine with every channel at rest.
    ///
    /// # Arguments
    ///
    /// * `config` - Timing and policy settings
    /// * `bindings` - Initial binding table
    /// * `host` - Host predicates, shared with the platform adapter
    /// * `dispatcher` - Receives every fired trigger
    pub fn new(
        config: EngineConfig,
        bindings: ActionRegistry,
        host: HostConditions,
        dispatcher: D,
    ) -> Self {
        Self::from_snapshot(ConfigSnapshot { config, bindings }, host, dispatcher)
    }

    /// Creates an engine from a loaded configuration.
    pub fn from_snapshot(settings: ConfigSnapshot, host: HostConditions, dispatcher: D) -> Self {
        let (config_tx, config_rx) = channel();

        Self {
            settings,
            host,
            scheduler: TimerScheduler::new(),
            classifier: GestureClassifier::new(),
            dispatcher,
            config_tx,
            config_rx,
            clock_ms: 0,
        }
    }

    /// Handles one raw key event.
    ///
    /// Timers due at or before the event's timestamp run first, so a late
    /// event never overtakes a timer that should already have fired.
    pub fn on_event(&mut self, event: RawKeyEvent) -> EventResponse {
        let expired = self.advance_to(event.timestamp_ms);

        let gate = gate::evaluate(&event, &self.host);
        let mut replay_interrupted_tap = false;
        let resolution = match gate {
            GateDecision::Intercept => {
                let mut env = ClassifierEnv {
                    registry: &self.settings.bindings,
                    config: &self.settings.config,
                    scheduler: &mut self.scheduler,
                    host: &self.host,
                    keys_disabled: gate::keys_disabled(&self.settings.config, &self.host),
                };
                self.classifier.on_event(&event, &mut env)
            }
            GateDecision::Bypass(reason) => {
                // Replays must not disturb a cycle; real events that skip the
                // classifier end whatever the channel had in flight
                let state = self.classifier.state(event.channel);
                if event.from_system && !state.is_at_rest() {
                    let releasing = event.phase == KeyPhase::Up && state.pressed;
                    let tap_pending = state.double_tap_armed && !state.pressed;
                    let owes_replay = state.owes_replay();
                    let swallowed = state.is_claimed() && state.bindings().is_none();

                    debug!(channel = %event.channel, %reason, owes_replay, "gate closed mid-cycle");
                    self.classifier.reset(event.channel, &mut self.scheduler);

                    match (releasing, owes_replay) {
                        // The Down of this press was consumed
                        (true, true) => Resolution::replay(),
                        (true, false) if swallowed => Resolution::consume(),
                        _ => {
                            replay_interrupted_tap = owes_replay && tap_pending;
                            Resolution::pass_through()
                        }
                    }
                } else {
                    Resolution::pass_through()
                }
            }
        };

        debug!(%event, outcome = %resolution.outcome, "event classified");

        if let Some(trigger) = &resolution.trigger {
            self.dispatch(trigger);
        }

        EventResponse {
            outcome: resolution.outcome,
            trigger: resolution.trigger,
            gate,
            expired,
            replay_interrupted_tap,
        }
    }

    /// Runs one timer delivered by an external clock.
    ///
    /// Returns `None` for stale handles (cancelled, replaced or already run)
    /// and for timers whose decision is deferred to the pending release.
    pub fn on_timer_fired(&mut self, handle: TimerHandle) -> Option<TimerResponse> {
        self.drain_config();

        if !self.scheduler.take(handle) {
            debug!(%handle, "stale timer ignored");
            return None;
        }

        self.clock_ms = self.clock_ms.max(handle.deadline_ms);
        self.run_timer(handle)
    }

    /// Moves the clock forward, running every timer due at or before
    /// `now_ms` in deadline order.
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<TimerResponse> {
        self.drain_config();

        let mut responses = Vec::new();
        while let Some(handle) = self.scheduler.pop_due(now_ms) {
            self.clock_ms = self.clock_ms.max(handle.deadline_ms);
            responses.extend(self.run_timer(handle));
        }

        self.clock_ms = self.clock_ms.max(now_ms);
        responses
    }

    /// Applies one configuration change immediately.
    ///
    /// Only fresh press cycles see the change; cycles already in flight
    /// finish against the bindings they started with.
    pub fn on_config_changed(&mut self, message: ConfigMessage) {
        self.drain_config();
        self.apply_config(message);
    }

    /// Cloneable sender for configuration changes from other threads.
    pub fn config_handle(&self) -> ConfigHandle {
        ConfigHandle::new(self.config_tx.clone())
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    /// Earliest pending timer, for hosts that arm their own OS timer and
    /// hand the handle back through `on_timer_fired`.
    pub fn next_timer(&self) -> Option<TimerHandle> {
        self.scheduler.peek()
    }

    /// Cancels every timer and returns every channel to rest.
    pub fn reset(&mut self) {
        self.classifier.reset_all(&mut self.scheduler);
    }

    /// Resets and refuses to arm further timers.
    ///
    /// Channels keep working afterwards but can only resolve single taps.
    pub fn shutdown(&mut self) {
        self.reset();
        self.scheduler.close();
        info!("engine shut down");
    }

    /// Classifier state of one channel.
    pub fn channel_state(&self, channel: Channel) -> &ChannelState {
        self.classifier.state(channel)
    }

    /// Number of pending timers across all channels.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Number of pending timers on one channel.
    pub fn pending_timers_for(&self, channel: Channel) -> usize {
        self.scheduler.pending_for(channel)
    }

    /// Current settings.
    pub fn config(&self) -> &EngineConfig {
        &self.settings.config
    }

    /// Current binding table.
    pub fn registry(&self) -> &ActionRegistry {
        &self.settings.bindings
    }

    /// Host predicates shared with the platform adapter.
    pub fn host(&self) -> &HostConditions {
        &self.host
    }

    /// The dispatcher every fired trigger is handed to.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Latest time the engine has seen.
    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    fn run_timer(&mut self, handle: TimerHandle) -> Option<TimerResponse> {
        let resolution = self.classifier.on_timer(handle, &mut self.scheduler)?;

        debug!(%handle, outcome = %resolution.outcome, "timer resolved");

        if let Some(trigger) = &resolution.trigger {
            self.dispatch(trigger);
        }

        Some(TimerResponse {
            handle,
            outcome: resolution.outcome,
            trigger: resolution.trigger,
        })
    }

    fn dispatch(&self, trigger: &Trigger) {
        info!(
            channel = %trigger.channel,
            trigger = %trigger.kind,
            action = %trigger.binding,
            "trigger fired"
        );

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.dispatcher.dispatch(trigger)));
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(action = %trigger.binding.action, error = %e, "dispatch failed"),
            Err(_) => error!(action = %trigger.binding.action, "dispatcher panicked"),
        }
    }

    fn drain_config(&mut self) {
        while let Ok(message) = self.config_rx.try_recv() {
            self.apply_config(message);
        }
    }

    fn apply_config(&mut self, message: ConfigMessage) {
        debug!(%message, "applying config change");
        if let Err(e) = self.settings.apply(message) {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests;
