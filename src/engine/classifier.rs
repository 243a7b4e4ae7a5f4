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

//! Gesture classifier
//!
//! One table-driven state machine per channel. Each press cycle (from the
//! first Down to the event or timer that resolves it) produces at most one
//! `Trigger`, and every event gets exactly one `Outcome`.
//!
//! # States
//! ```text
//! Idle ──Down──▶ Pressed ──▶ { WaitingDoubleTapCompanion, LongPressArmed } ──▶ Idle
//! ```
//! `long_press_fired` and `was_double_tap` mark a cycle that already fired;
//! both are cleared when the cycle resolves.
//!
//! # Binding snapshots
//! The channel's bindings are copied on the Down that opens a cycle. Every
//! later decision in that cycle (double-tap confirm, timer resolution,
//! release) reads the copy, so configuration changes only affect the next
//! fresh cycle. Triggers whose lock-screen gate is closed, or whose timer
//! cannot be armed, are left out of the copy.

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::core::types::{
    Channel, KeyPhase, Outcome, RawKeyEvent, Trigger, TriggerKind, CHANNEL_COUNT,
};
use crate::engine::gate::{self, HostConditions};
use crate::engine::registry::{ActionRegistry, ChannelBindings};
use crate::engine::scheduler::{TimerHandle, TimerKind, TimerScheduler};

/// Who owns the current press cycle of a channel.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
enum Cycle {
    /// No cycle, or the engine declined the key on Down
    #[default]
    Unclaimed,
    /// Keys are disabled; the whole cycle is swallowed
    Swallowed,
    /// The engine owns the cycle and resolves it against these bindings
    Owned(ChannelBindings),
}

/// Per-channel classifier state.
///
/// The rest value (`ChannelState::default()`) is what every channel returns
/// to once a press cycle resolves.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChannelState {
    /// Key is physically down
    pub pressed: bool,
    /// Long press already dispatched this cycle
    pub long_press_fired: bool,
    /// Waiting for a companion tap or the window to close
    pub double_tap_armed: bool,
    /// This cycle was confirmed as a double tap
    pub was_double_tap: bool,
    cycle: Cycle,
}

impl ChannelState {
    /// Whether the channel is idle with nothing in flight.
    pub fn is_at_rest(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the engine currently owns (or swallows) this channel's cycle.
    pub fn is_claimed(&self) -> bool {
        self.cycle != Cycle::Unclaimed
    }

    /// Whether the engine consumed input this cycle without firing anything
    /// for it yet.
    pub fn owes_replay(&self) -> bool {
        self.bindings().is_some() && !self.long_press_fired && !self.was_double_tap
    }

    /// Binding snapshot of the in-flight cycle, if the engine owns it.
    pub fn bindings(&self) -> Option<&ChannelBindings> {
        match &self.cycle {
            Cycle::Owned(bindings) => Some(bindings),
            _ => None,
        }
    }
}

/// What the classifier decided for one event or timer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolution {
    /// What the adapter must do
    pub outcome: Outcome,
    /// Gesture to dispatch, if one fired
    pub trigger: Option<Trigger>,
}

impl Resolution {
    /// Handled, nothing fired.
    pub fn consume() -> Self {
        Self {
            outcome: Outcome::Consume,
            trigger: None,
        }
    }

    /// Declined.
    pub fn pass_through() -> Self {
        Self {
            outcome: Outcome::PassThroughDefault,
            trigger: None,
        }
    }

    /// Claimed, but the adapter has to synthesise the default behaviour.
    pub fn replay() -> Self {
        Self {
            outcome: Outcome::ReplayOriginal,
            trigger: None,
        }
    }

    /// Handled, and a gesture fired.
    pub fn fire(trigger: Trigger) -> Self {
        Self {
            outcome: Outcome::Consume,
            trigger: Some(trigger),
        }
    }
}

/// Everything the classifier reads or arms while handling an event.
pub struct ClassifierEnv<'a> {
    /// Current bindings (read only on fresh Down)
    pub registry: &'a ActionRegistry,
    /// Current timing settings
    pub config: &'a EngineConfig,
    /// Timer table shared with the engine
    pub scheduler: &'a mut TimerScheduler,
    /// Host state for per-trigger gates
    pub host: &'a HostConditions,
    /// Whether physical keys are effectively disabled right now
    pub keys_disabled: bool,
}

/// The per-channel state machines.
#[derive(Debug, Default)]
pub struct GestureClassifier {
    states: [ChannelState; CHANNEL_COUNT],
}

impl GestureClassifier {
    /// Creates a classifier with every channel at rest.
    pub fn new() -> Self {
        Self::default()
    }

    /// State of one channel.
    pub fn state(&self, channel: Channel) -> &ChannelState {
        // Channel::index() is always < CHANNEL_COUNT
        &self.states[channel.index()]
    }

    fn state_mut(&mut self, channel: Channel) -> &mut ChannelState {
        &mut self.states[channel.index()]
    }

    /// Classifies one gated event.
    pub fn on_event(&mut self, event: &RawKeyEvent, env: &mut ClassifierEnv<'_>) -> Resolution {
        match event.phase {
            KeyPhase::Down if event.repeat_count > 0 => self.on_repeat(event.channel),
            KeyPhase::Down if self.state(event.channel).double_tap_armed => {
                self.on_companion_down(event.channel, env.scheduler)
            }
            KeyPhase::Down => self.on_fresh_down(event, env),
            KeyPhase::Up => self.on_up(event, env.scheduler),
        }
    }

    /// Runs the callback of a timer the scheduler just released.
    ///
    /// Returns `None` when the timer no longer applies or its resolution is
    /// deferred to the pending release.
    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        scheduler: &mut TimerScheduler,
    ) -> Option<Resolution> {
        match handle.kind {
            TimerKind::DoubleTapReset => self.on_double_tap_timeout(handle.channel, scheduler),
            TimerKind::LongPress => self.on_long_press(handle.channel, scheduler),
        }
    }

    /// Drops whatever is in flight on a channel without resolving it.
    pub fn reset(&mut self, channel: Channel, scheduler: &mut TimerScheduler) {
        if !self.state(channel).is_at_rest() {
            debug!(%channel, "abandoning press cycle");
        }
        self.finish(channel, scheduler);
    }

    /// Returns every channel to rest.
    pub fn reset_all(&mut self, scheduler: &mut TimerScheduler) {
        for channel in Channel::ALL {
            self.reset(channel, scheduler);
        }
    }

    fn on_fresh_down(&mut self, event: &RawKeyEvent, env: &mut ClassifierEnv<'_>) -> Resolution {
        let channel = event.channel;

        // A Down without a release in between starts over
        env.scheduler.cancel_channel(channel);
        let state = self.state_mut(channel);
        *state = ChannelState {
            pressed: true,
            ..ChannelState::default()
        };

        if env.keys_disabled {
            debug!(%channel, "keys disabled, swallowing press");
            state.cycle = Cycle::Swallowed;
            return Resolution::consume();
        }

        let mut bindings = env.registry.snapshot(channel);
        for kind in TriggerKind::ALL {
            let allowed = gate::trigger_allowed(env.config, env.host, channel, kind);
            if bindings.is_bound(kind) && !allowed {
                debug!(%channel, %kind, "trigger gated off for this cycle");
                bindings.clear(kind);
            }
        }

        if bindings.is_bound(TriggerKind::DoubleTap) {
            match env.scheduler.schedule(
                channel,
                TimerKind::DoubleTapReset,
                event.timestamp_ms,
                env.config.double_tap_window_ms,
            ) {
                Ok(_) => state.double_tap_armed = true,
                Err(e) => {
                    warn!(%channel, error = %e, "cannot arm double-tap window, ignoring double-tap binding");
                    bindings.clear(TriggerKind::DoubleTap);
                }
            }
        }

        if bindings.is_bound(TriggerKind::LongPress) {
            let timeout_ms = env.config.timeout_for(bindings.get(TriggerKind::LongPress).action);

            if let Err(e) = env.scheduler.schedule(
                channel,
                TimerKind::LongPress,
                event.timestamp_ms,
                timeout_ms,
            ) {
                warn!(%channel, error = %e, "cannot arm long-press timer, ignoring long-press binding");
                bindings.clear(TriggerKind::LongPress);
            }
        }

        if bindings.any_bound() {
            debug!(
                %channel,
                double_tap_armed = state.double_tap_armed,
                "press cycle claimed"
            );
            state.cycle = Cycle::Owned(bindings);
            Resolution::consume()
        } else {
            Resolution::pass_through()
        }
    }

    fn on_companion_down(&mut self, channel: Channel, scheduler: &mut TimerScheduler) -> Resolution {
        scheduler.cancel_slot(channel, TimerKind::DoubleTapReset);

        let state = self.state_mut(channel);
        state.double_tap_armed = false;
        state.was_double_tap = true;
        state.pressed = true;

        let trigger = state
            .bindings()
            .filter(|bindings| bindings.is_bound(TriggerKind::DoubleTap))
            .map(|bindings| Trigger {
                channel,
                kind: TriggerKind::DoubleTap,
                binding: bindings.get(TriggerKind::DoubleTap).clone(),
            });

        debug!(%channel, "double tap confirmed");
        match trigger {
            Some(trigger) => Resolution::fire(trigger),
            None => Resolution::consume(),
        }
    }

    fn on_repeat(&mut self, channel: Channel) -> Resolution {
        if self.state(channel).is_claimed() {
            Resolution::consume()
        } else {
            Resolution::pass_through()
        }
    }

    fn on_up(&mut self, event: &RawKeyEvent, scheduler: &mut TimerScheduler) -> Resolution {
        let channel = event.channel;
        scheduler.cancel_slot(channel, TimerKind::LongPress);

        let state = self.state_mut(channel);
        state.pressed = false;

        let bindings = match &state.cycle {
            Cycle::Unclaimed => {
                self.finish(channel, scheduler);
                return Resolution::pass_through();
            }
            Cycle::Swallowed => {
                self.finish(channel, scheduler);
                return Resolution::consume();
            }
            Cycle::Owned(bindings) => bindings.clone(),
        };

        if state.long_press_fired {
            self.finish(channel, scheduler);
            return Resolution::consume();
        }

        if state.double_tap_armed {
            // Still waiting for the companion tap or the window to close
            return Resolution::consume();
        }

        let resolution = if event.repeat_count == 0 && !state.was_double_tap {
            resolve_tap(channel, &bindings)
        } else {
            Resolution::consume()
        };

        self.finish(channel, scheduler);
        resolution
    }

    fn on_double_tap_timeout(
        &mut self,
        channel: Channel,
        scheduler: &mut TimerScheduler,
    ) -> Option<Resolution> {
        let state = self.state_mut(channel);
        if !state.double_tap_armed {
            return None;
        }
        state.double_tap_armed = false;

        if state.pressed {
            debug!(%channel, "double-tap window closed while held, deferring to release");
            return None;
        }

        let resolution = state.bindings().map(|bindings| resolve_tap(channel, bindings));
        self.finish(channel, scheduler);
        resolution
    }

    fn on_long_press(&mut self, channel: Channel, scheduler: &mut TimerScheduler) -> Option<Resolution> {
        let state = self.state_mut(channel);
        if !state.pressed || state.long_press_fired {
            return None;
        }

        let binding = state
            .bindings()
            .filter(|bindings| bindings.is_bound(TriggerKind::LongPress))
            .map(|bindings| bindings.get(TriggerKind::LongPress).clone())?;

        if state.double_tap_armed {
            // The long press wins; the pending single/double-tap decision is void
            state.double_tap_armed = false;
            scheduler.cancel_slot(channel, TimerKind::DoubleTapReset);
        }
        state.long_press_fired = true;

        debug!(%channel, "long press fired");
        Some(Resolution::fire(Trigger {
            channel,
            kind: TriggerKind::LongPress,
            binding,
        }))
    }

    fn finish(&mut self, channel: Channel, scheduler: &mut TimerScheduler) {
        scheduler.cancel_channel(channel);
        *self.state_mut(channel) = ChannelState::default();
    }
}

/// Resolves a released, non-double-tap cycle.
fn resolve_tap(channel: Channel, bindings: &ChannelBindings) -> Resolution {
    if bindings.is_bound(TriggerKind::SingleTap) {
        Resolution::fire(Trigger {
            channel,
            kind: TriggerKind::SingleTap,
            binding: bindings.get(TriggerKind::SingleTap).clone(),
        })
    } else {
        Resolution::replay()
    }
}
