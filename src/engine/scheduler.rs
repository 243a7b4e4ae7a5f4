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

//! Trigger timer scheduler
//!
//! Cooperative, single-threaded delayed callbacks. Nothing here sleeps or
//! spawns: deadlines are plain millisecond values on the event clock, and
//! the engine asks for due timers whenever time moves forward.
//!
//! Each channel owns two slots, one per `TimerKind`. Scheduling into an
//! occupied slot replaces the old timer, so a channel can never hold more
//! than one long-press and one double-tap-reset timer.
//!
//! Every handle carries a generation number. Cancelling or taking a handle
//! whose slot has since been cancelled, fired or re-armed is a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::types::{Channel, CHANNEL_COUNT};

/// The two kinds of delayed callback a channel can have pending.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum TimerKind {
    /// Fires when the key has been held for the long-press timeout
    LongPress,
    /// Fires when the double-tap window closes without a companion tap
    DoubleTapReset,
}

impl TimerKind {
    const fn slot(self) -> usize {
        match self {
            TimerKind::LongPress => 0,
            TimerKind::DoubleTapReset => 1,
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::LongPress => write!(f, "long-press"),
            TimerKind::DoubleTapReset => write!(f, "double-tap-reset"),
        }
    }
}

/// Identifies one scheduled timer.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TimerHandle {
    /// Channel the timer belongs to
    pub channel: Channel,
    /// Which slot
    pub kind: TimerKind,
    /// Absolute deadline on the event clock
    pub deadline_ms: u64,
    generation: u64,
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} timer @{}ms", self.channel, self.kind, self.deadline_ms)
    }
}

/// Reasons a timer could not be armed.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SchedulerError {
    /// `now + delay` does not fit the clock
    #[error("Deadline overflow: {now_ms}ms + {delay_ms}ms")]
    DeadlineOverflow { now_ms: u64, delay_ms: u32 },

    /// The scheduler was shut down
    #[error("Scheduler closed")]
    Closed,
}

/// Timer table for every channel.
#[derive(Debug, Default)]
pub struct TimerScheduler {
    slots: [[Option<TimerHandle>; 2]; CHANNEL_COUNT],
    next_generation: u64,
    closed: bool,
}

impl TimerScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timer, replacing any timer pending in the same slot.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::DeadlineOverflow` if the deadline cannot be
    /// represented and `SchedulerError::Closed` after `close()`. In both
    /// cases the slot is left empty.
    pub fn schedule(
        &mut self,
        channel: Channel,
        kind: TimerKind,
        now_ms: u64,
        delay_ms: u32,
    ) -> Result<TimerHandle, SchedulerError> {
        self.cancel_slot(channel, kind);

        if self.closed {
            return Err(SchedulerError::Closed);
        }

        let deadline_ms = now_ms
            .checked_add(u64::from(delay_ms))
            .ok_or(SchedulerError::DeadlineOverflow { now_ms, delay_ms })?;

        self.next_generation = self.next_generation.wrapping_add(1);
        let handle = TimerHandle {
            channel,
            kind,
            deadline_ms,
            generation: self.next_generation,
        };

        *self.slot_mut(channel, kind) = Some(handle);
        Ok(handle)
    }

    /// Cancels a timer if it is still pending.
    ///
    /// Returns true if the timer was live. Cancelling a fired, cancelled or
    /// replaced timer does nothing.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.take(handle)
    }

    /// Cancels whatever is pending in a slot.
    pub fn cancel_slot(&mut self, channel: Channel, kind: TimerKind) -> bool {
        self.slot_mut(channel, kind).take().is_some()
    }

    /// Cancels both slots of a channel.
    pub fn cancel_channel(&mut self, channel: Channel) {
        self.cancel_slot(channel, TimerKind::LongPress);
        self.cancel_slot(channel, TimerKind::DoubleTapReset);
    }

    /// Removes a timer that is about to fire.
    ///
    /// Returns false if the handle is stale, in which case the callback must
    /// not run.
    pub fn take(&mut self, handle: TimerHandle) -> bool {
        let slot = self.slot_mut(handle.channel, handle.kind);

        if *slot == Some(handle) {
            *slot = None;
            true
        } else {
            false
        }
    }

    /// Removes and returns the earliest timer due at or before `now_ms`.
    ///
    /// Ties are broken by scheduling order.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<TimerHandle> {
        let due = self.peek().filter(|handle| handle.deadline_ms <= now_ms)?;

        self.take(due);
        Some(due)
    }

    /// Earliest pending timer, without removing it.
    pub fn peek(&self) -> Option<TimerHandle> {
        self.iter()
            .min_by_key(|handle| (handle.deadline_ms, handle.generation))
    }

    /// Earliest pending deadline, for hosts that drive their own clock.
    pub fn next_deadline(&self) -> Option<u64> {
        self.peek().map(|handle| handle.deadline_ms)
    }

    /// Number of timers pending for one channel.
    pub fn pending_for(&self, channel: Channel) -> usize {
        self.slots
            .get(channel.index())
            .map(|slots| slots.iter().flatten().count())
            .unwrap_or(0)
    }

    /// Number of timers pending in total.
    pub fn pending(&self) -> usize {
        self.iter().count()
    }

    /// Cancels everything and refuses further scheduling.
    pub fn close(&mut self) {
        for channel in Channel::ALL {
            self.cancel_channel(channel);
        }
        self.closed = true;
    }

    fn iter(&self) -> impl Iterator<Item = TimerHandle> + '_ {
        self.slots.iter().flatten().flatten().copied()
    }

    fn slot_mut(&mut self, channel: Channel, kind: TimerKind) -> &mut Option<TimerHandle> {
        // Channel and kind indices are in range by construction
        &mut self.slots[channel.index()][kind.slot()]
    }
}
