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

//! Action dispatch boundary
//!
//! The engine hands every fired `Trigger` to an `ActionDispatcher` exactly
//! once. Dispatchers must not block: anything slow (launching an app, talking
//! to a system service) belongs on the other side of a `QueueDispatcher`.
//!
//! Failures never reach the classifier. The engine logs whatever a dispatcher
//! returns, and also survives a dispatcher that panics.
//!
//! # Example
//! ```
//! use key_gesture_engine::dispatch::{ActionDispatcher, RecordingDispatcher};
//! use key_gesture_engine::core::{ActionBinding, ActionId, Channel, Trigger, TriggerKind};
//!
//! let dispatcher = RecordingDispatcher::new();
//! let trigger = Trigger {
//!     channel: Channel::Back,
//!     kind: TriggerKind::LongPress,
//!     binding: ActionBinding::new(ActionId::KillForeground),
//! };
//!
//! assert!(dispatcher.dispatch(&trigger).is_ok());
//! assert_eq!(dispatcher.calls(), vec![trigger]);
//! ```

use std::cell::RefCell;
use std::sync::mpsc::{channel, Sender};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::types::{ActionId, Trigger};

/// Reasons a dispatch did not happen.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DispatchError {
    /// The action cannot be performed right now (e.g. target app missing)
    #[error("Action '{action}' unavailable: {reason}")]
    Unavailable { action: ActionId, reason: String },

    /// The worker behind a queue has stopped
    #[error("Dispatch queue closed")]
    QueueClosed,

    /// Any other failure reported by the dispatcher
    #[error("Dispatch failed: {0}")]
    Failed(String),
}

/// Receives fired triggers and performs the bound effect.
pub trait ActionDispatcher {
    /// Performs (or hands off) the trigger's action.
    ///
    /// Called exactly once per fired trigger, never with a default binding.
    fn dispatch(&self, trigger: &Trigger) -> Result<(), DispatchError>;
}

impl<D: ActionDispatcher + ?Sized> ActionDispatcher for Box<D> {
    fn dispatch(&self, trigger: &Trigger) -> Result<(), DispatchError> {
        (**self).dispatch(trigger)
    }
}

impl<D: ActionDispatcher + ?Sized> ActionDispatcher for &D {
    fn dispatch(&self, trigger: &Trigger) -> Result<(), DispatchError> {
        (**self).dispatch(trigger)
    }
}

/// Logs every trigger and does nothing else.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingDispatcher;

impl ActionDispatcher for LoggingDispatcher {
    fn dispatch(&self, trigger: &Trigger) -> Result<(), DispatchError> {
        info!(
            channel = %trigger.channel,
            trigger = %trigger.kind,
            action = %trigger.binding,
            "dispatch"
        );
        Ok(())
    }
}

/// Keeps every trigger it receives.
///
/// Used by the simulator to print dispatches next to the event that caused
/// them, and by tests to count them.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    calls: RefCell<Vec<Trigger>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every trigger received so far.
    pub fn calls(&self) -> Vec<Trigger> {
        self.calls.borrow().clone()
    }

    /// Removes and returns the triggers received since the last call.
    pub fn take(&self) -> Vec<Trigger> {
        self.calls.take()
    }
}

impl ActionDispatcher for RecordingDispatcher {
    fn dispatch(&self, trigger: &Trigger) -> Result<(), DispatchError> {
        self.calls.borrow_mut().push(trigger.clone());
        Ok(())
    }
}

/// Fire-and-forget hand-off to a worker thread.
///
/// `dispatch` only enqueues; the handler runs on the worker in arrival
/// order. Dropping every clone of the dispatcher stops the worker.
#[derive(Clone, Debug)]
pub struct QueueDispatcher {
    tx: Sender<Trigger>,
}

impl QueueDispatcher {
    /// Spawns the worker thread.
    ///
    /// # Arguments
    ///
    /// * `handler` - Performs one action; errors are logged by the worker
    ///
    /// # Returns
    ///
    /// The dispatcher and the worker's join handle. The worker exits once
    /// the dispatcher (and all its clones) are dropped.
    pub fn spawn<F>(mut handler: F) -> std::io::Result<(Self, JoinHandle<()>)>
    where
        F: FnMut(Trigger) -> Result<(), DispatchError> + Send + 'static,
    {
        let (tx, rx) = channel::<Trigger>();

        let worker = thread::Builder::new()
            .name("action-dispatch".to_string())
            .spawn(move || {
                for trigger in rx {
                    let action = trigger.binding.action;
                    if let Err(e) = handler(trigger) {
                        warn!(%action, error = %e, "action failed");
                    }
                }
                debug!("dispatch worker stopped");
            })?;

        Ok((Self { tx }, worker))
    }
}

impl ActionDispatcher for QueueDispatcher {
    fn dispatch(&self, trigger: &Trigger) -> Result<(), DispatchError> {
        self.tx
            .send(trigger.clone())
            .map_err(|_| DispatchError::QueueClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ActionBinding, Channel, TriggerKind};
    use std::sync::{Arc, Mutex};

    fn trigger(action: ActionId) -> Trigger {
        Trigger {
            channel: Channel::Menu,
            kind: TriggerKind::SingleTap,
            binding: ActionBinding::new(action),
        }
    }

    #[test]
    fn test_recording_dispatcher_take_drains() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.dispatch(&trigger(ActionId::Torch)).unwrap();

        assert_eq!(dispatcher.take().len(), 1);
        assert!(dispatcher.calls().is_empty());
    }

    #[test]
    fn test_queue_dispatcher_runs_handler_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let (dispatcher, worker) = QueueDispatcher::spawn(move |trigger| {
            sink.lock().unwrap().push(trigger.binding.action);
            Ok(())
        })
        .unwrap();

        dispatcher.dispatch(&trigger(ActionId::Torch)).unwrap();
        dispatcher.dispatch(&trigger(ActionId::Sleep)).unwrap();
        drop(dispatcher);
        worker.join().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![ActionId::Torch, ActionId::Sleep]);
    }

    #[test]
    fn test_queue_dispatcher_survives_failing_handler() {
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);

        let (dispatcher, worker) = QueueDispatcher::spawn(move |_| {
            *sink.lock().unwrap() += 1;
            Err(DispatchError::Failed("boom".to_string()))
        })
        .unwrap();

        dispatcher.dispatch(&trigger(ActionId::Torch)).unwrap();
        dispatcher.dispatch(&trigger(ActionId::Sleep)).unwrap();
        drop(dispatcher);
        worker.join().unwrap();

        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn test_queue_dispatcher_reports_closed_queue() {
        let (dispatcher, worker) = QueueDispatcher::spawn(|_| panic!("worker died")).unwrap();

        dispatcher.dispatch(&trigger(ActionId::Torch)).unwrap();
        assert!(worker.join().is_err());

        assert_eq!(
            dispatcher.dispatch(&trigger(ActionId::Torch)),
            Err(DispatchError::QueueClosed)
        );
    }
}
