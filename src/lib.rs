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

//! Key Gesture Engine
//!
//! Reinterprets raw button press/release events into single taps, long
//! presses and double taps per logical button, and dispatches each gesture to
//! a user-configured action. Buttons without an override keep their platform
//! behaviour.
//!
//! # Features
//!
//! - **Gesture Disambiguation:** One trigger per press cycle, never two
//! - **Per-Action Timeouts:** Destructive actions can demand a longer hold
//! - **Live Reconfiguration:** Bindings change without disturbing a press in flight
//! - **Gating:** Synthetic events, kiosk mode and lock-screen state respected
//! - **Validated Bindings:** Whitelisted payloads; bad bindings fall back to default
//!
//! # Architecture
//!
//! - **`core`:** Pure types, config/script parsing, binding validation
//! - **`engine`:** Classifier, timer scheduler, registry, gate and the facade
//! - **`config`:** Settings, snapshots, file loading and live reload
//! - **`dispatch`:** The boundary where fired actions leave the engine
//!
//! # Examples
//!
//! ## Loading a config file
//!
//! ```no_run
//! use key_gesture_engine::config::ConfigManager;
//!
//! let manager = ConfigManager::new("/tmp/key-gestures.conf".into())?;
//! let loaded = manager.load()?;
//! for rejected in &loaded.rejected {
//!     eprintln!("{}", rejected);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Driving the engine
//!
//! ```
//! use key_gesture_engine::config::ConfigSnapshot;
//! use key_gesture_engine::core::{Channel, Outcome, RawKeyEvent};
//! use key_gesture_engine::dispatch::LoggingDispatcher;
//! use key_gesture_engine::engine::{Engine, HostConditions};
//!
//! let (snapshot, _) = ConfigSnapshot::parse("bind = BACK, double_tap, torch\n")?;
//! let mut engine = Engine::from_snapshot(snapshot, HostConditions::new(), LoggingDispatcher);
//!
//! engine.on_event(RawKeyEvent::down(Channel::Back, 0));
//! engine.on_event(RawKeyEvent::up(Channel::Back, 60));
//! let response = engine.on_event(RawKeyEvent::down(Channel::Back, 150));
//!
//! assert_eq!(response.outcome, Outcome::Consume);
//! assert!(response.trigger.is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod core;
pub mod dispatch;
pub mod engine;

pub use config::{ConfigError, ConfigMessage, ConfigSnapshot, EngineConfig};
pub use engine::{Engine, EventResponse, HostConditions, TimerResponse};
