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

//! Engine module tests
//!
//! Contains test suites for the stateful engine:
//! - Gesture properties (tap, double tap, long press, timeouts, reconfiguration)
//! - Classifier edge cases (repeats, missed releases, timer races)
//! - Gate policy (synthetic events, kiosk mode, trigger gates, disabled keys)
//! - Facade behaviour (dispatcher failures, external timers, shutdown)

#[cfg(test)]
mod support;
#[cfg(test)]
mod gate_tests;
#[cfg(test)]
mod engine_tests;
