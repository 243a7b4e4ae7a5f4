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

//! src/core/mod.rs
//!
//! Pure data and text handling
//!
//! This module contains everything that has no state of its own:
//! - Type definitions for channels, triggers, actions and key events
//! - Individually addressable settings
//! - Parsing of configuration snapshots and event scripts
//! - Binding validation with whitelisted payload formats
//!
//! Nothing here touches timers, threads or the file system, so it can be
//! unit tested without a running engine.

pub mod parser;
pub mod settings;
pub mod types;
pub mod validator;

pub use settings::{Setting, TriggerGate};
pub use types::*;
pub use validator::{validate_binding, ValidationError};

#[cfg(test)]
mod tests;
