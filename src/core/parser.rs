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

//! src/core/parser.rs
//!
//! Parsers for the two line-oriented text formats the crate reads
//!
//! 1. Configuration snapshots:
//! ```text
//! double_tap_window = 300
//! long_press_timeout = 500
//! long_press_timeout[kill_foreground] = 1000
//! keys_enabled = true
//! gate HOME long_press = secure_lock
//! bind = BACK, long_press, kill_foreground
//! bind = MENU, single_tap, launch_app, org.example.notes
//! ```
//! 2. Event scripts, used by the simulator:
//! ```text
//! 0    down BACK
//! 40   down BACK repeat=1
//! 120  up   BACK
//! 900  tick
//! ```
//!
//! # Architecture
//! The parser uses nom combinators for composable, type-safe parsing. Lines
//! are parsed independently; comments (`#`) and blank lines are skipped and
//! the first bad line aborts with its line number.
//!
//! Unknown action names are not a syntax error: they parse to
//! `ActionId::Default`, which leaves the key with its platform behaviour.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map, map_res, opt, rest, value},
    sequence::{delimited, preceded},
    IResult, Parser,
};
use thiserror::Error;
use tracing::warn;

use crate::core::settings::{Setting, TriggerGate};
use crate::core::types::{ActionBinding, ActionId, Channel, KeyPhase, RawKeyEvent, TriggerKind};

/// Parse errors with line number context
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parse error on line {line}: {message}")]
    InvalidSyntax { line: usize, message: String },
}

/// One meaningful line of a configuration snapshot
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigEntry {
    /// `bind = CHANNEL, trigger, action[, payload]`
    Bind {
        channel: Channel,
        kind: TriggerKind,
        binding: ActionBinding,
    },
    /// Any of the `key = value` or `gate` lines
    Setting(Setting),
}

/// One step of an event script
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScriptStep {
    /// Deliver a key event
    Event(RawKeyEvent),
    /// Advance the clock without input
    Tick(u64),
}

/// Parse a complete configuration snapshot
///
/// # Returns
/// Every binding and setting in file order, or the first syntax error
///
/// # Example
/// ```ignore
/// let text = std::fs::read_to_string("keys.conf")?;
/// let entries = parse_config_file(&text)?;
/// ```
pub fn parse_config_file(content: &str) -> Result<Vec<ConfigEntry>, ParseError> {
    parse_lines(content, parse_config_line)
}

/// Parse a complete event script
pub fn parse_event_script(content: &str) -> Result<Vec<ScriptStep>, ParseError> {
    parse_lines(content, parse_script_line)
}

/// Runs a line parser over every non-comment line
fn parse_lines<T>(
    content: &str,
    mut parse_line: impl FnMut(&str) -> IResult<&str, T>,
) -> Result<Vec<T>, ParseError> {
    let mut items = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1; // Human-readable numbers start at 1

        let line_trimmed = strip_comment(line).trim();
        if line_trimmed.is_empty() {
            continue;
        }

        match all_consuming(&mut parse_line).parse(line_trimmed) {
            Ok((_, item)) => items.push(item),
            Err(e) => {
                return Err(ParseError::InvalidSyntax {
                    line: line_num,
                    message: format!("{} (in '{}')", e, line_trimmed),
                });
            }
        }
    }

    Ok(items)
}

/// Drops everything after a `#`
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Parse any configuration line
pub fn parse_config_line(input: &str) -> IResult<&str, ConfigEntry> {
    alt((
        parse_bind_line,
        map(parse_gate_line, ConfigEntry::Setting),
        map(parse_setting_line, ConfigEntry::Setting),
    ))
    .parse(input)
}

/// Parse a single bind line
///
/// Format: bind = CHANNEL, TRIGGER, ACTION[, PAYLOAD]
/// Example: bind = MENU, long_press, launch_app, org.example.notes
pub fn parse_bind_line(input: &str) -> IResult<&str, ConfigEntry> {
    let (input, _) = (tag("bind"), space0, char('='), space0).parse(input)?;
    let (input, channel) = parse_channel(input)?;
    let (input, _) = comma(input)?;
    let (input, kind) = parse_trigger(input)?;
    let (input, _) = comma(input)?;
    let (input, binding) = parse_action(input)?;

    Ok((
        input,
        ConfigEntry::Bind {
            channel,
            kind,
            binding,
        },
    ))
}

/// Parse a gate line
///
/// Format: gate CHANNEL TRIGGER = always|secure_lock|unlocked
/// Example: gate HOME long_press = secure_lock
pub fn parse_gate_line(input: &str) -> IResult<&str, Setting> {
    let (input, _) = (tag("gate"), space1).parse(input)?;
    let (input, channel) = parse_channel(input)?;
    let (input, _) = space1(input)?;
    let (input, kind) = parse_trigger(input)?;
    let (input, _) = equals(input)?;
    let (input, gate) = map_res(identifier, str::parse::<TriggerGate>).parse(input)?;

    Ok((input, Setting::TriggerGate { channel, kind, gate }))
}

/// Parse a `key = value` setting line
pub fn parse_setting_line(input: &str) -> IResult<&str, Setting> {
    alt((
        map(preceded((tag("double_tap_window"), equals), millis), Setting::DoubleTapWindowMs),
        parse_action_timeout,
        map(
            preceded((tag("long_press_timeout"), equals), millis),
            Setting::DefaultLongPressTimeoutMs,
        ),
        map(preceded((tag("keys_enabled"), equals), boolean), Setting::GlobalKeysEnabled),
    ))
    .parse(input)
}

/// Parse `long_press_timeout[action] = ms|default`
fn parse_action_timeout(input: &str) -> IResult<&str, Setting> {
    let (input, action) = preceded(
        tag("long_press_timeout"),
        delimited(char('['), map_res(identifier, str::parse::<ActionId>), char(']')),
    )
    .parse(input)?;
    let (input, _) = equals(input)?;
    let (input, timeout_ms) = alt((map(millis, Some), value(None, tag("default")))).parse(input)?;

    Ok((input, Setting::ActionLongPressTimeoutMs { action, timeout_ms }))
}

/// Parse an action name with its optional payload
///
/// Examples:
/// - "torch" → (Torch, None)
/// - "launch_app, org.example.notes" → (LaunchApp, Some("org.example.notes"))
/// - "warp_drive" → (Default, None)
pub fn parse_action(input: &str) -> IResult<&str, ActionBinding> {
    let (input, name) = identifier(input)?;
    let (input, payload) = opt(preceded(comma, rest)).parse(input)?;

    let action = ActionId::parse_lenient(name);
    if action == ActionId::Default && !name.eq_ignore_ascii_case("default") {
        warn!(action = name, "unknown action, treating binding as default");
    }

    let payload = payload
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    Ok((input, ActionBinding { action, payload }))
}

/// Parse an event script line
///
/// Format: TIMESTAMP (down|up) CHANNEL [repeat=N] [synthetic]
///     or: TIMESTAMP tick
pub fn parse_script_line(input: &str) -> IResult<&str, ScriptStep> {
    let (input, timestamp_ms) = map_res(digit1, str::parse::<u64>).parse(input)?;
    let (input, _) = space1(input)?;

    alt((
        value(ScriptStep::Tick(timestamp_ms), tag("tick")),
        map(
            (
                parse_phase,
                preceded(space1, parse_channel),
                opt(preceded((space1, tag("repeat=")), map_res(digit1, str::parse::<u32>))),
                opt(preceded(space1, tag("synthetic"))),
            ),
            move |(phase, channel, repeat, synthetic)| {
                ScriptStep::Event(RawKeyEvent {
                    channel,
                    phase,
                    repeat_count: repeat.unwrap_or(0),
                    from_system: synthetic.is_none(),
                    timestamp_ms,
                })
            },
        ),
    ))
    .parse(input)
}

/// Parse down|up
pub fn parse_phase(input: &str) -> IResult<&str, KeyPhase> {
    alt((value(KeyPhase::Down, tag("down")), value(KeyPhase::Up, tag("up")))).parse(input)
}

/// Parse a channel name (MENU, HOME, BACK, RECENTS, CUSTOM)
pub fn parse_channel(input: &str) -> IResult<&str, Channel> {
    map_res(identifier, str::parse::<Channel>).parse(input)
}

/// Parse a trigger name (single_tap, long_press, double_tap)
pub fn parse_trigger(input: &str) -> IResult<&str, TriggerKind> {
    map_res(identifier, str::parse::<TriggerKind>).parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_').parse(input)
}

fn comma(input: &str) -> IResult<&str, ()> {
    value((), (space0, char(','), space0)).parse(input)
}

fn equals(input: &str) -> IResult<&str, ()> {
    value((), (space0, char('='), space0)).parse(input)
}

fn millis(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse::<u32>).parse(input)
}

fn boolean(input: &str) -> IResult<&str, bool> {
    alt((
        value(true, alt((tag("true"), tag("on"), tag("1")))),
        value(false, alt((tag("false"), tag("off"), tag("0")))),
    ))
    .parse(input)
}
