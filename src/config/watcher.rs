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

//! Live config file monitoring
//!
//! Uses OS-level file watching via the notify crate. Each modification is
//! reloaded, diffed against the last good snapshot and turned into
//! `ConfigMessage`s, so a running engine only hears about slots that
//! actually changed.
//!
//! The config's directory is watched rather than the file itself: editors
//! save by renaming a temporary file over the original, which would leave a
//! file watch on the old inode.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{ConfigError, ConfigHandle, ConfigManager, ConfigMessage, ConfigSnapshot};

/// Watches the config file and produces incremental updates.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    file_name: Option<OsString>,
    manager: ConfigManager,
    current: ConfigSnapshot,
}

impl ConfigWatcher {
    /// Starts watching the manager's file.
    ///
    /// `current` is the snapshot the engine was built from; the first
    /// reported change is diffed against it.
    pub fn new(manager: ConfigManager, current: ConfigSnapshot) -> Result<Self, ConfigError> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )
        .map_err(|e| ConfigError::WatchFailed(e.to_string()))?;

        let dir = match manager.path().parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::WatchFailed(e.to_string()))?;

        debug!(path = %manager.path().display(), dir = %dir.display(), "watching config file");

        Ok(Self {
            _watcher: watcher,
            rx,
            file_name: manager.path().file_name().map(OsString::from),
            manager,
            current,
        })
    }

    /// Last snapshot that loaded successfully.
    pub fn current(&self) -> &ConfigSnapshot {
        &self.current
    }

    /// Drains pending file events (non-blocking).
    ///
    /// Returns true if any of them changed the config file.
    pub fn file_changed(&self) -> Result<bool, ConfigError> {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(Ok(event)) => changed |= self.is_config_change(&event),
                Ok(Err(e)) => warn!(error = %e, "config watch error"),
                Err(TryRecvError::Empty) => return Ok(changed),
                Err(TryRecvError::Disconnected) => return Err(ConfigError::WatcherStopped),
            }
        }
    }

    /// Reloads if the file changed since the last call.
    pub fn check_for_changes(&mut self) -> Result<Vec<ConfigMessage>, ConfigError> {
        if self.file_changed()? {
            self.reload()
        } else {
            Ok(Vec::new())
        }
    }

    /// Blocks until the file changes or `timeout` passes, then reloads.
    ///
    /// An empty vector means nothing changed in time (or the edit did not
    /// touch any setting or binding).
    ///
    /// # Errors
    ///
    /// `ConfigError::WatcherStopped` once the underlying watcher is gone;
    /// callers looping on this should stop.
    pub fn wait_for_changes(&mut self, timeout: Duration) -> Result<Vec<ConfigMessage>, ConfigError> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(Ok(event)) if self.is_config_change(&event) => {
                    // Editors tend to emit several events per save
                    self.file_changed()?;
                    return self.reload();
                }
                // Siblings in the same directory
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(ConfigError::WatchFailed(e.to_string())),
                Err(RecvTimeoutError::Timeout) => return Ok(Vec::new()),
                Err(RecvTimeoutError::Disconnected) => return Err(ConfigError::WatcherStopped),
            }
        }
    }

    /// Reads the file and returns what differs from the current snapshot.
    ///
    /// On error the current snapshot is kept.
    pub fn reload(&mut self) -> Result<Vec<ConfigMessage>, ConfigError> {
        let loaded = self.manager.load()?;
        let messages = self.current.diff(&loaded.snapshot);
        self.current = loaded.snapshot;

        debug!(changes = messages.len(), "config reloaded");
        Ok(messages)
    }

    /// Checks for changes and queues them on an engine's config handle.
    ///
    /// Returns the number of messages sent.
    pub fn forward(&mut self, handle: &ConfigHandle) -> Result<usize, ConfigError> {
        let messages = self.check_for_changes()?;
        let count = messages.len();
        for message in messages {
            handle.send(message)?;
        }
        Ok(count)
    }

    fn is_config_change(&self, event: &Event) -> bool {
        // Renames show up as Modify(Name(..)) on the new path
        matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
            && event
                .paths
                .iter()
                .any(|path| path.file_name() == self.file_name.as_deref())
    }
}
