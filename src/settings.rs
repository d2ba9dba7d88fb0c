//! Engine configuration
//!
//! Settings arrive as camelCase JSON; every field has a default so a partial
//! (or empty) object is valid. The await and record-mode tables can also be
//! derived from the host's keybinding table.

use crate::descriptor::{Descriptor, KeybindingEntry, RecordMode, WRAP};
use crate::error::Result;
use crate::sync::parse_await_spec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_QUEUE_SIZE: usize = 2;
pub const DEFAULT_HISTORY_CAPACITY: usize = 64;
pub const DEFAULT_AWAIT_TIMEOUT_MS: u64 = 300;
pub const DEFAULT_CLIPBOARD_POLL_MS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Capacity of the wrap queue, counting the running call; 0 is unbounded
    pub queue_size: usize,
    pub history_capacity: usize,
    pub await_timeout_ms: u64,
    pub clipboard_poll_ms: u64,
    /// Operation name -> await spec
    pub await_specs: HashMap<String, String>,
    /// Operation name -> forced record mode
    pub record_modes: HashMap<String, RecordMode>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            await_timeout_ms: DEFAULT_AWAIT_TIMEOUT_MS,
            clipboard_poll_ms: DEFAULT_CLIPBOARD_POLL_MS,
            await_specs: HashMap::new(),
            record_modes: HashMap::new(),
        }
    }
}

impl EngineSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replace the await and record-mode tables
    pub fn with_tables(mut self, tables: CommandTables) -> Self {
        self.await_specs = tables.await_specs;
        self.record_modes = tables.record_modes;
        self
    }

    pub fn await_timeout(&self) -> Duration {
        Duration::from_millis(self.await_timeout_ms)
    }

    pub fn clipboard_poll_interval(&self) -> Duration {
        Duration::from_millis(self.clipboard_poll_ms.max(1))
    }

    pub fn await_spec_for(&self, command: &str) -> Option<&str> {
        self.await_specs.get(command).map(String::as_str)
    }

    pub fn record_mode_for(&self, command: &str) -> Option<RecordMode> {
        self.record_modes.get(command).copied()
    }

    /// Fill a descriptor's missing await spec and record mode from the tables
    pub fn complete(&self, mut descriptor: Descriptor) -> Descriptor {
        if descriptor.await_spec.is_none() {
            descriptor.await_spec = self.await_spec_for(&descriptor.name).map(str::to_string);
        }
        if descriptor.record.is_none() {
            descriptor.record = self.record_mode_for(&descriptor.name);
        }
        descriptor
    }

    pub fn validate(&self) -> Vec<SettingsIssue> {
        let mut issues = Vec::new();
        if self.await_timeout_ms == 0 {
            issues.push(SettingsIssue::ZeroAwaitTimeout);
        }
        if self.history_capacity == 0 {
            issues.push(SettingsIssue::ZeroHistoryCapacity);
        }

        let mut commands: Vec<&String> = self.await_specs.keys().collect();
        commands.sort();
        for command in commands {
            let spec = &self.await_specs[command];
            if let Err(error) = parse_await_spec(spec) {
                issues.push(SettingsIssue::InvalidAwaitSpec {
                    command: command.clone(),
                    error: error.to_string(),
                });
            }
        }
        issues
    }
}

/// Static per-operation tables consumed by the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandTables {
    pub await_specs: HashMap<String, String>,
    pub record_modes: HashMap<String, RecordMode>,
}

impl CommandTables {
    /// Collect `await` / `record` from every wrap binding of the table
    pub fn from_keybindings(entries: &[KeybindingEntry]) -> Self {
        let mut tables = Self::default();
        for entry in entries.iter().filter(|entry| entry.command == WRAP) {
            let Some(args) = &entry.args else {
                continue;
            };
            let wrapped: Descriptor = match serde_json::from_value(args.clone()) {
                Ok(wrapped) => wrapped,
                Err(e) => {
                    tracing::warn!(
                        "[kb-macro] Ignoring wrap binding {:?} with malformed args: {}",
                        entry.key,
                        e
                    );
                    continue;
                }
            };
            if let Some(spec) = wrapped.await_spec {
                tables.await_specs.insert(wrapped.name.clone(), spec);
            }
            if let Some(record) = wrapped.record {
                tables.record_modes.insert(wrapped.name, record);
            }
        }
        tables
    }
}

/// Problem found in otherwise loadable settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsIssue {
    ZeroAwaitTimeout,
    ZeroHistoryCapacity,
    InvalidAwaitSpec { command: String, error: String },
}

impl fmt::Display for SettingsIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsIssue::ZeroAwaitTimeout => {
                write!(f, "awaitTimeoutMs is 0; every awaited operation will time out")
            }
            SettingsIssue::ZeroHistoryCapacity => {
                write!(f, "historyCapacity is 0; background recording keeps nothing")
            }
            SettingsIssue::InvalidAwaitSpec { command, error } => {
                write!(f, "await spec of '{}': {}", command, error)
            }
        }
    }
}
