// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model for serialized connection access.
//!
//! The struct uses `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at load time, and is the factory for the dedicated worker
//! context each gate owns.

use serde::{Deserialize, Serialize};

use corral_core::CorralError;

use crate::worker::Worker;

/// How access to one connection is scheduled.
///
/// Only exclusive-per-connection scheduling exists: every connection gets
/// its own dedicated worker. The variant is spelled out so configs state the
/// mode explicitly and so loaders reject anything else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadingMode {
    /// One dedicated worker thread per connection.
    #[default]
    Exclusive,
}

/// Access policy for one serialized connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// Scheduling mode. Forced to exclusive-per-connection.
    #[serde(default)]
    pub threading_mode: ThreadingMode,

    /// Whether this connection serves reads only. Selects reader-vs-writer
    /// worker provisioning (thread labels, diagnostics).
    #[serde(default)]
    pub read_only: bool,

    /// When `true`, accesses may leave a transaction open at exit without
    /// tripping the leaked-transaction check.
    #[serde(default)]
    pub allows_unsafe_transactions: bool,

    /// Root of worker thread labels, e.g. `corral` in `corral.writer(db)`.
    #[serde(default = "default_label_root")]
    pub label_root: String,
}

fn default_label_root() -> String {
    "corral".to_string()
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            threading_mode: ThreadingMode::Exclusive,
            read_only: false,
            allows_unsafe_transactions: false,
            label_root: default_label_root(),
        }
    }
}

impl AccessConfig {
    /// Validates semantic constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), CorralError> {
        if self.label_root.trim().is_empty() {
            return Err(CorralError::Config(
                "label_root must not be empty".to_string(),
            ));
        }
        if self.label_root.contains(char::is_whitespace) {
            return Err(CorralError::Config(format!(
                "label_root `{}` must not contain whitespace",
                self.label_root
            )));
        }
        Ok(())
    }

    /// Builds the worker label for a connection with the given description.
    pub fn worker_label(&self, description: &str) -> String {
        let role = if self.read_only { "reader" } else { "writer" };
        format!("{}.{role}({description})", self.label_root)
    }

    /// Produces the dedicated worker context for the given label.
    pub fn make_worker(&self, label: &str) -> Result<Worker, CorralError> {
        Worker::spawn(label)
    }
}
