// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialized, cancellation-aware access to single-owner database connections.
//!
//! A database connection is unsafe to use from more than one execution
//! context concurrently. Corral wraps one connection handle behind a
//! [`SerializedGate`]: a dedicated single-worker thread per connection, a
//! per-thread entitlement watchdog that tells legitimate nested access apart
//! from illegal reentrant or cross-thread access, and a single-use
//! cancellation bridge that lets async callers abandon an in-flight access
//! without corrupting connection state.
//!
//! ```no_run
//! use corral::{AccessConfig, DatabaseHandle, SerializedGate};
//! # struct Stub;
//! # impl corral_core::DatabaseHandle for Stub {
//! #     fn close(&self) {}
//! #     fn is_inside_transaction(&self) -> bool { false }
//! #     fn interrupt(&self) {}
//! #     fn suspend(&self) {}
//! #     fn resume(&self) {}
//! #     fn cancel(&self) {}
//! #     fn uncancel(&self) {}
//! #     fn description(&self) -> String { "stub".into() }
//! # }
//! # fn open_handle() -> Stub { Stub }
//!
//! # fn main() -> Result<(), corral_core::CorralError> {
//! let gate = SerializedGate::new(open_handle(), AccessConfig::default())?;
//! let count = gate.sync(|db| {
//!     // exclusive access to the connection, on the gate's worker
//!     let _ = db.is_inside_transaction();
//!     42
//! });
//! assert_eq!(count, 42);
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod gate;
pub mod watchdog;
pub mod worker;

// Re-export key items at crate root for ergonomic imports.
pub use bridge::AccessBridge;
pub use config::{AccessConfig, ThreadingMode};
pub use gate::SerializedGate;
pub use worker::Worker;

pub use corral_core::{CorralError, DatabaseHandle, RegionId};
