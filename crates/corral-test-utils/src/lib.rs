// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Corral integration tests.
//!
//! Provides a scripted connection-handle double for fast, deterministic,
//! CI-runnable tests without a real database.
//!
//! # Components
//!
//! - [`MockHandle`] - Mock connection handle with signaling capture and
//!   controllable transaction state

pub mod mock_handle;

pub use mock_handle::MockHandle;
