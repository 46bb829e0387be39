// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-use cancellation bridge between a suspending async caller and a
//! unit of work dispatched on a gate's worker.
//!
//! The bridge is a four-state machine guarded by a mutex. The lock is held
//! only across state transitions, never across the caller's suspension.
//! Signaling the handle (`cancel`/`uncancel`) happens *inside* the
//! transition critical section: a canceller observing `Connected` must
//! interrupt before a concurrent exit can expire the bridge, otherwise the
//! exit's interrupt reversal could be overtaken and the connection left
//! poisoned for the next caller.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use corral_core::{CorralError, DatabaseHandle};

enum BridgeState<H> {
    /// Created; no work started.
    NotConnected,
    /// Work has begun; holds the connection for the duration of the call.
    Connected(Arc<H>),
    /// An external cancel arrived, before or during the call.
    Cancelled,
    /// The call finished. No further transitions are legal.
    Expired,
}

/// Connects one asynchronous access to one dispatched unit of work.
///
/// A bridge is single-use: it is created per call and entering
/// [`in_database`](Self::in_database) twice is a fatal contract violation.
pub struct AccessBridge<H> {
    state: Mutex<BridgeState<H>>,
    label: String,
}

impl<H: DatabaseHandle> AccessBridge<H> {
    /// Creates a bridge for one access on the connection labelled `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(BridgeState::NotConnected),
            label: label.into(),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BridgeState<H>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests cancellation. Idempotent; callable from any thread,
    /// concurrently with [`in_database`](Self::in_database).
    ///
    /// If work is already connected, the connection is interrupted through
    /// its own cancel primitive so a blocked statement unblocks. If work has
    /// not started yet, the eventual `in_database` call short-circuits.
    pub fn cancel(&self) {
        let mut state = self.lock_state();
        match &*state {
            BridgeState::NotConnected => {
                debug!(label = %self.label, "access cancelled before work started");
                *state = BridgeState::Cancelled;
            }
            BridgeState::Connected(handle) => {
                debug!(label = %self.label, "access cancelled mid-flight, interrupting");
                handle.cancel();
                *state = BridgeState::Cancelled;
            }
            BridgeState::Cancelled | BridgeState::Expired => {}
        }
    }

    /// Runs `work` as the bridge's single unit of work, on the gate's worker.
    ///
    /// Fails with a cancellation error, without running `work`, when a
    /// cancel arrived first. On every exit — success, error, cancellation,
    /// or unwind — the bridge expires; if a cancel landed while `work` ran,
    /// the interrupt is reversed so the connection stays usable for the next
    /// caller, and the result is replaced by a cancellation error.
    pub fn in_database<T>(
        &self,
        handle: &Arc<H>,
        work: impl FnOnce(&H) -> Result<T, CorralError>,
    ) -> Result<T, CorralError> {
        {
            let mut state = self.lock_state();
            match &*state {
                BridgeState::NotConnected => *state = BridgeState::Connected(Arc::clone(handle)),
                BridgeState::Cancelled => {
                    *state = BridgeState::Expired;
                    return Err(CorralError::cancelled(self.label.clone()));
                }
                BridgeState::Connected(_) | BridgeState::Expired => {
                    panic!(
                        "access bridge for {} used twice: a bridge carries exactly \
                         one unit of work",
                        self.label
                    );
                }
            }
        }

        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| work(handle)));

        let cancelled = {
            let mut state = self.lock_state();
            let cancelled = matches!(&*state, BridgeState::Cancelled);
            if cancelled {
                handle.uncancel();
            }
            *state = BridgeState::Expired;
            cancelled
        };

        match outcome {
            Err(panic) => std::panic::resume_unwind(panic),
            Ok(_) if cancelled => Err(CorralError::cancelled(self.label.clone())),
            Ok(result) => result,
        }
    }
}
