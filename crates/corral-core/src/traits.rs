// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The connection-handle collaborator trait.
//!
//! Corral does not open, close, or drive database connections itself. It
//! serializes access to a handle supplied by the caller, consumed through
//! this narrow interface. A production implementation wraps a real
//! connection (e.g. a SQLite binding); tests use a scripted double.

/// A single stateful connection that must never be touched by more than one
/// execution context at a time.
///
/// All methods are cheap signaling or query primitives. Mutating statement
/// execution happens in caller-supplied closures that receive `&Self`; the
/// gate guarantees those closures run one at a time.
///
/// `interrupt`, `suspend`, `resume`, `cancel`, and `uncancel` must be safe to
/// call from *any* thread at any moment, concurrently with an in-progress
/// operation — they exist to break one.
pub trait DatabaseHandle: Send + Sync + 'static {
    /// Closes the connection. Called exactly once, at gate teardown, from a
    /// context entitled to the handle. Implementations report their own
    /// failures (e.g. via logging); teardown cannot propagate them.
    fn close(&self);

    /// Returns `true` while a transaction is open on this connection.
    fn is_inside_transaction(&self) -> bool;

    /// Asks the in-progress operation, if any, to abort cooperatively.
    fn interrupt(&self);

    /// Suspends the connection (e.g. ahead of process backgrounding).
    fn suspend(&self);

    /// Resumes a suspended connection.
    fn resume(&self);

    /// Marks the current access as cancelled and interrupts it. Unlike
    /// [`interrupt`](Self::interrupt) alone, the cancelled mark outlives a
    /// single statement, so a multi-statement access cannot resume after the
    /// interrupt lands.
    fn cancel(&self);

    /// Clears a previous [`cancel`](Self::cancel) so the connection is
    /// usable by the next, unrelated access.
    fn uncancel(&self);

    /// A short identifier for diagnostics (typically the database path).
    fn description(&self) -> String;
}

// Shared ownership of a handle is itself a handle: every method delegates to
// the inner value. This lets callers (e.g. tests) retain an `Arc` clone to
// observe a handle that a gate otherwise owns. The impl lives here, with the
// trait, because the orphan rule forbids it in downstream crates.
impl<T: DatabaseHandle + ?Sized> DatabaseHandle for std::sync::Arc<T> {
    fn close(&self) {
        (**self).close();
    }

    fn is_inside_transaction(&self) -> bool {
        (**self).is_inside_transaction()
    }

    fn interrupt(&self) {
        (**self).interrupt();
    }

    fn suspend(&self) {
        (**self).suspend();
    }

    fn resume(&self) {
        (**self).resume();
    }

    fn cancel(&self) {
        (**self).cancel();
    }

    fn uncancel(&self) {
        (**self).uncancel();
    }

    fn description(&self) -> String {
        (**self).description()
    }
}
