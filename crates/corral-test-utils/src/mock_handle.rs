// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock connection handle for deterministic testing.
//!
//! `MockHandle` implements `DatabaseHandle` with in-memory state: every
//! signaling call is recorded in order, transaction state is toggled by the
//! test body, and cooperative waits let cancellation tests block "inside a
//! statement" until the interrupt lands.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use corral_core::DatabaseHandle;

/// A mock connection handle that records every signaling call.
pub struct MockHandle {
    description: String,
    inside_transaction: AtomicBool,
    cancel_requested: AtomicBool,
    suspended: AtomicBool,
    closed: AtomicBool,
    interrupt_count: AtomicUsize,
    events: Mutex<Vec<String>>,
    signal: Condvar,
}

impl MockHandle {
    /// Creates a mock handle with the given description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            inside_transaction: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            interrupt_count: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
            signal: Condvar::new(),
        }
    }

    fn record(&self, event: &str) {
        let mut events = self.events.lock().unwrap();
        events.push(event.to_string());
        self.signal.notify_all();
    }

    /// Marks a transaction as open, as a test body's `BEGIN` would.
    pub fn begin_transaction(&self) {
        self.inside_transaction.store(true, Ordering::SeqCst);
        self.record("begin");
    }

    /// Marks the open transaction as finished, as `COMMIT`/`ROLLBACK` would.
    pub fn end_transaction(&self) {
        self.inside_transaction.store(false, Ordering::SeqCst);
        self.record("end");
    }

    /// Blocks, as a long-running statement would, until this handle is
    /// cancelled or `timeout` elapses. Returns `true` if the cancel arrived.
    pub fn wait_until_cancelled(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut events = self.events.lock().unwrap();
        loop {
            if self.cancel_requested.load(Ordering::SeqCst) {
                return true;
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.signal.wait_timeout(events, deadline - now).unwrap();
            events = guard;
        }
    }

    /// Number of times the connection was interrupted (directly or through
    /// a cancel).
    pub fn interrupt_count(&self) -> usize {
        self.interrupt_count.load(Ordering::SeqCst)
    }

    /// Whether a cancel is currently pending (set by `cancel`, cleared by
    /// `uncancel`).
    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Whether the connection is currently suspended.
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The signaling calls recorded so far, in order.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl DatabaseHandle for MockHandle {
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.record("close");
    }

    fn is_inside_transaction(&self) -> bool {
        self.inside_transaction.load(Ordering::SeqCst)
    }

    fn interrupt(&self) {
        self.interrupt_count.fetch_add(1, Ordering::SeqCst);
        self.record("interrupt");
    }

    fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
        self.record("suspend");
    }

    fn resume(&self) {
        self.suspended.store(false, Ordering::SeqCst);
        self.record("resume");
    }

    fn cancel(&self) {
        self.interrupt_count.fetch_add(1, Ordering::SeqCst);
        self.cancel_requested.store(true, Ordering::SeqCst);
        self.record("cancel");
    }

    fn uncancel(&self) {
        self.cancel_requested.store(false, Ordering::SeqCst);
        self.record("uncancel");
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

// Gates take ownership of their handle. Tests that need to observe the handle
// from outside the gate hand it an `Arc<MockHandle>` and keep a clone; the
// blanket `DatabaseHandle` impl for `Arc<T>` in `corral-core` makes that work.

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn records_signaling_in_order() {
        let handle = MockHandle::new("events.db");
        handle.begin_transaction();
        handle.interrupt();
        handle.end_transaction();
        handle.close();
        assert_eq!(handle.events(), ["begin", "interrupt", "end", "close"]);
    }

    #[test]
    fn cancel_interrupts_and_uncancel_clears() {
        let handle = MockHandle::new("cancel.db");
        handle.cancel();
        assert!(handle.cancel_requested());
        assert_eq!(handle.interrupt_count(), 1);
        handle.uncancel();
        assert!(!handle.cancel_requested());
        assert_eq!(handle.interrupt_count(), 1);
    }

    #[test]
    fn transaction_state_is_observable() {
        let handle = MockHandle::new("tx.db");
        assert!(!handle.is_inside_transaction());
        handle.begin_transaction();
        assert!(handle.is_inside_transaction());
        handle.end_transaction();
        assert!(!handle.is_inside_transaction());
    }

    #[test]
    fn wait_until_cancelled_times_out() {
        let handle = MockHandle::new("wait.db");
        assert!(!handle.wait_until_cancelled(Duration::from_millis(10)));
    }

    #[test]
    fn wait_until_cancelled_wakes_on_cancel() {
        let handle = Arc::new(MockHandle::new("wake.db"));
        let waiter = Arc::clone(&handle);
        let join = std::thread::spawn(move || {
            waiter.wait_until_cancelled(Duration::from_secs(5))
        });
        std::thread::sleep(Duration::from_millis(20));
        handle.cancel();
        assert!(join.join().unwrap());
    }

    #[test]
    fn suspend_and_resume_toggle() {
        let handle = MockHandle::new("suspend.db");
        handle.suspend();
        assert!(handle.is_suspended());
        handle.resume();
        assert!(!handle.is_suspended());
    }
}
