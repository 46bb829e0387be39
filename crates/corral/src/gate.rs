// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The serialized access gate: one connection handle, one dedicated worker.
//!
//! All mutation of the connection happens either on the gate's worker or on
//! a thread the watchdog has marked as entitled to it — never both at once.
//! Synchronous entry points block the calling thread until the worker
//! finishes; `spawn` returns immediately; `execute_cancellable` suspends the
//! calling task and is the only cancellable path.
//!
//! Entitlement violations and leaked transactions are programming mistakes
//! and fail loudly: panics raised on the worker are relayed to the blocked
//! caller, so the worker itself survives for the next access.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use corral_core::{CorralError, DatabaseHandle, RegionId};

use crate::bridge::AccessBridge;
use crate::config::AccessConfig;
use crate::watchdog::{self, Allowances};
use crate::worker::Worker;

/// Serializes every access to one connection handle.
///
/// The gate owns the handle exclusively: no other component may hold a
/// strong reference that outlives it. Callers reach the connection only
/// through the entry points below, each of which classifies the call via the
/// watchdog before touching the handle.
pub struct SerializedGate<H: DatabaseHandle> {
    handle: Arc<H>,
    region: RegionId,
    worker: Worker,
    label: String,
    config: AccessConfig,
    /// Call-scoped override for the leaked-transaction check. Set only by
    /// the `*_allowing_unsafe_transactions` entry points while their call is
    /// in flight.
    allows_unsafe_transactions: Arc<AtomicBool>,
}

impl<H: DatabaseHandle> SerializedGate<H> {
    /// Wraps an already-open connection handle behind a new gate.
    pub fn new(handle: H, config: AccessConfig) -> Result<Self, CorralError> {
        config.validate()?;
        let handle = Arc::new(handle);
        let label = config.worker_label(&handle.description());
        let worker = config.make_worker(&label)?;
        debug!(label = %label, "serialized gate created");
        Ok(Self {
            handle,
            region: RegionId::next(),
            worker,
            label,
            config,
            allows_unsafe_transactions: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The diagnostics label of this gate's worker.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The entitlement region identifying this gate's connection.
    pub fn region(&self) -> RegionId {
        self.region
    }

    /// The access policy this gate was created with.
    pub fn configuration(&self) -> &AccessConfig {
        &self.config
    }

    /// Runs `body` with the connection handle and returns its result.
    ///
    /// Not reentrant: calling it again, directly or indirectly, from within
    /// an already-running access on the *same* gate panics — dispatching
    /// would deadlock the single worker, so the mistake is reported loudly
    /// instead. A nested call from *another* gate's access is legal: the
    /// caller's entitlements are inherited for the duration of the dispatch,
    /// so a chain A→B→A can be completed with [`reentrant_sync`].
    ///
    /// On exit, panics if `body` left a transaction open, unless the
    /// configuration or a call-scoped override tolerates it.
    ///
    /// [`reentrant_sync`]: Self::reentrant_sync
    pub fn sync<T, F>(&self, body: F) -> T
    where
        F: FnOnce(&H) -> T + Send + 'static,
        T: Send + 'static,
    {
        if watchdog::current_allows(self.region) {
            panic!(
                "serialized access to {} is not reentrant; \
                 use reentrant_sync for chain-aware nesting",
                self.label
            );
        }
        self.dispatch_and_wait(body)
    }

    /// Like [`sync`](Self::sync), with the leaked-transaction check
    /// suppressed for this one call.
    pub fn sync_allowing_unsafe_transactions<T, F>(&self, body: F) -> T
    where
        F: FnOnce(&H) -> T + Send + 'static,
        T: Send + 'static,
    {
        let _override = UnsafeTransactionOverride::set(&self.allows_unsafe_transactions);
        self.sync(body)
    }

    /// Runs `body` with the connection handle, permitting nested calls.
    ///
    /// When the current thread is already entitled to this connection — it
    /// is inside a running access on this gate, or inside a chain that
    /// inherited its entitlement — `body` runs inline. Otherwise this
    /// behaves exactly like [`sync`](Self::sync).
    ///
    /// A nested call entered while a transaction is already open skips the
    /// exit-time leak check; the outermost call remains responsible for it.
    pub fn reentrant_sync<T, F>(&self, body: F) -> T
    where
        F: FnOnce(&H) -> T + Send + 'static,
        T: Send + 'static,
    {
        if watchdog::current_allows(self.region) {
            let was_inside = self.handle.is_inside_transaction();
            let value = body(&self.handle);
            if !was_inside {
                self.leak_check().enforce(&*self.handle);
            }
            value
        } else {
            self.dispatch_and_wait(body)
        }
    }

    /// Dispatches `body` onto the worker and returns immediately.
    ///
    /// The body runs later, in submission order relative to every other
    /// access queued on this gate, and is subject to the same exit-time
    /// leak check. No caller thread can observe a contract violation on
    /// this path, so one terminates the process instead of panicking.
    pub fn spawn<F>(&self, body: F)
    where
        F: FnOnce(&H) + Send + 'static,
    {
        let handle = Arc::clone(&self.handle);
        let region = self.region;
        let leak_check = self.leak_check();
        self.worker.submit(Box::new(move || {
            watchdog::entitled(region, &Allowances::none(), || {
                body(&handle);
                leak_check.enforce(&*handle);
            });
        }));
    }

    /// Runs `body` inline with the connection handle.
    ///
    /// Requires the current thread to already hold entitlement for this
    /// connection — code that is itself running inside one of the gate's
    /// accesses. Panics otherwise.
    pub fn execute<T, F>(&self, body: F) -> T
    where
        F: FnOnce(&H) -> T,
    {
        watchdog::precondition_entitled(self.region, &self.label);
        body(&self.handle)
    }

    /// Dispatches `body` onto the worker and suspends until it finishes, or
    /// until `token` is cancelled.
    ///
    /// Cancellation before the body starts yields a cancellation error
    /// without running it. Cancellation after the body starts interrupts
    /// the connection; once the body observes the interrupt and returns,
    /// the interrupt is reversed so the handle stays usable, and the call
    /// still yields a cancellation error. Dropping the returned future
    /// cancels the same way.
    ///
    /// Errors returned by `body` propagate unchanged; cancellation
    /// surfaces as [`CorralError::Cancelled`].
    pub async fn execute_cancellable<T, F>(
        &self,
        token: &CancellationToken,
        body: F,
    ) -> Result<T, CorralError>
    where
        F: FnOnce(&H) -> Result<T, CorralError> + Send + 'static,
        T: Send + 'static,
    {
        let bridge = Arc::new(AccessBridge::new(self.label.clone()));
        if token.is_cancelled() {
            bridge.cancel();
            return Err(CorralError::cancelled(self.label.clone()));
        }

        let (tx, mut rx) = tokio::sync::oneshot::channel();
        {
            let bridge = Arc::clone(&bridge);
            let handle = Arc::clone(&self.handle);
            let region = self.region;
            let leak_check = self.leak_check();
            self.worker.submit(Box::new(move || {
                let result = watchdog::entitled(region, &Allowances::none(), || {
                    let result = bridge.in_database(&handle, body);
                    // A cancelled body may have been interrupted mid-statement;
                    // the next caller's own exit check still guards the invariant.
                    if !matches!(&result, Err(e) if e.is_cancelled()) {
                        leak_check.enforce(&*handle);
                    }
                    result
                });
                let _ = tx.send(result);
            }));
        }

        let guard = CancelOnDrop {
            bridge: Some(Arc::clone(&bridge)),
        };
        let result = tokio::select! {
            delivered = &mut rx => Self::delivered(delivered, &self.label),
            _ = token.cancelled() => {
                bridge.cancel();
                // The worker still expires the bridge and reverses the
                // interrupt before resuming us; wait for that to finish.
                Self::delivered(rx.await, &self.label)
            }
        };
        let _ = guard.disarm();
        result
    }

    fn delivered<T>(
        delivered: Result<Result<T, CorralError>, tokio::sync::oneshot::error::RecvError>,
        label: &str,
    ) -> Result<T, CorralError> {
        delivered.unwrap_or_else(|_| {
            Err(CorralError::Internal(format!(
                "worker for {label} dropped an access result"
            )))
        })
    }

    /// Asks the in-progress operation, if any, to abort cooperatively.
    ///
    /// Forwarded straight to the handle, bypassing the worker: this must be
    /// callable from any context at any time, specifically to break a stuck
    /// operation.
    pub fn interrupt(&self) {
        self.handle.interrupt();
    }

    /// Suspends the connection. Bypasses the worker, like
    /// [`interrupt`](Self::interrupt).
    pub fn suspend(&self) {
        self.handle.suspend();
    }

    /// Resumes a suspended connection. Bypasses the worker.
    pub fn resume(&self) {
        self.handle.resume();
    }

    fn leak_check(&self) -> LeakCheck {
        LeakCheck {
            label: self.label.clone(),
            config_allows: self.config.allows_unsafe_transactions,
            call_override: Arc::clone(&self.allows_unsafe_transactions),
        }
    }

    fn dispatch_and_wait<T, F>(&self, body: F) -> T
    where
        F: FnOnce(&H) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<std::thread::Result<T>>(1);
        let handle = Arc::clone(&self.handle);
        let region = self.region;
        let inherited = watchdog::allowances();
        let leak_check = self.leak_check();
        self.worker.submit(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                watchdog::entitled(region, &inherited, || {
                    let value = body(&handle);
                    leak_check.enforce(&*handle);
                    value
                })
            }));
            let _ = tx.send(outcome);
        }));
        match rx.recv() {
            Ok(Ok(value)) => value,
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => panic!(
                "worker for {} terminated before delivering a result",
                self.label
            ),
        }
    }
}

impl<H: DatabaseHandle> Drop for SerializedGate<H> {
    /// Closes the handle before releasing it, then drains the worker.
    ///
    /// Tolerates reentrancy: a gate may be dropped from its own worker
    /// thread (a connection closing itself), in which case the handle is
    /// closed inline and the worker thread is left to wind down on its own.
    fn drop(&mut self) {
        debug!(label = %self.label, "closing serialized gate");
        if watchdog::current_allows(self.region) {
            self.handle.close();
        } else {
            let (tx, rx) = mpsc::sync_channel(1);
            let handle = Arc::clone(&self.handle);
            let region = self.region;
            self.worker.submit(Box::new(move || {
                watchdog::entitled(region, &Allowances::none(), || handle.close());
                let _ = tx.send(());
            }));
            let _ = rx.recv();
        }
        self.worker.shutdown();
    }
}

/// Exit-time guard against accesses that leave a transaction open.
struct LeakCheck {
    label: String,
    config_allows: bool,
    call_override: Arc<AtomicBool>,
}

impl LeakCheck {
    fn enforce(&self, handle: &impl DatabaseHandle) {
        if handle.is_inside_transaction()
            && !self.config_allows
            && !self.call_override.load(Ordering::SeqCst)
        {
            panic!(
                "a transaction was left open at the end of a database access \
                 on {}; end it before returning, or allow unsafe transactions",
                self.label
            );
        }
    }
}

struct UnsafeTransactionOverride<'a> {
    flag: &'a AtomicBool,
    previous: bool,
}

impl<'a> UnsafeTransactionOverride<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        let previous = flag.swap(true, Ordering::SeqCst);
        Self { flag, previous }
    }
}

impl Drop for UnsafeTransactionOverride<'_> {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::SeqCst);
    }
}

struct CancelOnDrop<H: DatabaseHandle> {
    bridge: Option<Arc<AccessBridge<H>>>,
}

impl<H: DatabaseHandle> CancelOnDrop<H> {
    fn disarm(mut self) -> Option<Arc<AccessBridge<H>>> {
        self.bridge.take()
    }
}

impl<H: DatabaseHandle> Drop for CancelOnDrop<H> {
    fn drop(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            bridge.cancel();
        }
    }
}
