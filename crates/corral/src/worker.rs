// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dedicated single-worker execution context.
//!
//! One named OS thread per connection, draining a FIFO job queue. Jobs run
//! one at a time in submission order; nothing else ever runs on the thread.
//!
//! Jobs dispatched by a blocking entry point catch their own panics and
//! relay them to the waiting caller. A panic that escapes a job here has no
//! caller left to observe it, so the worker reports it and aborts the
//! process: the connection's state is indeterminate and every later access
//! would run against it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

use tracing::{debug, error};

use corral_core::CorralError;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// A dedicated worker thread with a FIFO job queue.
///
/// Created by [`AccessConfig::make_worker`](crate::AccessConfig::make_worker),
/// owned by exactly one gate, drained and joined at gate teardown.
pub struct Worker {
    tx: Option<mpsc::Sender<Job>>,
    thread: Option<thread::JoinHandle<()>>,
    label: String,
}

impl Worker {
    /// Spawns the worker thread under the given label.
    pub fn spawn(label: &str) -> Result<Self, CorralError> {
        let (tx, rx) = mpsc::channel::<Job>();
        let thread_label = label.to_string();
        let thread = thread::Builder::new()
            .name(label.to_string())
            .spawn(move || {
                debug!(worker = %thread_label, "worker thread started");
                while let Ok(job) = rx.recv() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!(
                            worker = %thread_label,
                            "panic escaped a fire-and-forget database access; aborting"
                        );
                        std::process::abort();
                    }
                }
                debug!(worker = %thread_label, "worker queue closed, thread exiting");
            })
            .map_err(|source| CorralError::Worker {
                label: label.to_string(),
                source,
            })?;
        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
            label: label.to_string(),
        })
    }

    /// The label this worker was provisioned under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns `true` when called from this worker's own thread.
    pub fn on_worker_thread(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|t| t.thread().id() == thread::current().id())
    }

    /// Enqueues a job. Jobs run in submission order, one at a time.
    pub(crate) fn submit(&self, job: Job) {
        let tx = self
            .tx
            .as_ref()
            .unwrap_or_else(|| panic!("worker `{}` is shut down", self.label));
        if tx.send(job).is_err() {
            panic!("worker `{}` terminated with jobs pending", self.label);
        }
    }

    /// Closes the queue and waits for pending jobs to drain.
    ///
    /// Joining is skipped when called from the worker's own thread — a gate
    /// being torn down from inside its own worker (a connection closing
    /// itself) must not wait on itself. The thread then exits on its own
    /// once the queue empties.
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() == thread::current().id() {
                debug!(worker = %self.label, "shutdown from own thread, detaching");
            } else {
                let _ = thread.join();
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
