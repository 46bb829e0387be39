// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-thread entitlement records for serialized connections.
//!
//! Every thread carries a stack of [`RegionId`] allowances naming the
//! connections it may touch directly. The stack is empty except inside an
//! [`entitled`] scope: a gate's worker enters one around each dispatched
//! job, pushing its own region plus any allowances inherited from the
//! dispatching thread. Entitlement is therefore monotonic within one call
//! chain and exactly scoped to it — the scope guard restores the previous
//! set on exit, including on unwind.
//!
//! The record is consulted by the gate's entry points to classify a call as
//! fresh (no entitlement — dispatch), reentrant (entitled to this region —
//! run inline or fail, depending on the entry point), or cross-connection
//! nested (entitled elsewhere — dispatch with inheritance).

use std::cell::RefCell;

use corral_core::RegionId;

thread_local! {
    static ALLOWANCES: RefCell<Vec<RegionId>> = const { RefCell::new(Vec::new()) };
}

/// A snapshot of one thread's entitlement set, captured at dispatch time and
/// replayed inside the receiving worker's [`entitled`] scope.
#[derive(Debug, Clone, Default)]
pub struct Allowances(Vec<RegionId>);

impl Allowances {
    /// An empty set, for dispatches that inherit nothing (fire-and-forget
    /// work has no surviving caller chain to inherit from).
    pub fn none() -> Self {
        Allowances(Vec::new())
    }

    /// Returns `true` if the snapshot grants access to `region`.
    pub fn contains(&self, region: RegionId) -> bool {
        self.0.contains(&region)
    }
}

/// Returns `true` if the current thread is entitled to touch `region`.
pub fn current_allows(region: RegionId) -> bool {
    ALLOWANCES.with(|a| a.borrow().contains(&region))
}

/// Captures the current thread's entitlement set for inheritance across one
/// dispatch.
pub fn allowances() -> Allowances {
    ALLOWANCES.with(|a| Allowances(a.borrow().clone()))
}

/// Runs `f` with the current thread entitled to `region` plus everything in
/// `inherited`. The previous entitlement set is restored when `f` returns or
/// unwinds.
pub fn entitled<T>(region: RegionId, inherited: &Allowances, f: impl FnOnce() -> T) -> T {
    let restore_len = ALLOWANCES.with(|a| {
        let mut stack = a.borrow_mut();
        let len = stack.len();
        if !stack.contains(&region) {
            stack.push(region);
        }
        for id in &inherited.0 {
            if !stack.contains(id) {
                stack.push(*id);
            }
        }
        len
    });
    let _guard = RestoreGuard { len: restore_len };
    f()
}

/// Fails fast when the current thread holds no entitlement for `region`.
///
/// This is a contract violation, not a runtime condition: the caller was
/// required to already be running inside the connection's serialized context.
pub fn precondition_entitled(region: RegionId, label: &str) {
    if !current_allows(region) {
        panic!(
            "illegal database access to {label}: the current thread holds no \
             entitlement for this connection ({region}); use sync or \
             reentrant_sync to enter its serialized context"
        );
    }
}

struct RestoreGuard {
    len: usize,
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        ALLOWANCES.with(|a| a.borrow_mut().truncate(self.len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_thread_allows_nothing() {
        let region = RegionId::next();
        assert!(!current_allows(region));
        assert!(!allowances().contains(region));
    }

    #[test]
    fn entitled_scope_grants_and_restores() {
        let region = RegionId::next();
        entitled(region, &Allowances::none(), || {
            assert!(current_allows(region));
        });
        assert!(!current_allows(region));
    }

    #[test]
    fn inherited_allowances_are_monotonic_within_a_chain() {
        let outer = RegionId::next();
        let inner = RegionId::next();
        entitled(outer, &Allowances::none(), || {
            let snapshot = allowances();
            entitled(inner, &snapshot, || {
                // The nested scope keeps the ancestor's entitlement.
                assert!(current_allows(outer));
                assert!(current_allows(inner));
            });
            assert!(current_allows(outer));
            assert!(!current_allows(inner));
        });
        assert!(!current_allows(outer));
        assert!(!current_allows(inner));
    }

    #[test]
    fn nested_scope_for_same_region_does_not_leak_on_exit() {
        let region = RegionId::next();
        entitled(region, &Allowances::none(), || {
            entitled(region, &Allowances::none(), || {
                assert!(current_allows(region));
            });
            // Still entitled: the inner scope must not strip the outer one.
            assert!(current_allows(region));
        });
        assert!(!current_allows(region));
    }

    #[test]
    fn scope_restores_on_unwind() {
        let region = RegionId::next();
        let result = std::panic::catch_unwind(|| {
            entitled(region, &Allowances::none(), || {
                panic!("body failed");
            })
        });
        assert!(result.is_err());
        assert!(!current_allows(region));
    }

    #[test]
    #[should_panic(expected = "holds no entitlement")]
    fn precondition_fails_without_entitlement() {
        precondition_entitled(RegionId::next(), "corral.writer(test)");
    }

    #[test]
    fn precondition_passes_inside_scope() {
        let region = RegionId::next();
        entitled(region, &Allowances::none(), || {
            precondition_entitled(region, "corral.writer(test)");
        });
    }
}
