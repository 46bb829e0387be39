// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Corral workspace.

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identity of one serialized connection in entitlement records.
///
/// Region ids are process-unique and never reused. They identify the
/// *connection*, not the thread currently entitled to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(u64);

impl RegionId {
    /// Allocates a fresh, process-unique region id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RegionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "region-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_never_repeats() {
        let ids: Vec<RegionId> = (0..100).map(|_| RegionId::next()).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn display_is_stable() {
        let id = RegionId(7);
        assert_eq!(id.to_string(), "region-7");
    }
}
