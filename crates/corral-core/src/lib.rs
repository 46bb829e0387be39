// SPDX-FileCopyrightText: 2026 Corral Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Corral serialized-access substrate.
//!
//! This crate provides the foundational trait definition, error type, and
//! common types used throughout the Corral workspace. Connection-handle
//! implementations (SQLite bindings, test doubles) implement the
//! [`DatabaseHandle`] trait defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CorralError;
pub use traits::DatabaseHandle;
pub use types::RegionId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corral_error_has_all_variants() {
        // Verify all 5 error variants exist and can be constructed.
        let _cancelled = CorralError::Cancelled {
            context: "test".into(),
        };
        let _database = CorralError::Database {
            source: Box::new(std::io::Error::other("test")),
        };
        let _config = CorralError::Config("test".into());
        let _worker = CorralError::Worker {
            label: "test".into(),
            source: std::io::Error::other("test"),
        };
        let _internal = CorralError::Internal("test".into());
    }

    #[test]
    fn region_ids_are_unique_and_ordered_per_process() {
        let a = RegionId::next();
        let b = RegionId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn database_handle_trait_is_object_safe() {
        // If DatabaseHandle loses object safety, this won't compile.
        fn _assert(_: &dyn DatabaseHandle) {}
    }
}
