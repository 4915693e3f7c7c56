//! Shared versioned store integration tests.
//!
//! Tests the VersionedStore interface against any implementation.
//! Each implementation module builds a `Stores` and runs these tests.

pub mod versioned_store_tests;
