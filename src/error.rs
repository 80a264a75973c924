//! Error taxonomy for table operations.

use thiserror::Error;

/// Errors returned by the fallible [`ChainMap`](crate::ChainMap) operations.
///
/// Absence on lookup is not an error (`get` returns `Option`); removal of an
/// absent key is. Null-handle and allocation-failure conditions of the
/// classical C-style surface have no variants here: the former is
/// unrepresentable in safe Rust and the latter aborts per the global
/// allocator contract.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// A table was requested at a capacity index past the end of the prime
    /// schedule.
    #[error("capacity index {index} is out of range for the capacity schedule")]
    CapacityIndexOutOfRange { index: usize },

    /// `remove` found no entry whose key matches exactly.
    #[error("no entry found for key")]
    KeyNotFound,
}
