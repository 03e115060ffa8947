//! Error types for the vector store
//!
//! This module defines [`StoreError`], covering registry lookups, storage
//! growth, and client-token validation. Parsing and evaluation have their own
//! error types ([`crate::index::IndexError`], [`crate::expr::EvalError`]);
//! `StoreError` is what the store itself can produce.

use std::fmt;

/// Errors produced by [`VectorStore`](crate::store::VectorStore) operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Buffer growth failed; the vector is left in its prior state
    Allocation { requested: usize },

    /// `create` was given a name that is already bound
    NameConflict { name: String },

    /// Lookup by name found nothing in the current or global namespace
    NotFound { name: String },

    /// A `VectorId` refers to a vector that has since been destroyed
    NoLongerExists,

    /// A `ClientId` does not refer to a live client registration
    InvalidToken,

    /// An element of an append list did not parse as a number.
    /// The vector is rolled back to its pre-append length.
    BadElement { item: String },

    /// A write landed outside the vector's current length
    IndexOutOfBounds { index: usize, length: usize },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Allocation { requested } => {
                write!(f, "can't allocate {} elements", requested)
            }
            StoreError::NameConflict { name } => {
                write!(f, "a vector \"{}\" already exists", name)
            }
            StoreError::NotFound { name } => {
                write!(f, "can't find a vector \"{}\"", name)
            }
            StoreError::NoLongerExists => write!(f, "vector no longer exists"),
            StoreError::InvalidToken => write!(f, "invalid client token"),
            StoreError::BadElement { item } => {
                write!(f, "expected a number, got \"{}\"", item)
            }
            StoreError::IndexOutOfBounds { index, length } => {
                write!(
                    f,
                    "index {} is out of bounds for a vector of length {}",
                    index, length
                )
            }
        }
    }
}

impl std::error::Error for StoreError {}
