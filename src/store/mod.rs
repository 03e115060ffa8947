//! Vector storage, identity, and notification
//!
//! This module provides the data half of the crate:
//! - [`vector`]: the resizable `f64` array type
//! - [`registry`]: the [`VectorStore`] owning every named vector
//! - [`client`]: observer tokens and notification delivery
//! - [`errors`]: [`StoreError`]
//!
//! # Ownership Model
//!
//! The store exclusively owns vector identity (name → object) and each
//! vector exclusively owns its buffer. Observers hold generation-tagged
//! tokens, never references, so a destroyed vector invalidates its handles
//! instead of dangling.

pub mod client;
pub mod errors;
pub mod registry;
pub mod vector;

pub use client::{ClientId, NotifyKind, NotifyPolicy};
pub use errors::StoreError;
pub use registry::{VectorId, VectorStore};
pub use vector::{Vector, BASE_CAPACITY};
