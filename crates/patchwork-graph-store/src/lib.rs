//! In-memory graph store for Patchwork
//!
//! This crate provides the in-memory implementation of the [`GraphStore`]
//! trait defined in patchwork-core. Several independent producers (a router
//! inspector, a component registry, ...) push snapshots of what they see; the
//! store keeps one consistent, versioned view of all of them and publishes
//! every change as a [`GraphEvent`].
//!
//! [`GraphStore`]: patchwork_core::GraphStore
//! [`GraphEvent`]: patchwork_core::GraphEvent

pub mod store;
pub use store::InMemoryGraphStore;

mod ownership;
