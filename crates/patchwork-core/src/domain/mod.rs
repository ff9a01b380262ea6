//! Domain models for Patchwork
//!
//! This module contains the identifiers and data model shared by the graph
//! store, the override store and the workspace edit engine.

/// Branded string identifiers
pub mod ids;

/// Structural graph of routes, component types and live instances
pub mod graph;

/// Per-instance property overrides
pub mod overrides;

/// File edits applied by the workspace edit engine
pub mod edits;

/// Store and collaborator traits
pub mod repository;
