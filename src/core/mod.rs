//! Local store gateway and identity resolution.
//!
//! One module per entity family, each exposing natural-key lookups,
//! `*_exists` checks and insert-if-absent writes (single and bulk). All
//! functions take any `ConnectionTrait`, so they work on a connection or
//! inside a transaction.

/// Actions, action details and per-computer action results
pub mod action;

/// Analyses, their properties and per-computer property values
pub mod analysis;

/// Baselines and the computers they are relevant on
pub mod baseline;

/// Computers
pub mod computer;

/// Insert outcomes and the conditional insert shared by every entity
pub mod gateway;

/// Computer groups and their members
pub mod group;

/// Remote identity to store id resolution
pub mod resolver;

/// Sites
pub mod site;

pub use gateway::{BulkMode, BulkOutcome, InsertOutcome};
