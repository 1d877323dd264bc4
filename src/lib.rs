//! Loadstone is a sorting engine for the load orders of games built on the
//! esp/esm plugin system.
//!
//! Callers describe their installed plugins ([*Plugin*][crate::plugin::Plugin]),
//! feed in masterlist and userlist metadata
//! ([*MetadataDb*][crate::metadata::plugin::MetadataDb]), and get back a load
//! order that honours master flags, explicit dependencies, priorities and
//! record overlap, in that order of authority. Metadata entries can be gated
//! behind conditions written in a small expression language, evaluated
//! against the game's data directory.

pub mod condition;
pub mod env;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod plugin;
pub mod prelude;
pub mod sorter;
pub mod version;
