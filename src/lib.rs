//! Text-preserving editor for YAML workflow documents.
//!
//! The document text is the only source of truth. [`edit`] rewrites it one
//! command at a time, [`graph`] rebuilds the visual tree from it, and
//! [`refactor`] lifts chains of nodes into their own workflows.

pub mod document;
pub mod dsl;
pub mod edit;
pub mod error;
pub mod graph;
pub mod loader;
pub mod refactor;
pub mod schema;
