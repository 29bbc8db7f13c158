//! Tabwrap metadata tree - the engine-owned hierarchical model
//!
//! This crate plays the role of the external metadata library that the
//! wrapper layer mirrors. It provides:
//! - Node construction by kind, with arena-issued identities
//! - Read/write of engine-defined fields, validated per kind
//! - Owned child lists and non-owning node references
//! - A serialize/deserialize pair producing opaque snapshot blobs keyed by
//!   a compatibility level
//!
//! Deserializing a snapshot always allocates fresh node identities for the
//! whole restored subtree. Consumers that index nodes by identity must
//! re-bind after a restore.

pub mod errors;
pub mod node;
pub mod snapshot;
pub mod tree;

pub use errors::{Result, TreeError};
pub use node::{ChildSlot, Field, FieldValue, Node, NodeId, NodeKind};
pub use tree::MetadataTree;
