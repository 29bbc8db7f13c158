//! Domain rules
//!
//! - `capabilities`: browsable/editable predicate tables per object kind
//! - `deletion`: structural preconditions checked before a delete
//! - `invariants`: whole-document consistency checks

pub mod capabilities;
pub mod deletion;
pub mod invariants;
