//! Per-kind operations over a document
//!
//! Free functions taking `&mut Document`, grouped by the entity family they
//! operate on. Multi-step operations run inside a transaction and roll the
//! whole transaction back if any step fails, so partial application is
//! never observable.

pub mod model_ops;
pub mod partition_ops;
pub mod role_ops;

use crate::document::Document;
use crate::errors::Result;

/// Run `f` inside a transaction labelled `label`
///
/// Commits on success. On failure the outermost caller rolls the open
/// transaction back (nothing of it stays applied or redoable); nested
/// callers just close their level and let the error propagate outward.
pub(crate) fn with_update<T>(
    doc: &mut Document,
    label: &str,
    f: impl FnOnce(&mut Document) -> Result<T>,
) -> Result<T> {
    let token = doc.begin_update(label);
    match f(doc) {
        Ok(value) => {
            doc.end_update(token)?;
            Ok(value)
        }
        Err(e) => {
            if token.depth == 1 {
                let _ = doc.rollback_current_transaction();
            } else {
                let _ = doc.end_update(token);
            }
            Err(e)
        }
    }
}
