pub mod object;
pub mod property;

pub use object::{CollectionSlot, ObjectId, ObjectKind, WrapperObject};
pub use property::{Property, Value};
