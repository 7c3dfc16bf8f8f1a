//! Record model for the reconciliation core.
//!
//! Defines the static description of an editable record type:
//! - [`FieldSchema`]: the ordered set of [`FieldDescriptor`]s; the sole
//!   authority on which keys may be accepted from, or sent to, the server
//! - [`FieldAccess`]: the three-way answer to "may this key be written?"
//! - [`RecordFormat`]: how a record type is located, labelled and edited
//!   (selection key, primary key, built-in flag, option-backed field)
//!
//! Formats deserialize from JSON so an embedding application can ship them
//! as configuration.

mod error;
mod format;
mod schema;

pub use error::{ModelError, ModelResult};
pub use format::RecordFormat;
pub use schema::{FieldAccess, FieldDescriptor, FieldSchema, Projection};
