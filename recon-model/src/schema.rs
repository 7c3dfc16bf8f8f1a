//! Field schema: which keys a record may carry and which are writable.

use recon_types::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ModelError, ModelResult};

/// Declares one key a record may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub key: String,
    /// Whether the server accepts changes to this field through the update call.
    #[serde(default)]
    pub mutable: bool,
}

impl FieldDescriptor {
    /// Shorthand for an editable field.
    pub fn mutable(key: &str) -> Self {
        Self {
            key: key.into(),
            mutable: true,
        }
    }

    /// Shorthand for a server-controlled field.
    pub fn immutable(key: &str) -> Self {
        Self {
            key: key.into(),
            mutable: false,
        }
    }
}

/// Result of looking a key up in a [`FieldSchema`].
///
/// Unknown keys are dropped from snapshots with a diagnostic; immutable keys
/// stay in the baseline but are never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    Mutable,
    Immutable,
    Unknown,
}

impl FieldAccess {
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn is_mutable(self) -> bool {
        matches!(self, Self::Mutable)
    }
}

/// The ordered set of field descriptors for a record type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldDescriptor>", into = "Vec<FieldDescriptor>")]
pub struct FieldSchema {
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl FieldSchema {
    /// Builds a schema, rejecting duplicate keys.
    pub fn new(fields: Vec<FieldDescriptor>) -> ModelResult<Self> {
        let mut index = HashMap::with_capacity(fields.len());
        for (pos, field) in fields.iter().enumerate() {
            if index.insert(field.key.clone(), pos).is_some() {
                return Err(ModelError::DuplicateField(field.key.clone()));
            }
        }
        Ok(Self { fields, index })
    }

    /// Looks up the descriptor for `key`.
    pub fn describe(&self, key: &str) -> Option<&FieldDescriptor> {
        self.index.get(key).map(|&pos| &self.fields[pos])
    }

    pub fn access(&self, key: &str) -> FieldAccess {
        match self.describe(key) {
            Some(field) if field.mutable => FieldAccess::Mutable,
            Some(_) => FieldAccess::Immutable,
            None => FieldAccess::Unknown,
        }
    }

    /// True only for known, mutable keys.
    pub fn is_mutable(&self, key: &str) -> bool {
        self.access(key).is_mutable()
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    pub fn mutable_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.mutable)
            .map(|f| f.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Restricts `record` to the keys this schema knows, in schema order.
    ///
    /// Keys the record carries that the schema does not declare are returned
    /// separately, in record order, so the caller can report them.
    pub fn project(&self, record: &Record) -> Projection {
        let known: Record = self
            .fields
            .iter()
            .filter_map(|f| record.get(&f.key).map(|v| (f.key.clone(), v.clone())))
            .collect();
        let unknown = record
            .keys()
            .filter(|k| !self.is_known(k))
            .cloned()
            .collect();
        Projection { known, unknown }
    }
}

impl TryFrom<Vec<FieldDescriptor>> for FieldSchema {
    type Error = ModelError;

    fn try_from(fields: Vec<FieldDescriptor>) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<FieldSchema> for Vec<FieldDescriptor> {
    fn from(schema: FieldSchema) -> Self {
        schema.fields
    }
}

/// A record split into its schema-known part and the keys that were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub known: Record,
    pub unknown: Vec<String>,
}
