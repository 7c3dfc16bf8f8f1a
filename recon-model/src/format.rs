//! Record formats: how one record type is located, labelled and edited.

use recon_types::Record;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ModelError, ModelResult};
use crate::schema::{FieldDescriptor, FieldSchema};

/// How one record type is located, labelled and edited.
///
/// Accepts both snake_case and the camelCase names used by older view
/// configuration (`selectionKey`, `primaryKey`, `dataKeys`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFormat {
    /// Field matched against the routing parameter to find the record.
    #[serde(alias = "selectionKey")]
    pub selection_key: String,
    /// Field whose value names the record in status messages.
    #[serde(alias = "primaryKey")]
    pub primary_key: String,
    /// Boolean field marking system-owned records, if the type has one.
    #[serde(default, alias = "builtinKey", skip_serializing_if = "Option::is_none")]
    pub builtin_key: Option<String>,
    /// Field whose valid values come from the auxiliary option source.
    #[serde(default, alias = "optionKey", skip_serializing_if = "Option::is_none")]
    pub option_key: Option<String>,
    #[serde(alias = "dataKeys")]
    pub fields: FieldSchema,
}

impl RecordFormat {
    /// Parses and validates a format from JSON text.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let format: Self = serde_json::from_str(json)?;
        format.validate()?;
        Ok(format)
    }

    /// Loads a format from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> ModelResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Checks that every key the format refers to is declared in its schema.
    pub fn validate(&self) -> ModelResult<()> {
        let roles = [
            ("selection", Some(&self.selection_key)),
            ("primary", Some(&self.primary_key)),
            ("builtin", self.builtin_key.as_ref()),
            ("option", self.option_key.as_ref()),
        ];
        for (role, key) in roles {
            if let Some(key) = key {
                if !self.fields.is_known(key) {
                    return Err(ModelError::UndeclaredKey {
                        role,
                        key: key.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The built-in format for local user accounts.
    pub fn user_accounts() -> Self {
        let fields = FieldSchema::new(vec![
            FieldDescriptor::immutable("id"),
            FieldDescriptor::immutable("builtin"),
            FieldDescriptor::mutable("username"),
            FieldDescriptor::mutable("full_name"),
            FieldDescriptor::mutable("email"),
            FieldDescriptor::mutable("group"),
            FieldDescriptor::mutable("home"),
            FieldDescriptor::mutable("shell"),
            FieldDescriptor::mutable("locked"),
            FieldDescriptor::mutable("sudo"),
            FieldDescriptor::mutable("password_disabled"),
            FieldDescriptor::immutable("logged-in"),
        ])
        .expect("user account fields are unique");
        Self {
            selection_key: "username".into(),
            primary_key: "username".into(),
            builtin_key: Some("builtin".into()),
            option_key: Some("shell".into()),
            fields,
        }
    }

    /// Text naming `record` in status messages.
    ///
    /// Falls back to the record id when the primary key is missing or not
    /// a scalar.
    pub fn label(&self, record: &Record) -> String {
        match record.get(&self.primary_key) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(v @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => v.to_string(),
            _ => record.id().map(|id| id.to_string()).unwrap_or_default(),
        }
    }

    /// Whether `record` is flagged as system-owned.
    pub fn is_builtin(&self, record: &Record) -> bool {
        self.builtin_key
            .as_deref()
            .and_then(|key| record.get_bool(key))
            .unwrap_or(false)
    }
}
