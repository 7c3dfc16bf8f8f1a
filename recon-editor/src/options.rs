//! Auxiliary option source (e.g. the list of login shells) and display
//! labels for stored values.
//!
//! Options are advisory presentation data: they never feed the
//! reconciliation invariants, and a failed fetch only means the field is
//! shown without choices.

use async_trait::async_trait;
use recon_types::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::EditorResult;

/// Supplies the valid values for one option-backed field.
#[async_trait]
pub trait OptionSource: Send + Sync {
    /// Fetches the current list of options. Called once per session mount.
    async fn request_options(&self) -> EditorResult<Vec<String>>;
}

/// One choice for an option-backed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub name: String,
    /// Whether this is the record's current value.
    pub selected: bool,
}

/// Marks which of `options` matches `current`.
pub fn choices_for(options: &[String], current: Option<&FieldValue>) -> Vec<ChoiceOption> {
    let current = current.and_then(FieldValue::as_str);
    options
        .iter()
        .map(|name| ChoiceOption {
            name: name.clone(),
            selected: current == Some(name.as_str()),
        })
        .collect()
}

/// An option source with a fixed list.
#[derive(Debug, Clone, Default)]
pub struct StaticOptionSource {
    options: Vec<String>,
}

impl StaticOptionSource {
    pub fn new(options: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl OptionSource for StaticOptionSource {
    async fn request_options(&self) -> EditorResult<Vec<String>> {
        Ok(self.options.clone())
    }
}

/// Resolves stored values to display names, such as a group id to the
/// group's name. Purely presentational.
pub trait ValueLabels: Send + Sync {
    fn label_for(&self, key: &str, value: &FieldValue) -> Option<String>;
}

/// A fixed value-to-name table for one field.
#[derive(Debug, Clone, Default)]
pub struct StaticValueLabels {
    key: String,
    names: HashMap<String, String>,
}

impl StaticValueLabels {
    /// Labels values of `key`. Values are matched by their text form, so
    /// numeric ids can be given as `"1000"`.
    pub fn new(
        key: impl Into<String>,
        names: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        Self {
            key: key.into(),
            names: names
                .into_iter()
                .map(|(value, name)| (value.into(), name.into()))
                .collect(),
        }
    }
}

impl ValueLabels for StaticValueLabels {
    fn label_for(&self, key: &str, value: &FieldValue) -> Option<String> {
        if key != self.key {
            return None;
        }
        let text = match value {
            FieldValue::String(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
            _ => return None,
        };
        self.names.get(&text).cloned()
    }
}
