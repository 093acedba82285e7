use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::field::FieldSpec;
use crate::spec::group::GroupSpec;

const QUOTE_REQUEST_SCHEMA: &str = include_str!("../../tests/fixtures/quote_request.json");

/// Problems detected while loading or checking a form schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse form schema: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("form schema defines no groups")]
    NoGroups,
    #[error("field id '{0}' is defined more than once")]
    DuplicateField(String),
    #[error("group id '{0}' is defined more than once")]
    DuplicateGroup(String),
    #[error("field '{field}' belongs to unknown group '{group}'")]
    UnknownGroup { field: String, group: String },
    #[error("group '{group}' lists unknown field '{field}'")]
    UnknownGroupMember { group: String, field: String },
    #[error("field '{field}' and group '{group}' disagree about membership")]
    GroupMismatch { group: String, field: String },
    #[error("visibility rule on '{field}' references unknown field '{target}'")]
    DanglingVisibilityRef { field: String, target: String },
    #[error("visibility rule on '{field}' references the field itself")]
    SelfReference { field: String },
    #[error("choice field '{field}' has no options")]
    MissingOptions { field: String },
    #[error("field '{field}' has an invalid pattern: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
    #[error("field '{field}' has min {min} greater than max {max}")]
    InvalidRange { field: String, min: f64, max: f64 },
}

/// Location of the hosted form revealed once local validation passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmbedSpec {
    pub url: String,
    #[serde(default = "default_embed_title")]
    pub title: String,
    #[serde(default = "default_embed_height")]
    pub height: String,
}

fn default_embed_title() -> String {
    "Quote Request Form".into()
}

fn default_embed_height() -> String {
    "800px".into()
}

fn default_submit_text() -> String {
    "Submit".into()
}

fn default_success_message() -> String {
    "Thank you! Your request has been received.".into()
}

fn default_error_message() -> String {
    "There was an error submitting your request. Please try again.".into()
}

/// Top-level form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub groups: Vec<GroupSpec>,
    pub fields: Vec<FieldSpec>,
    #[serde(default = "default_submit_text")]
    pub submit_button_text: String,
    #[serde(default = "default_success_message")]
    pub success_message: String,
    #[serde(default = "default_error_message")]
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<EmbedSpec>,
}

impl FormSchema {
    /// Parses a schema from JSON and runs [`FormSchema::check`].
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let schema: FormSchema = serde_json::from_str(json).map_err(SchemaError::Parse)?;
        schema.check()?;
        Ok(schema)
    }

    /// The built-in product quote request form.
    pub fn quote_request() -> Result<Self, SchemaError> {
        Self::from_json_str(QUOTE_REQUEST_SCHEMA)
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn field_mut(&mut self, id: &str) -> Option<&mut FieldSpec> {
        self.fields.iter_mut().find(|field| field.id == id)
    }

    pub fn group(&self, index: usize) -> Option<&GroupSpec> {
        self.groups.get(index)
    }

    /// Fields of a group sorted by `order`; equal orders keep schema order.
    pub fn group_fields(&self, group_id: &str) -> Vec<&FieldSpec> {
        let mut fields = self
            .fields
            .iter()
            .filter(|field| field.group == group_id)
            .collect::<Vec<_>>();
        fields.sort_by_key(|field| field.order);
        fields
    }

    /// Verifies the structural invariants other components rely on.
    pub fn check(&self) -> Result<(), SchemaError> {
        if self.groups.is_empty() {
            return Err(SchemaError::NoGroups);
        }

        let mut field_ids = BTreeSet::new();
        for field in &self.fields {
            if !field_ids.insert(field.id.as_str()) {
                return Err(SchemaError::DuplicateField(field.id.clone()));
            }
        }

        let mut group_ids = BTreeSet::new();
        for group in &self.groups {
            if !group_ids.insert(group.id.as_str()) {
                return Err(SchemaError::DuplicateGroup(group.id.clone()));
            }
        }

        for field in &self.fields {
            if !group_ids.contains(field.group.as_str()) {
                return Err(SchemaError::UnknownGroup {
                    field: field.id.clone(),
                    group: field.group.clone(),
                });
            }
        }

        for group in &self.groups {
            for member in &group.fields {
                let Some(field) = self.field(member) else {
                    return Err(SchemaError::UnknownGroupMember {
                        group: group.id.clone(),
                        field: member.clone(),
                    });
                };
                if field.group != group.id {
                    return Err(SchemaError::GroupMismatch {
                        group: group.id.clone(),
                        field: member.clone(),
                    });
                }
            }
        }

        for field in &self.fields {
            let listed = self
                .groups
                .iter()
                .find(|group| group.id == field.group)
                .is_some_and(|group| group.contains(&field.id));
            if !listed {
                return Err(SchemaError::GroupMismatch {
                    group: field.group.clone(),
                    field: field.id.clone(),
                });
            }

            if let Some(rule) = &field.depends_on {
                if rule.field == field.id {
                    return Err(SchemaError::SelfReference {
                        field: field.id.clone(),
                    });
                }
                if !field_ids.contains(rule.field.as_str()) {
                    return Err(SchemaError::DanglingVisibilityRef {
                        field: field.id.clone(),
                        target: rule.field.clone(),
                    });
                }
            }

            if field.kind.is_choice() && field.options.is_empty() {
                return Err(SchemaError::MissingOptions {
                    field: field.id.clone(),
                });
            }

            if let Some(validation) = &field.validation {
                if let Some(Err(source)) = validation.pattern_regex() {
                    return Err(SchemaError::InvalidPattern {
                        field: field.id.clone(),
                        source,
                    });
                }
                if let (Some(min), Some(max)) = (validation.min, validation.max)
                    && min > max
                {
                    return Err(SchemaError::InvalidRange {
                        field: field.id.clone(),
                        min,
                        max,
                    });
                }
            }
        }

        Ok(())
    }
}
