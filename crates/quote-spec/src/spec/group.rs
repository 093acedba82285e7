use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A named wizard step presenting a subset of the form's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GroupSpec {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Member field ids; must agree with each field's `group`.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl GroupSpec {
    pub fn new(id: impl Into<String>, title: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            fields,
        }
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.fields.iter().any(|id| id == field_id)
    }
}
