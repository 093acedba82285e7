use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validate::full_match_regex;

/// Supported field kinds. Controls the rendered widget and default validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Select,
    Checkbox,
    Radio,
    Textarea,
    Date,
    Email,
    Tel,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Select => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::Textarea => "textarea",
            FieldKind::Date => "date",
            FieldKind::Email => "email",
            FieldKind::Tel => "tel",
        }
    }

    /// Choice kinds pick their value from `options`.
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Radio)
    }
}

/// One selectable entry of a select or radio field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Comparison applied by a visibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    #[default]
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    /// Any operator name not listed above; compares like `equals`.
    #[serde(other)]
    Unknown,
}

/// Shows a field only while another field's value satisfies a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisibilityRule {
    pub field: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
}

impl VisibilityRule {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            value,
            operator: Some(operator),
        }
    }

    /// Operator with the `equals` fallback applied.
    pub fn effective_operator(&self) -> Operator {
        match self.operator {
            None | Some(Operator::Unknown) => Operator::Equals,
            Some(operator) => operator,
        }
    }
}

type CheckFn = dyn Fn(Option<&Value>) -> Option<String> + Send + Sync;

/// Executable validation attached to a field after the schema is loaded.
///
/// Returns the error message to show, or `None` when the value is acceptable.
#[derive(Clone)]
pub struct CustomCheck(Arc<CheckFn>);

impl CustomCheck {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(Option<&Value>) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(check))
    }

    pub fn call(&self, value: Option<&Value>) -> Option<String> {
        (self.0)(value)
    }
}

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomCheck(..)")
    }
}

impl PartialEq for CustomCheck {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Compiled form of a rule's pattern, keyed by the source it was built from.
#[derive(Clone, Default)]
struct CompiledPattern(OnceLock<(String, Result<Regex, regex::Error>)>);

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompiledPattern(..)")
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Range, pattern, and custom checks for a field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ValidationRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip)]
    #[schemars(skip)]
    pub custom: Option<CustomCheck>,
    #[serde(skip)]
    #[schemars(skip)]
    compiled: CompiledPattern,
}

impl ValidationRule {
    pub fn has_range(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// Full-match regex for `pattern`, compiled once and reused.
    ///
    /// A pattern edited after the first call is compiled fresh on every call.
    pub fn pattern_regex(&self) -> Option<Result<Cow<'_, Regex>, regex::Error>> {
        let pattern = self.pattern.as_deref()?;
        let (source, compiled) = self
            .compiled
            .0
            .get_or_init(|| (pattern.to_string(), full_match_regex(pattern)));
        if source != pattern {
            return Some(full_match_regex(pattern).map(Cow::Owned));
        }
        Some(match compiled {
            Ok(regex) => Ok(Cow::Borrowed(regex)),
            Err(error) => Err(error.clone()),
        })
    }
}

/// A single form field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<VisibilityRule>,
    pub group: String,
    pub order: i64,
}

impl FieldSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        kind: FieldKind,
        group: impl Into<String>,
        order: i64,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            required: false,
            placeholder: None,
            help_text: None,
            options: Vec::new(),
            validation: None,
            depends_on: None,
            group: group.into(),
            order,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        let rule = self.validation.get_or_insert_with(ValidationRule::default);
        rule.min = min;
        rule.max = max;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.validation
            .get_or_insert_with(ValidationRule::default)
            .pattern = Some(pattern.into());
        self
    }

    /// Attaches an executable check, run after range and pattern checks pass.
    pub fn with_custom_check(mut self, check: CustomCheck) -> Self {
        self.validation
            .get_or_insert_with(ValidationRule::default)
            .custom = Some(check);
        self
    }

    pub fn depends_on(mut self, rule: VisibilityRule) -> Self {
        self.depends_on = Some(rule);
        self
    }
}
