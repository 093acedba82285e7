use std::collections::BTreeMap;

use serde_json::Value;

use crate::spec::field::{FieldSpec, Operator, VisibilityRule};
use crate::spec::form::FormSchema;
use crate::store::FormState;
use crate::value::{to_number, to_text};

pub type VisibilityMap = BTreeMap<String, bool>;

/// Whether `field` is shown for the current values.
///
/// Only the field's own rule is consulted; a field that depends on a hidden
/// field is still evaluated against that field's stored value.
pub fn is_visible(field: &FieldSpec, state: &FormState) -> bool {
    match &field.depends_on {
        None => true,
        Some(rule) => rule_matches(rule, state.value(&rule.field)),
    }
}

/// Evaluates a rule against the dependent value (`None` when never set).
pub fn rule_matches(rule: &VisibilityRule, dependent: Option<&Value>) -> bool {
    match rule.effective_operator() {
        Operator::Equals | Operator::Unknown => strict_equals(dependent, &rule.value),
        Operator::NotEquals => !strict_equals(dependent, &rule.value),
        Operator::Contains => to_text(dependent).contains(&to_text(Some(&rule.value))),
        Operator::GreaterThan => to_number(dependent) > to_number(Some(&rule.value)),
        Operator::LessThan => to_number(dependent) < to_number(Some(&rule.value)),
    }
}

fn strict_equals(dependent: Option<&Value>, target: &Value) -> bool {
    match dependent {
        None => false,
        Some(Value::Number(left)) => match (left.as_f64(), target.as_f64()) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        },
        Some(value) => value == target,
    }
}

/// Visibility of every field in the schema.
pub fn resolve_visibility(schema: &FormSchema, state: &FormState) -> VisibilityMap {
    schema
        .fields
        .iter()
        .map(|field| (field.id.clone(), is_visible(field, state)))
        .collect()
}
