use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::spec::field::{FieldKind, FieldSpec};
use crate::spec::form::FormSchema;
use crate::store::FormState;
use crate::value::{format_number, is_falsy, to_number, to_text};
use crate::visibility::is_visible;

/// Field id to error message.
pub type ErrorMap = BTreeMap<String, String>;

/// Compiles a pattern so that it must match the whole value.
pub fn full_match_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Computes the error for a single field value, or `None` when it is valid.
///
/// Checks run in order and the first failure wins: required, numeric range
/// (number fields only), pattern, then the custom check whose answer is final.
/// The pattern sees the value's text form, so an unset value is matched as
/// `"undefined"` and `null` as `"null"`. A pattern that does not compile is
/// logged and skipped; [`FormSchema::check`] rejects such schemas up front.
pub fn validate_field(field: &FieldSpec, value: Option<&Value>) -> Option<String> {
    if field.required && is_falsy(value) {
        return Some(format!("{} is required", field.label));
    }

    let rule = field.validation.as_ref()?;

    if field.kind == FieldKind::Number && rule.has_range() {
        let number = to_number(value);
        if let Some(min) = rule.min
            && number < min
        {
            return Some(format!(
                "{} must be at least {}",
                field.label,
                format_number(min)
            ));
        }
        if let Some(max) = rule.max
            && number > max
        {
            return Some(format!(
                "{} must be at most {}",
                field.label,
                format_number(max)
            ));
        }
    }

    match rule.pattern_regex() {
        Some(Ok(regex)) if !regex.is_match(&to_text(value)) => {
            return Some(format!("{} is invalid", field.label));
        }
        Some(Err(error)) => {
            warn!(field = %field.id, %error, "pattern does not compile; check skipped");
        }
        _ => {}
    }

    if let Some(custom) = &rule.custom {
        return custom.call(value);
    }

    None
}

/// Validates every field that is currently visible, across all groups.
pub fn validate_visible(schema: &FormSchema, state: &FormState) -> ErrorMap {
    schema
        .fields
        .iter()
        .filter(|field| is_visible(field, state))
        .filter_map(|field| {
            validate_field(field, state.value(&field.id)).map(|error| (field.id.clone(), error))
        })
        .collect()
}
