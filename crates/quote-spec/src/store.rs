use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::spec::form::FormSchema;
use crate::validate::{ErrorMap, validate_field};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("field '{0}' is not part of the form")]
    UnknownField(String),
}

/// Current values and error messages of one form session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    values: BTreeMap<String, Value>,
    errors: BTreeMap<String, String>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored value, or `None` if the field was never set.
    pub fn value(&self, field_id: &str) -> Option<&Value> {
        self.values.get(field_id)
    }

    /// The current error message; empty when the field has none.
    pub fn error(&self, field_id: &str) -> &str {
        self.errors.get(field_id).map(String::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.errors.is_empty()
    }

    /// Non-empty errors only.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors
            .iter()
            .filter(|(_, error)| !error.is_empty())
            .map(|(id, error)| (id.as_str(), error.as_str()))
    }

    /// Values as a JSON object keyed by field id.
    pub fn values_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(id, value)| (id.clone(), value.clone()))
                .collect::<Map<_, _>>(),
        )
    }
}

/// Change notification delivered to store subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A field's value and its recomputed error, applied together.
    FieldChanged {
        field_id: String,
        value: Value,
        error: String,
    },
    /// The error map was replaced wholesale by a submission attempt.
    ErrorsReplaced,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&StoreEvent)>;

/// Owns the [`FormState`] of a session and keeps values and errors in step.
pub struct FormStore {
    schema: Arc<FormSchema>,
    state: FormState,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl fmt::Debug for FormStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormStore")
            .field("form_id", &self.schema.id)
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl FormStore {
    pub fn new(schema: Arc<FormSchema>) -> Self {
        Self {
            schema,
            state: FormState::new(),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn value(&self, field_id: &str) -> Option<&Value> {
        self.state.value(field_id)
    }

    pub fn error(&self, field_id: &str) -> &str {
        self.state.error(field_id)
    }

    /// Stores a value and re-validates that field only.
    ///
    /// Subscribers are notified once, after both slots hold their new contents.
    pub fn set_value(&mut self, field_id: &str, value: Value) -> Result<(), StoreError> {
        let field = self
            .schema
            .field(field_id)
            .ok_or_else(|| StoreError::UnknownField(field_id.to_string()))?;
        let error = validate_field(field, Some(&value)).unwrap_or_default();
        debug!(field_id, %value, error = %error, "field value changed");

        self.state
            .values
            .insert(field_id.to_string(), value.clone());
        self.state.errors.insert(field_id.to_string(), error.clone());

        self.notify(&StoreEvent::FieldChanged {
            field_id: field_id.to_string(),
            value,
            error,
        });
        Ok(())
    }

    /// Replaces the error map, e.g. with the result of a full-form check.
    pub fn replace_errors(&mut self, errors: ErrorMap) {
        self.state.errors = errors;
        self.notify(&StoreEvent::ErrorsReplaced);
    }

    /// Clears every value and error.
    pub fn reset(&mut self) {
        self.state = FormState::new();
        debug!(form_id = %self.schema.id, "form state reset");
        self.notify(&StoreEvent::Reset);
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        let observer: Observer = Box::new(observer);
        self.observers.push((id, observer));
        id
    }

    /// Removes a subscriber; returns false when the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    fn notify(&mut self, event: &StoreEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> FormStore {
        FormStore::new(Arc::new(FormSchema::quote_request().expect("schema")))
    }

    #[test]
    fn set_value_updates_value_and_error_together() {
        let mut store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        store.set_value("quantity", json!(0)).expect("set");
        assert_eq!(store.value("quantity"), Some(&json!(0)));
        assert_eq!(store.error("quantity"), "Quantity is required");

        store.set_value("quantity", json!(5)).expect("set");
        assert_eq!(store.error("quantity"), "");

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0],
            StoreEvent::FieldChanged {
                field_id: "quantity".into(),
                value: json!(0),
                error: "Quantity is required".into(),
            }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut store = store();
        assert_eq!(
            store.set_value("favouriteColour", json!("red")),
            Err(StoreError::UnknownField("favouriteColour".into()))
        );
        assert!(store.state().is_empty());
    }

    #[test]
    fn repeated_set_value_is_idempotent() {
        let mut once = store();
        once.set_value("email", json!("not-an-email")).expect("set");
        let mut twice = store();
        twice.set_value("email", json!("not-an-email")).expect("set");
        twice.set_value("email", json!("not-an-email")).expect("set");
        assert_eq!(once.state(), twice.state());
        assert_eq!(twice.error("email"), "Email Address is invalid");
    }

    #[test]
    fn changing_one_field_leaves_other_errors_alone() {
        let mut store = store();
        store.set_value("quantity", json!(5000)).expect("set");
        assert_eq!(store.error("quantity"), "Quantity must be at most 1000");

        store.set_value("productType", json!("Type C")).expect("set");
        assert_eq!(store.error("quantity"), "Quantity must be at most 1000");

        store.set_value("productType", Value::Null).expect("set");
        assert_eq!(store.error("quantity"), "Quantity must be at most 1000");
        assert_eq!(store.value("quantity"), Some(&json!(5000)));
    }

    #[test]
    fn reset_clears_everything_and_notifies() {
        let mut store = store();
        let resets = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&resets);
        let id = store.subscribe(move |event| {
            if *event == StoreEvent::Reset {
                *counter.borrow_mut() += 1;
            }
        });
        store.set_value("name", json!("Ada")).expect("set");
        store.reset();
        assert!(store.state().is_empty());
        assert_eq!(store.value("name"), None);
        assert_eq!(store.error("name"), "");
        assert_eq!(*resets.borrow(), 1);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.reset();
        assert_eq!(*resets.borrow(), 1);
    }
}
