//! Message channel between the page and the embedded external form.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::trace;

/// Tag carried by the external form once it has accepted a submission.
pub const SUBMITTED_EVENT: &str = "formSubmitted";
/// Tag reserved for a failure report from the external form.
pub const FAILED_EVENT: &str = "formError";

/// Interpretation of an inbound message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedMessage {
    Submitted,
    Failed { reason: Option<String> },
    Ignored,
}

impl EmbedMessage {
    /// Only `{"event": "formSubmitted"}` and `{"event": "formError"}` are
    /// recognised; any other shape is ignored.
    pub fn parse(payload: &Value) -> Self {
        match payload.get("event").and_then(Value::as_str) {
            Some(SUBMITTED_EVENT) => EmbedMessage::Submitted,
            Some(FAILED_EVENT) => EmbedMessage::Failed {
                reason: payload
                    .get("message")
                    .and_then(Value::as_str)
                    .map(String::from),
            },
            _ => EmbedMessage::Ignored,
        }
    }
}

type Listener = Rc<dyn Fn(&Value)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Broadcasts payloads posted by the external form to registered listeners.
///
/// Cloning yields another handle to the same channel.
#[derive(Clone, Default)]
pub struct EmbedBridge {
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for EmbedBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedBridge")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EmbedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener until the returned [`Subscription`] is dropped.
    pub fn listen(&self, listener: impl Fn(&Value) + 'static) -> Subscription {
        let listener: Listener = Rc::new(listener);
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, listener));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Delivers a payload to every listener registered at the time of the call.
    pub fn post(&self, payload: &Value) {
        let listeners = self
            .registry
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect::<Vec<_>>();
        trace!(listeners = listeners.len(), %payload, "dispatching embed message");
        for listener in listeners {
            listener(payload);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }
}

/// Keeps a listener registered on an [`EmbedBridge`]; dropping it unregisters.
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn parses_tagged_payloads() {
        assert_eq!(
            EmbedMessage::parse(&json!({ "event": "formSubmitted" })),
            EmbedMessage::Submitted
        );
        assert_eq!(
            EmbedMessage::parse(&json!({ "event": "formError", "message": "down" })),
            EmbedMessage::Failed {
                reason: Some("down".into())
            }
        );
        assert_eq!(
            EmbedMessage::parse(&json!({ "event": "heightChanged", "height": 900 })),
            EmbedMessage::Ignored
        );
        assert_eq!(
            EmbedMessage::parse(&json!("formSubmitted")),
            EmbedMessage::Ignored
        );
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let bridge = EmbedBridge::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let subscription = bridge.listen(move |_| counter.set(counter.get() + 1));
        bridge.post(&json!({}));
        assert_eq!(bridge.listener_count(), 1);

        drop(subscription);
        bridge.post(&json!({}));
        assert_eq!(hits.get(), 1);
        assert_eq!(bridge.listener_count(), 0);
    }

    #[test]
    fn listener_may_drop_other_subscriptions_during_dispatch() {
        let bridge = EmbedBridge::new();
        let held = Rc::new(RefCell::new(None::<Subscription>));
        let slot = Rc::clone(&held);
        let _first = bridge.listen(move |_| {
            slot.borrow_mut().take();
        });
        *held.borrow_mut() = Some(bridge.listen(|_| {}));
        bridge.post(&json!({}));
        assert_eq!(bridge.listener_count(), 1);
    }
}
