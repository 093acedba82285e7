use std::cell::{Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::embed::{EmbedBridge, EmbedMessage, Subscription};
use crate::navigator::GroupNavigator;
use crate::spec::field::FieldSpec;
use crate::spec::form::FormSchema;
use crate::spec::group::GroupSpec;
use crate::store::{FormStore, StoreError};
use crate::submission::{SubmissionController, SubmitError, SubmitOutcome, SubmitStatus};
use crate::visibility::is_visible;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// One user's pass through the form, from mount to teardown.
#[derive(Debug)]
pub struct FormSession {
    schema: Arc<FormSchema>,
    store: FormStore,
    navigator: GroupNavigator,
    submission: SubmissionController,
}

impl FormSession {
    pub fn new(schema: Arc<FormSchema>) -> Self {
        let navigator = GroupNavigator::new(schema.groups.len());
        Self {
            store: FormStore::new(Arc::clone(&schema)),
            schema,
            navigator,
            submission: SubmissionController::new(),
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn store(&self) -> &FormStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut FormStore {
        &mut self.store
    }

    pub fn navigator(&self) -> &GroupNavigator {
        &self.navigator
    }

    pub fn status(&self) -> SubmitStatus {
        self.submission.status()
    }

    pub fn embed_visible(&self) -> bool {
        self.submission.embed_visible()
    }

    pub fn current_group(&self) -> Option<&GroupSpec> {
        self.schema.group(self.navigator.current())
    }

    /// Fields of the current group that are visible right now, in display order.
    pub fn current_fields(&self) -> Vec<&FieldSpec> {
        self.current_group()
            .map(|group| {
                self.schema
                    .group_fields(&group.id)
                    .into_iter()
                    .filter(|field| is_visible(field, self.store.state()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_value(&mut self, field_id: &str, value: Value) -> Result<(), SessionError> {
        self.store.set_value(field_id, value)?;
        Ok(())
    }

    pub fn next_group(&mut self) -> bool {
        self.navigator.next()
    }

    pub fn previous_group(&mut self) -> bool {
        self.navigator.previous()
    }

    /// Returns to the first group, e.g. to walk the form again after a rejection.
    pub fn first_group(&mut self) {
        self.navigator.jump_to_start();
    }

    pub fn submit(&mut self) -> Result<SubmitOutcome, SessionError> {
        Ok(self.submission.submit(&mut self.store, &self.navigator)?)
    }

    /// Interprets a raw payload from the external form.
    pub fn handle_embed_message(&mut self, payload: &Value) -> bool {
        let message = EmbedMessage::parse(payload);
        debug!(?message, "received embed message");
        self.submission.handle_message(&message, &mut self.store)
    }

    /// Failure hook for hosts that learn about external errors another way.
    pub fn report_external_failure(&mut self, reason: Option<&str>) -> bool {
        self.submission.external_failed(reason)
    }

    /// Registers this session's single embed listener on `bridge`.
    ///
    /// Messages that arrive while the host holds a borrow are queued and
    /// applied, in order, on the next borrow or at unmount.
    pub fn mount(self, bridge: &EmbedBridge) -> MountedSession {
        let inner = Rc::new(RefCell::new(self));
        let pending = PendingMessages::default();
        let weak = Rc::downgrade(&inner);
        let queue = Rc::clone(&pending);
        let listener = bridge.listen(move |payload| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            queue.borrow_mut().push_back(payload.clone());
            match session.try_borrow_mut() {
                Ok(mut session) => drain_pending(&mut session, &queue),
                Err(_) => debug!("session busy; embed message queued"),
            }
        });
        MountedSession {
            inner,
            pending,
            listener,
        }
    }
}

type PendingMessages = Rc<RefCell<VecDeque<Value>>>;

fn drain_pending(session: &mut FormSession, pending: &RefCell<VecDeque<Value>>) {
    loop {
        let next = pending.borrow_mut().pop_front();
        let Some(payload) = next else {
            break;
        };
        session.handle_embed_message(&payload);
    }
}

/// A session wired to an [`EmbedBridge`].
///
/// Holds the only listener registration for the session; it is removed by
/// [`MountedSession::unmount`] or when the mounted session is dropped.
#[derive(Debug)]
pub struct MountedSession {
    inner: Rc<RefCell<FormSession>>,
    pending: PendingMessages,
    listener: Subscription,
}

impl MountedSession {
    pub fn borrow(&self) -> Ref<'_, FormSession> {
        self.apply_pending();
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, FormSession> {
        self.apply_pending();
        self.inner.borrow_mut()
    }

    /// Number of embed messages waiting for the session to be free.
    pub fn pending_messages(&self) -> usize {
        self.pending.borrow().len()
    }

    fn apply_pending(&self) {
        if self.pending.borrow().is_empty() {
            return;
        }
        match self.inner.try_borrow_mut() {
            Ok(mut session) => drain_pending(&mut session, &self.pending),
            Err(_) => debug!(
                queued = self.pending_messages(),
                "session still borrowed; embed messages stay queued"
            ),
        }
    }

    /// Tears down the listener, applies queued messages, and hands the session back.
    pub fn unmount(self) -> FormSession {
        let MountedSession {
            inner,
            pending,
            listener,
        } = self;
        drop(listener);
        // The listener only held a weak reference, so `inner` is the sole owner.
        let mut session = Rc::into_inner(inner)
            .map(RefCell::into_inner)
            .expect("mounted session is the only strong owner");
        drain_pending(&mut session, &pending);
        session
    }
}
