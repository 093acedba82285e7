use thiserror::Error;
use tracing::{info, warn};

use crate::embed::EmbedMessage;
use crate::navigator::GroupNavigator;
use crate::store::FormStore;
use crate::validate::{ErrorMap, validate_visible};

/// Phases of a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitStatus {
    #[default]
    Idle,
    Submitting,
    /// Local checks passed; the external form now owns the submission.
    RevealedExternal,
    Success,
    Error,
}

impl SubmitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitStatus::Idle => "idle",
            SubmitStatus::Submitting => "submitting",
            SubmitStatus::RevealedExternal => "revealed_external",
            SubmitStatus::Success => "success",
            SubmitStatus::Error => "error",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("submit is only available on the last group (current {current}, last {last})")]
    NotOnFinalGroup { current: usize, last: usize },
    #[error("the external form is already shown; waiting for it to finish")]
    AwaitingExternal,
}

/// Result of a submit attempt that was allowed to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Visible fields failed validation; the errors were written to the store.
    Rejected(ErrorMap),
    /// Every visible field passed and the external form is now shown.
    Revealed,
}

/// Drives validate-all, reveal-external, and completion handling.
#[derive(Debug, Clone, Default)]
pub struct SubmissionController {
    status: SubmitStatus,
    embed_visible: bool,
}

impl SubmissionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SubmitStatus {
        self.status
    }

    pub fn embed_visible(&self) -> bool {
        self.embed_visible
    }

    /// Validates every visible field in the whole form, not just the current
    /// group, and reveals the external form when nothing fails.
    pub fn submit(
        &mut self,
        store: &mut FormStore,
        navigator: &GroupNavigator,
    ) -> Result<SubmitOutcome, SubmitError> {
        if self.status == SubmitStatus::RevealedExternal {
            return Err(SubmitError::AwaitingExternal);
        }
        if !navigator.is_last() {
            return Err(SubmitError::NotOnFinalGroup {
                current: navigator.current(),
                last: navigator.len().saturating_sub(1),
            });
        }

        self.status = SubmitStatus::Submitting;
        info!(
            form_id = %store.schema().id,
            values = %store.state().values_json(),
            "form submission started"
        );

        let errors = validate_visible(store.schema(), store.state());
        if !errors.is_empty() {
            warn!(count = errors.len(), ?errors, "submission blocked by validation errors");
            store.replace_errors(errors.clone());
            self.status = SubmitStatus::Idle;
            return Ok(SubmitOutcome::Rejected(errors));
        }

        store.replace_errors(ErrorMap::new());
        self.status = SubmitStatus::RevealedExternal;
        self.embed_visible = true;
        info!(form_id = %store.schema().id, "revealing external form");
        Ok(SubmitOutcome::Revealed)
    }

    /// Applies an inbound embed message. Returns true when it changed state.
    pub fn handle_message(&mut self, message: &EmbedMessage, store: &mut FormStore) -> bool {
        match message {
            EmbedMessage::Submitted => self.complete_external(store),
            EmbedMessage::Failed { reason } => self.external_failed(reason.as_deref()),
            EmbedMessage::Ignored => false,
        }
    }

    /// The external form reported success: clear the form and hide the embed.
    pub fn complete_external(&mut self, store: &mut FormStore) -> bool {
        if self.status != SubmitStatus::RevealedExternal {
            warn!(status = self.status.as_str(), "ignoring completion outside the external phase");
            return false;
        }
        info!(form_id = %store.schema().id, "external form reported successful submission");
        self.status = SubmitStatus::Success;
        self.embed_visible = false;
        store.reset();
        true
    }

    /// Failure hook for the external form. Values are kept so the user can retry.
    pub fn external_failed(&mut self, reason: Option<&str>) -> bool {
        if self.status != SubmitStatus::RevealedExternal {
            return false;
        }
        warn!(reason = reason.unwrap_or("unspecified"), "external form reported a failure");
        self.status = SubmitStatus::Error;
        self.embed_visible = false;
        true
    }
}
