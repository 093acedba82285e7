#![allow(missing_docs)]

pub mod embed;
pub mod navigator;
pub mod render;
pub mod session;
pub mod spec;
pub mod store;
pub mod submission;
pub mod validate;
pub mod value;
pub mod visibility;

pub use embed::{EmbedBridge, EmbedMessage, Subscription};
pub use navigator::GroupNavigator;
pub use render::{
    BannerKind, RenderField, RenderPayload, Widget, build_render_payload, render_json_ui,
    render_text,
};
pub use session::{FormSession, MountedSession, SessionError};
pub use spec::{
    CustomCheck, EmbedSpec, FieldKind, FieldOption, FieldSpec, FormSchema, GroupSpec, Operator,
    SchemaError, ValidationRule, VisibilityRule,
};
pub use store::{FormState, FormStore, StoreError, StoreEvent, SubscriptionId};
pub use submission::{SubmissionController, SubmitError, SubmitOutcome, SubmitStatus};
pub use validate::{ErrorMap, validate_field, validate_visible};
pub use visibility::{VisibilityMap, is_visible, resolve_visibility};
