pub mod field;
pub mod form;
pub mod group;

pub use field::{
    CustomCheck, FieldKind, FieldOption, FieldSpec, Operator, ValidationRule, VisibilityRule,
};
pub use form::{EmbedSpec, FormSchema, SchemaError};
pub use group::GroupSpec;
