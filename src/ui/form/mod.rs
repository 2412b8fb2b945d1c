//! Schema-driven forms
//!
//! `FormSchema` describes fields and their rules; `FormState` holds the
//! values a user has entered and the errors they currently produce. Nothing
//! here touches the network.

mod schema;
mod state;

#[cfg(test)]
mod tests;

pub use schema::{
    is_blank, CrossFieldRule, FieldDescriptor, FieldKind, FormSchema, ListItemKind, RuleCheck,
    SchemaError, ValidationErrors, Values,
};
pub use state::{FormError, FormState, SubmitOutcome, SubmitStart};
