//! Type definitions for the wizard

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::api::ApiError;
use crate::ui::form::{FormError, FormSchema, SchemaError, ValidationErrors, Values};

/// One page of a wizard: a title and the fields it owns
#[derive(Debug, Clone)]
pub struct StepDescriptor {
    pub title: String,
    pub schema: Arc<FormSchema>,
    pub is_summary: bool,
}

impl StepDescriptor {
    pub fn new(title: impl Into<String>, schema: FormSchema) -> Self {
        Self {
            title: title.into(),
            schema: Arc::new(schema),
            is_summary: false,
        }
    }

    /// A review step that owns no fields
    pub fn summary(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            schema: Arc::new(FormSchema::empty()),
            is_summary: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardMode {
    Create,
    Edit { id: i64 },
}

impl WizardMode {
    pub fn verb(&self) -> &'static str {
        match self {
            WizardMode::Create => "created",
            WizardMode::Edit { .. } => "updated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStatus {
    Editing,
    Completed,
    Cancelled,
}

/// Result of `Wizard::next`
#[derive(Debug, Clone, PartialEq)]
pub enum WizardOutcome {
    /// Step was valid and the next step is now shown
    Advanced,
    /// Validation failed; the wizard stays on (or returns to) the offending step
    Blocked(ValidationErrors),
    /// A submission is already running
    Busy,
    /// Terminal submission succeeded with the server's response
    Submitted(Value),
    /// Terminal submission failed; the Draft is kept for a retry
    Failed(ApiError),
    /// The cancellation token fired; nothing was applied
    Cancelled,
    /// The wizard already completed or was cancelled
    Closed,
}

/// A line of the review summary
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryLine {
    pub step: String,
    pub label: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WizardError {
    #[error("a wizard needs at least one step")]
    NoSteps,
    #[error("field '{field}' is owned by both '{first}' and '{second}'")]
    SharedField {
        field: String,
        first: String,
        second: String,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("the wizard is closed")]
    Closed,
}

/// Where a finished Draft goes
#[async_trait]
pub trait DraftSink: Send + Sync {
    /// Display name used in notifications, such as "Document set"
    fn entity_name(&self) -> &str;

    /// Cache keys to refresh after a successful submission
    fn invalidates(&self) -> Vec<String>;

    /// Backend check that must pass before the final submission
    async fn preflight(&self, _draft: &Values) -> Result<(), ApiError> {
        Ok(())
    }

    async fn create(&self, draft: &Values) -> Result<Value, ApiError>;

    async fn update(&self, id: i64, draft: &Values) -> Result<Value, ApiError>;
}
