//! Per-form value and error state

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::schema::{FormSchema, ValidationErrors, Values};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
}

/// Result of `FormState::begin_submit`
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitStart {
    /// Validation passed; the form is now submitting with these values
    Ready(Values),
    /// Validation failed; `errors()` is populated
    Invalid,
    AlreadySubmitting,
}

/// Result of `FormState::submit`
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<T> {
    Submitted(T),
    Invalid,
    AlreadySubmitting,
}

impl<T> SubmitOutcome<T> {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}

#[derive(Debug, Clone)]
pub struct FormState {
    schema: Arc<FormSchema>,
    values: Values,
    errors: ValidationErrors,
    is_submitting: bool,
}

impl FormState {
    /// Start from schema defaults, overlaid with `initial_values` for fields
    /// the schema knows. Errors start empty: nothing has been touched yet.
    pub fn new(schema: Arc<FormSchema>, initial_values: &Values) -> Self {
        let mut values = schema.defaults();
        for (name, value) in initial_values {
            if schema.has_field(name) {
                values.insert(name.clone(), value.clone());
            }
        }
        Self {
            schema,
            values,
            errors: ValidationErrors::new(),
            is_submitting: false,
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    /// True when the last validation left no errors
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether a submit action should be enabled right now. Checks the
    /// current values without recording errors, so untouched required
    /// fields disable the action without flagging them.
    pub fn can_submit(&self) -> bool {
        !self.is_submitting && self.schema.validate(&self.values).is_empty()
    }

    /// Update one field and re-check it plus every rule that reads it
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), FormError> {
        if !self.schema.has_field(name) {
            return Err(FormError::UnknownField(name.to_string()));
        }
        self.values.insert(name.to_string(), value);

        let mut affected: Vec<String> = vec![name.to_string()];
        for dependent in self.schema.dependents_of(name) {
            if !affected.iter().any(|a| a == dependent) {
                affected.push(dependent.to_string());
            }
        }
        for field in affected {
            self.validate_field(&field);
        }
        Ok(())
    }

    /// Re-check a single field, updating `errors`
    pub fn validate_field(&mut self, name: &str) -> Option<&str> {
        match self.schema.validate_field(name, &self.values) {
            Some(message) => {
                self.errors.insert(name.to_string(), message);
            }
            None => {
                self.errors.remove(name);
            }
        }
        self.error(name)
    }

    /// Re-check every field; returns true when clean
    pub fn validate(&mut self) -> bool {
        self.errors = self.schema.validate(&self.values);
        self.errors.is_empty()
    }

    /// Validate and, when clean, enter the submitting state
    pub fn begin_submit(&mut self) -> SubmitStart {
        if self.is_submitting {
            return SubmitStart::AlreadySubmitting;
        }
        if !self.validate() {
            debug!(errors = self.errors.len(), "form submit blocked by validation");
            return SubmitStart::Invalid;
        }
        self.is_submitting = true;
        SubmitStart::Ready(self.values.clone())
    }

    pub fn finish_submit(&mut self) {
        self.is_submitting = false;
    }

    /// Validate, then hand the values to `on_submit` when clean
    pub async fn submit<F, Fut, T>(&mut self, on_submit: F) -> SubmitOutcome<T>
    where
        F: FnOnce(Values) -> Fut,
        Fut: Future<Output = T>,
    {
        let values = match self.begin_submit() {
            SubmitStart::Ready(values) => values,
            SubmitStart::Invalid => return SubmitOutcome::Invalid,
            SubmitStart::AlreadySubmitting => return SubmitOutcome::AlreadySubmitting,
        };
        let result = on_submit(values).await;
        self.finish_submit();
        SubmitOutcome::Submitted(result)
    }

    /// Replace all values (used when a wizard step is re-entered)
    pub fn reset(&mut self, values: &Values) {
        *self = Self::new(Arc::clone(&self.schema), values);
    }
}
