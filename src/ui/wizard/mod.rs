//! Multi-step create/edit flows
//!
//! A `Wizard` sequences one form per step over a shared Draft. Each valid
//! step merges the fields it owns into the Draft and advances; the terminal
//! step sends the whole Draft to a `DraftSink`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{cancellable, ApiError};
use crate::cache::ResourceCache;
use crate::notifications::NotificationCenter;
use crate::ui::form::{FormState, SubmitStart, ValidationErrors, Values};

pub mod step;
pub mod types;

pub use step::StepController;
pub use types::*;


pub struct Wizard {
    steps: Vec<StepDescriptor>,
    forms: Vec<FormState>,
    controller: StepController,
    draft: Values,
    /// Highest step index reached through valid submissions
    furthest: usize,
    mode: WizardMode,
    status: WizardStatus,
    submitting: bool,
    sink: Arc<dyn DraftSink>,
    cache: Option<Arc<ResourceCache>>,
    notifications: Option<NotificationCenter>,
}

impl Wizard {
    /// A wizard that creates a new entity from schema defaults
    pub fn create(
        steps: Vec<StepDescriptor>,
        sink: Arc<dyn DraftSink>,
    ) -> Result<Self, WizardError> {
        Self::build(steps, sink, WizardMode::Create, &Values::new())
    }

    /// A wizard that edits entity `id`, with the Draft seeded from `seed`
    pub fn edit(
        steps: Vec<StepDescriptor>,
        sink: Arc<dyn DraftSink>,
        id: i64,
        seed: &Values,
    ) -> Result<Self, WizardError> {
        Self::build(steps, sink, WizardMode::Edit { id }, seed)
    }

    fn build(
        steps: Vec<StepDescriptor>,
        sink: Arc<dyn DraftSink>,
        mode: WizardMode,
        seed: &Values,
    ) -> Result<Self, WizardError> {
        if steps.is_empty() {
            return Err(WizardError::NoSteps);
        }

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for step in &steps {
            for name in step.schema.field_names() {
                if let Some(first) = owners.insert(name, &step.title) {
                    return Err(WizardError::SharedField {
                        field: name.to_string(),
                        first: first.to_string(),
                        second: step.title.clone(),
                    });
                }
            }
        }

        let mut draft = Values::new();
        for step in &steps {
            draft.extend(step.schema.defaults());
        }
        for (name, value) in seed {
            draft.insert(name.clone(), value.clone());
        }

        let forms = steps
            .iter()
            .map(|step| FormState::new(Arc::clone(&step.schema), &draft))
            .collect();

        debug!(steps = steps.len(), mode = ?mode, sink = sink.entity_name(), "wizard created");

        Ok(Self {
            controller: StepController::new(steps.len()),
            steps,
            forms,
            draft,
            furthest: 0,
            mode,
            status: WizardStatus::Editing,
            submitting: false,
            sink,
            cache: None,
            notifications: None,
        })
    }

    /// Refresh the sink's cache keys after a successful submission
    pub fn with_cache(mut self, cache: Arc<ResourceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Report outcomes as notifications
    pub fn with_notifications(mut self, notifications: NotificationCenter) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn mode(&self) -> WizardMode {
        self.mode
    }

    pub fn status(&self) -> WizardStatus {
        self.status
    }

    pub fn draft(&self) -> &Values {
        &self.draft
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn controller(&self) -> &StepController {
        &self.controller
    }

    pub fn current_index(&self) -> usize {
        self.controller.current_index()
    }

    pub fn current_step(&self) -> &StepDescriptor {
        &self.steps[self.controller.current_index()]
    }

    pub fn current_form(&self) -> &FormState {
        &self.forms[self.controller.current_index()]
    }

    pub fn location(&self) -> String {
        self.controller.location()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Whether the primary action ("Next", "Create", "Update") is enabled
    pub fn can_advance(&self) -> bool {
        self.status == WizardStatus::Editing
            && !self.submitting
            && self.current_form().can_submit()
    }

    /// Edit a field on the displayed step
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), WizardError> {
        if self.status != WizardStatus::Editing {
            return Err(WizardError::Closed);
        }
        let index = self.controller.current_index();
        self.forms[index].set_field(name, value)?;
        Ok(())
    }

    /// Copy a step's owned values into the Draft
    fn merge_step(&mut self, index: usize, values: &Values) {
        for name in self.steps[index].schema.field_names() {
            if let Some(value) = values.get(name) {
                self.draft.insert(name.to_string(), value.clone());
            }
        }
    }

    /// Submit the displayed step. Advances when it is valid; on the terminal
    /// step sends the Draft to the sink.
    pub async fn next(&mut self, cancel: &CancellationToken) -> WizardOutcome {
        if self.status != WizardStatus::Editing {
            return WizardOutcome::Closed;
        }
        if self.submitting {
            return WizardOutcome::Busy;
        }

        let index = self.controller.current_index();
        let values = match self.forms[index].begin_submit() {
            SubmitStart::Ready(values) => values,
            SubmitStart::Invalid => {
                return WizardOutcome::Blocked(self.forms[index].errors().clone());
            }
            SubmitStart::AlreadySubmitting => return WizardOutcome::Busy,
        };
        self.merge_step(index, &values);
        self.forms[index].finish_submit();

        if !self.controller.is_terminal() {
            self.controller.advance();
            self.furthest = self.furthest.max(self.controller.current_index());
            debug!(step = self.controller.current_index(), "wizard advanced");
            return WizardOutcome::Advanced;
        }

        self.submit_draft(cancel).await
    }

    /// Re-check every step; on failure show the first invalid one
    fn revalidate_all(&mut self) -> Result<(), ValidationErrors> {
        for index in 0..self.forms.len() {
            if !self.forms[index].validate() {
                let errors = self.forms[index].errors().clone();
                self.controller.jump_to(index);
                return Err(errors);
            }
        }
        Ok(())
    }

    async fn submit_draft(&mut self, cancel: &CancellationToken) -> WizardOutcome {
        if let Err(errors) = self.revalidate_all() {
            return WizardOutcome::Blocked(errors);
        }

        self.submitting = true;
        let sink = Arc::clone(&self.sink);
        let draft = self.draft.clone();
        let mode = self.mode;

        let result = cancellable(cancel, async {
            sink.preflight(&draft).await?;
            match mode {
                WizardMode::Create => sink.create(&draft).await,
                WizardMode::Edit { id } => sink.update(id, &draft).await,
            }
        })
        .await;
        self.submitting = false;

        match result {
            Ok(response) => {
                self.status = WizardStatus::Completed;
                info!(entity = sink.entity_name(), mode = ?mode, "wizard submitted");
                self.refresh_cache(sink.as_ref()).await;
                if let Some(notifications) = &self.notifications {
                    notifications.success(format!(
                        "{} {} successfully",
                        sink.entity_name(),
                        mode.verb()
                    ));
                }
                WizardOutcome::Submitted(response)
            }
            Err(ApiError::Cancelled) => {
                debug!(entity = sink.entity_name(), "wizard submission cancelled");
                WizardOutcome::Cancelled
            }
            Err(e) => {
                warn!(entity = sink.entity_name(), error = %e, "wizard submission failed");
                if let Some(notifications) = &self.notifications {
                    notifications.error(e.user_message());
                }
                WizardOutcome::Failed(e)
            }
        }
    }

    async fn refresh_cache(&self, sink: &dyn DraftSink) {
        let Some(cache) = &self.cache else {
            return;
        };
        for key in sink.invalidates() {
            if let Err(e) = cache.invalidate(&key).await {
                // the listing shows the error on its own
                warn!(key = %key, error = %e, "cache refresh after submit failed");
            }
        }
    }

    /// Show the previous step; the Draft is untouched
    pub fn back(&mut self) -> bool {
        self.status == WizardStatus::Editing && self.controller.retreat()
    }

    /// Undo the last navigation, like a browser back button
    pub fn navigate_back(&mut self) -> bool {
        self.status == WizardStatus::Editing && self.controller.navigate_back()
    }

    /// Jump to a step already reached. Later steps stay locked until the
    /// steps before them have been submitted.
    pub fn jump_to(&mut self, index: usize) -> bool {
        self.status == WizardStatus::Editing && self.controller.jump_to(index.min(self.furthest))
    }

    /// Abandon the flow; nothing is sent
    pub fn cancel(&mut self) {
        if self.status == WizardStatus::Editing {
            debug!(entity = self.sink.entity_name(), "wizard cancelled");
            self.status = WizardStatus::Cancelled;
            self.draft.clear();
        }
    }

    /// Every owned field of every step with its Draft value, for review
    pub fn summary(&self) -> Vec<SummaryLine> {
        self.steps
            .iter()
            .filter(|step| !step.is_summary)
            .flat_map(|step| {
                step.schema.fields().iter().map(|field| SummaryLine {
                    step: step.title.clone(),
                    label: field.label.clone(),
                    value: self.draft.get(&field.name).cloned().unwrap_or(Value::Null),
                })
            })
            .collect()
    }
}
