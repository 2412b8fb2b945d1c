//! Standard answer wizard, listing and row actions

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{by_name, from_draft, to_values};
use crate::api::standard_answers::{
    self, StandardAnswer, StandardAnswerRequest, STANDARD_ANSWER_PATH,
};
use crate::api::{AdminClient, ApiError};
use crate::ui::form::{FieldDescriptor, FormSchema, ListItemKind, SchemaError, Values};
use crate::ui::listing::{contains_ignore_case, ListingTable, RowActions};
use crate::ui::wizard::{DraftSink, StepDescriptor, Wizard, WizardError};

pub fn steps() -> Result<Vec<StepDescriptor>, SchemaError> {
    Ok(vec![StepDescriptor::new(
        "Standard Answer",
        FormSchema::new(
            vec![
                FieldDescriptor::text("keyword", "Keyword")
                    .required()
                    .help("Questions containing this keyword get the answer below"),
                FieldDescriptor::text("answer", "Answer").required(),
                FieldDescriptor::list("categories", "Categories", ListItemKind::Integer),
            ],
            vec![],
        )?,
    )])
}

pub struct StandardAnswerSink {
    client: AdminClient,
}

impl StandardAnswerSink {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DraftSink for StandardAnswerSink {
    fn entity_name(&self) -> &str {
        "Standard answer"
    }

    fn invalidates(&self) -> Vec<String> {
        vec![STANDARD_ANSWER_PATH.to_string()]
    }

    async fn create(&self, draft: &Values) -> Result<Value, ApiError> {
        let request: StandardAnswerRequest = from_draft(draft)?;
        standard_answers::create(&self.client, &request).await
    }

    async fn update(&self, id: i64, draft: &Values) -> Result<Value, ApiError> {
        let request: StandardAnswerRequest = from_draft(draft)?;
        standard_answers::update(&self.client, id, &request).await
    }
}

pub fn seed_from(answer: &StandardAnswer) -> Values {
    to_values(&StandardAnswerRequest {
        keyword: answer.keyword.clone(),
        answer: answer.answer.clone(),
        categories: answer.category_ids(),
    })
}

pub fn create_wizard(client: AdminClient) -> Result<Wizard, WizardError> {
    Wizard::create(steps()?, Arc::new(StandardAnswerSink::new(client)))
}

pub fn edit_wizard(client: AdminClient, answer: &StandardAnswer) -> Result<Wizard, WizardError> {
    Wizard::edit(
        steps()?,
        Arc::new(StandardAnswerSink::new(client)),
        answer.id,
        &seed_from(answer),
    )
}

/// Sorted by keyword; the query matches keyword, answer or category
pub fn listing(page_size: usize) -> ListingTable<StandardAnswer> {
    ListingTable::new(
        page_size,
        |a: &StandardAnswer, b: &StandardAnswer| by_name(&a.keyword, &b.keyword),
        |answer: &StandardAnswer, query: &str| {
            contains_ignore_case(&answer.keyword, query)
                || contains_ignore_case(&answer.answer, query)
                || answer
                    .categories
                    .iter()
                    .any(|c| contains_ignore_case(&c.name, query))
        },
    )
}

pub struct StandardAnswerActions {
    client: AdminClient,
}

impl StandardAnswerActions {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RowActions<StandardAnswer> for StandardAnswerActions {
    fn cache_key(&self) -> &str {
        STANDARD_ANSWER_PATH
    }

    fn describe(&self, item: &StandardAnswer) -> String {
        format!("Standard answer '{}'", item.keyword)
    }

    async fn delete(&self, item: &StandardAnswer) -> Result<(), ApiError> {
        standard_answers::delete(&self.client, item.id).await
    }

    fn seed(&self, item: &StandardAnswer) -> (i64, Values) {
        (item.id, seed_from(item))
    }
}
