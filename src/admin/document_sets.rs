//! Document set wizard, listing and row actions

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{by_name, from_draft, to_values};
use crate::api::document_sets::{
    self, DocumentSet, DocumentSetCreationRequest, DocumentSetUpdateRequest, DOCUMENT_SET_PATH,
};
use crate::api::{AdminClient, ApiError};
use crate::ui::form::{FieldDescriptor, FormSchema, ListItemKind, SchemaError, Values};
use crate::ui::listing::{contains_ignore_case, ListingTable, RowActions};
use crate::ui::wizard::{DraftSink, StepDescriptor, Wizard, WizardError};

/// Details, connectors, review
pub fn steps() -> Result<Vec<StepDescriptor>, SchemaError> {
    build_steps(true)
}

/// Steps for editing an existing set. The backend never renames a document
/// set, so `name` is not an editable field here.
pub fn edit_steps() -> Result<Vec<StepDescriptor>, SchemaError> {
    build_steps(false)
}

fn build_steps(with_name: bool) -> Result<Vec<StepDescriptor>, SchemaError> {
    let mut details = Vec::with_capacity(2);
    if with_name {
        details.push(
            FieldDescriptor::text("name", "Name")
                .required()
                .max(255.0)
                .help("A short, unique name for this document set"),
        );
    }
    details.push(
        FieldDescriptor::text("description", "Description")
            .required()
            .help("What kind of documents this set contains"),
    );

    Ok(vec![
        StepDescriptor::new("Details", FormSchema::new(details, vec![])?),
        StepDescriptor::new(
            "Connectors",
            FormSchema::new(
                vec![
                    FieldDescriptor::list("cc_pair_ids", "Connectors", ListItemKind::Integer)
                        .required()
                        .help("Connectors whose documents belong to this set"),
                ],
                vec![],
            )?,
        ),
        StepDescriptor::summary("Review"),
    ])
}

pub struct DocumentSetSink {
    client: AdminClient,
}

impl DocumentSetSink {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DraftSink for DocumentSetSink {
    fn entity_name(&self) -> &str {
        "Document set"
    }

    fn invalidates(&self) -> Vec<String> {
        vec![DOCUMENT_SET_PATH.to_string()]
    }

    async fn create(&self, draft: &Values) -> Result<Value, ApiError> {
        let request: DocumentSetCreationRequest = from_draft(draft)?;
        document_sets::create(&self.client, &request).await
    }

    async fn update(&self, id: i64, draft: &Values) -> Result<Value, ApiError> {
        let mut draft = draft.clone();
        draft.insert("id".to_string(), json!(id));
        let request: DocumentSetUpdateRequest = from_draft(&draft)?;
        document_sets::update(&self.client, &request).await
    }
}

/// Draft values for editing `set`
pub fn seed_from(set: &DocumentSet) -> Values {
    to_values(&DocumentSetCreationRequest {
        name: set.name.clone(),
        description: set.description.clone(),
        cc_pair_ids: set.cc_pair_ids(),
    })
}

pub fn create_wizard(client: AdminClient) -> Result<Wizard, WizardError> {
    Wizard::create(steps()?, Arc::new(DocumentSetSink::new(client)))
}

pub fn edit_wizard(client: AdminClient, set: &DocumentSet) -> Result<Wizard, WizardError> {
    Wizard::edit(
        edit_steps()?,
        Arc::new(DocumentSetSink::new(client)),
        set.id,
        &seed_from(set),
    )
}

/// Sorted by name; the query matches name or description
pub fn listing(page_size: usize) -> ListingTable<DocumentSet> {
    ListingTable::new(
        page_size,
        |a: &DocumentSet, b: &DocumentSet| by_name(&a.name, &b.name),
        |set: &DocumentSet, query: &str| {
            contains_ignore_case(&set.name, query) || contains_ignore_case(&set.description, query)
        },
    )
}

pub struct DocumentSetActions {
    client: AdminClient,
}

impl DocumentSetActions {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RowActions<DocumentSet> for DocumentSetActions {
    fn cache_key(&self) -> &str {
        DOCUMENT_SET_PATH
    }

    fn describe(&self, item: &DocumentSet) -> String {
        format!("Document set '{}'", item.name)
    }

    async fn delete(&self, item: &DocumentSet) -> Result<(), ApiError> {
        document_sets::delete(&self.client, item.id).await
    }

    fn seed(&self, item: &DocumentSet) -> (i64, Values) {
        (item.id, seed_from(item))
    }
}
