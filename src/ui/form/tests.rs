//! Tests for form state

use std::sync::Arc;

use serde_json::{json, Value};

use super::*;

fn values(v: Value) -> Values {
    v.as_object().cloned().unwrap()
}

fn provider_schema(api_key_required: bool) -> Arc<FormSchema> {
    Arc::new(
        FormSchema::new(
            vec![
                FieldDescriptor::text("name", "Display Name").required(),
                FieldDescriptor::text("api_key", "API Key").required_when(api_key_required),
                FieldDescriptor::boolean("use_base", "Custom API base"),
                FieldDescriptor::text("api_base", "API Base"),
            ],
            vec![CrossFieldRule::required_if("api_base", "use_base", json!(true))],
        )
        .unwrap(),
    )
}

#[test]
fn test_new_overlays_initial_values_on_defaults() {
    let form = FormState::new(
        provider_schema(false),
        &values(json!({"name": "OpenAI", "unrelated": 1})),
    );
    assert_eq!(form.value("name"), Some(&json!("OpenAI")));
    assert_eq!(form.value("api_key"), Some(&json!("")));
    assert_eq!(form.value("use_base"), Some(&json!(false)));
    assert!(form.value("unrelated").is_none());
    assert!(form.errors().is_empty());
}

#[test]
fn test_set_field_unknown_name() {
    let mut form = FormState::new(provider_schema(false), &Values::new());
    assert_eq!(
        form.set_field("nope", json!(1)),
        Err(FormError::UnknownField("nope".to_string()))
    );
}

#[test]
fn test_set_field_revalidates_only_affected_fields() {
    let mut form = FormState::new(provider_schema(true), &Values::new());

    form.set_field("name", json!("")).unwrap();
    assert_eq!(form.error("name"), Some("Display Name is required"));
    // untouched required field is not flagged yet
    assert!(form.error("api_key").is_none());

    form.set_field("name", json!("OpenAI")).unwrap();
    assert!(form.error("name").is_none());
}

#[test]
fn test_cross_field_dependency_rechecked() {
    let mut form = FormState::new(provider_schema(false), &Values::new());

    form.set_field("use_base", json!(true)).unwrap();
    assert_eq!(form.error("api_base"), Some("API Base is required"));

    form.set_field("use_base", json!(false)).unwrap();
    assert!(form.error("api_base").is_none());
}

#[test]
fn test_api_key_required_blocks_submit() {
    let mut form = FormState::new(provider_schema(true), &values(json!({"name": "OpenAI"})));
    assert!(!form.can_submit());

    form.set_field("api_key", json!("sk-123")).unwrap();
    assert!(form.can_submit());

    let optional = FormState::new(provider_schema(false), &values(json!({"name": "Ollama"})));
    assert!(optional.can_submit());
}

#[tokio::test]
async fn test_submit_invalid_does_not_call_handler() {
    let mut form = FormState::new(provider_schema(true), &Values::new());
    let mut called = false;

    let outcome = form
        .submit(|_| {
            called = true;
            async {}
        })
        .await;

    assert_eq!(outcome, SubmitOutcome::Invalid);
    assert!(!called);
    assert_eq!(form.error("name"), Some("Display Name is required"));
    assert_eq!(form.error("api_key"), Some("API Key is required"));
    assert!(!form.is_submitting());
}

#[tokio::test]
async fn test_submit_valid_passes_values() {
    let mut form = FormState::new(
        provider_schema(false),
        &values(json!({"name": "Ollama"})),
    );

    let outcome = form
        .submit(|v| async move { v.get("name").cloned() })
        .await;

    assert_eq!(outcome, SubmitOutcome::Submitted(Some(json!("Ollama"))));
    assert!(!form.is_submitting());
    assert!(form.is_valid());
}

#[test]
fn test_begin_submit_refuses_reentry() {
    let mut form = FormState::new(provider_schema(false), &values(json!({"name": "x"})));

    assert!(matches!(form.begin_submit(), SubmitStart::Ready(_)));
    assert!(form.is_submitting());
    assert!(!form.can_submit());
    assert_eq!(form.begin_submit(), SubmitStart::AlreadySubmitting);

    form.finish_submit();
    assert!(matches!(form.begin_submit(), SubmitStart::Ready(_)));
}
