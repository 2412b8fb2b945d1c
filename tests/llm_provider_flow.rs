//! Integration tests for the LLM provider wizard

mod common;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{MockBackend, MockState};
use enmedd_admin::admin::llm_providers as llm_admin;
use enmedd_admin::api::llm_providers::{self, FullLlmProvider, LLM_PROVIDER_PATH};
use enmedd_admin::ui::{WizardOutcome, WizardStatus};

fn openai_option() -> serde_json::Value {
    json!({
        "name": "openai",
        "display_name": "OpenAI",
        "api_key_required": true,
        "api_base_required": false,
        "api_version_required": false,
        "custom_config_keys": [],
        "llm_names": ["gpt-4o", "gpt-4o-mini"],
        "default_model": "gpt-4o",
        "default_fast_model": "gpt-4o-mini"
    })
}

async fn backend(test_error: Option<&str>) -> MockBackend {
    MockBackend::start(MockState {
        llm_options: vec![openai_option()],
        llm_test_error: test_error.map(str::to_string),
        ..Default::default()
    })
    .await
}

#[tokio::test]
async fn test_missing_required_api_key_blocks_wizard() {
    let backend = backend(None).await;
    let session = backend.session();
    let cancel = CancellationToken::new();

    let options = llm_providers::built_in_options(&session.client).await.unwrap();
    let mut wizard = llm_admin::create_wizard(session.client.clone(), &options[0]).unwrap();

    wizard.set_field("name", json!("Main")).unwrap();
    wizard.set_field("api_key", json!("")).unwrap();
    assert!(!wizard.can_advance());

    let outcome = wizard.next(&cancel).await;
    let WizardOutcome::Blocked(errors) = outcome else {
        panic!("expected Blocked, got {outcome:?}");
    };
    assert_eq!(errors["api_key"], "API Key is required");
    assert_eq!(wizard.current_index(), 0);

    wizard.set_field("api_key", json!("sk-123")).unwrap();
    assert!(wizard.can_advance());
    assert!(backend.recorded().is_empty());
}

#[tokio::test]
async fn test_failed_preflight_keeps_draft() {
    let backend = backend(Some("Invalid API key provided")).await;
    let session = backend.session();
    let cancel = CancellationToken::new();

    let options = llm_providers::built_in_options(&session.client).await.unwrap();
    let mut wizard = llm_admin::create_wizard(session.client.clone(), &options[0])
        .unwrap()
        .with_notifications(session.notifications.clone());

    wizard.set_field("name", json!("Main")).unwrap();
    wizard.set_field("api_key", json!("sk-bad")).unwrap();
    assert_eq!(wizard.next(&cancel).await, WizardOutcome::Advanced);

    let outcome = wizard.next(&cancel).await;
    assert!(matches!(outcome, WizardOutcome::Failed(_)), "{outcome:?}");
    assert_eq!(wizard.status(), WizardStatus::Editing);
    assert_eq!(wizard.draft()["api_key"], json!("sk-bad"));

    // only the test call went out; nothing was saved
    let recorded = backend.recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].path, "/api/admin/llm/test");
    assert_eq!(
        session.notifications.active()[0].message,
        "Invalid API key provided"
    );
}

#[tokio::test]
async fn test_successful_create_tests_then_saves() {
    let backend = backend(None).await;
    let session = backend.session();
    let cancel = CancellationToken::new();

    let options = llm_providers::built_in_options(&session.client).await.unwrap();
    let mut wizard = llm_admin::create_wizard(session.client.clone(), &options[0])
        .unwrap()
        .with_cache(session.cache.clone());

    wizard.set_field("name", json!("Main")).unwrap();
    wizard.set_field("api_key", json!("sk-123")).unwrap();
    assert_eq!(wizard.next(&cancel).await, WizardOutcome::Advanced);
    assert!(matches!(
        wizard.next(&cancel).await,
        WizardOutcome::Submitted(_)
    ));

    let recorded = backend.recorded();
    let paths: Vec<&str> = recorded.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/api/admin/llm/test", LLM_PROVIDER_PATH]);

    let saved = &recorded[1].body;
    assert_eq!(saved["provider"], json!("openai"));
    assert_eq!(saved["api_key"], json!("sk-123"));
    assert_eq!(saved["default_model_name"], json!("gpt-4o"));
    assert_eq!(saved["fast_default_model_name"], json!("gpt-4o-mini"));
    assert_eq!(saved["api_base"], serde_json::Value::Null);

    // listing key was refreshed by the wizard
    let providers: Vec<FullLlmProvider> = session.cache.load_as(LLM_PROVIDER_PATH).await.unwrap();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0].name, "Main");
}
