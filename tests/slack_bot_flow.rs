//! Integration tests for Slack bot config deletion

mod common;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{MockBackend, MockState, Recorded};
use enmedd_admin::admin::slack_bots as slack_admin;
use enmedd_admin::api::slack_bots::SLACK_BOT_CONFIG_PATH;
use enmedd_admin::api::ApiError;
use enmedd_admin::notifications::NotificationLevel;

fn bot(id: i64, channel: &str) -> serde_json::Value {
    json!({
        "id": id,
        "persona": null,
        "channel_config": {"channel_names": [channel]},
        "response_type": "citations",
        "enable_auto_filters": false
    })
}

async fn backend(delete_error: Option<&str>) -> MockBackend {
    MockBackend::start(MockState {
        slack_configs: vec![bot(7, "support"), bot(3, "eng")],
        delete_error: delete_error.map(str::to_string),
        ..Default::default()
    })
    .await
}

#[tokio::test]
async fn test_failed_delete_keeps_row_and_shows_detail() {
    let backend = backend(Some("Slack bot config is in use")).await;
    let session = backend.session();
    let cancel = CancellationToken::new();
    let actions = slack_admin::SlackBotConfigActions::new(session.client.clone());

    let mut table = slack_admin::listing(session.page_size());
    table.load(&session.cache, SLACK_BOT_CONFIG_PATH).await.unwrap();
    let ids: Vec<i64> = table.items().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![3, 7]);

    let row = table.items()[1].clone();
    let err = table
        .delete_row(&row, &actions, &session.cache, &session.notifications, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::http(400, "Slack bot config is in use"));
    assert_eq!(
        backend.recorded(),
        vec![Recorded {
            method: "DELETE",
            path: format!("{SLACK_BOT_CONFIG_PATH}/7"),
            body: serde_json::Value::Null,
        }]
    );

    // row is still listed and the listing was not refetched
    assert_eq!(table.len(), 2);
    assert_eq!(backend.get_count(SLACK_BOT_CONFIG_PATH), 1);

    let active = session.notifications.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].level, NotificationLevel::Error);
    assert_eq!(active[0].message, "Slack bot config is in use");
}

#[tokio::test]
async fn test_successful_delete_refreshes_listing() {
    let backend = backend(None).await;
    let session = backend.session();
    let cancel = CancellationToken::new();
    let actions = slack_admin::SlackBotConfigActions::new(session.client.clone());

    let mut table = slack_admin::listing(session.page_size());
    table.load(&session.cache, SLACK_BOT_CONFIG_PATH).await.unwrap();
    let row = table
        .items()
        .iter()
        .find(|c| c.id == 7)
        .cloned()
        .unwrap();

    table
        .delete_row(&row, &actions, &session.cache, &session.notifications, &cancel)
        .await
        .unwrap();

    let ids: Vec<i64> = table.items().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![3]);
    assert_eq!(backend.get_count(SLACK_BOT_CONFIG_PATH), 2);
    assert_eq!(
        session.notifications.active()[0].message,
        "Slack bot config for #support deleted"
    );
}

#[tokio::test]
async fn test_cancelled_delete_sends_nothing_visible() {
    let backend = backend(None).await;
    let session = backend.session();
    let cancel = CancellationToken::new();
    let actions = slack_admin::SlackBotConfigActions::new(session.client.clone());

    let mut table = slack_admin::listing(session.page_size());
    table.load(&session.cache, SLACK_BOT_CONFIG_PATH).await.unwrap();
    let row = table.items()[0].clone();

    cancel.cancel();
    let err = table
        .delete_row(&row, &actions, &session.cache, &session.notifications, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(table.len(), 2);
    assert!(session.notifications.active().is_empty());
}
