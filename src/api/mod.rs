//! REST access to the enMedD AI admin API
//!
//! This module provides:
//! - `AdminClient`, the JSON client every request goes through
//! - Typed request/response models per admin resource
//! - Error handling that surfaces the server's `detail` message

pub mod client;
pub mod document_sets;
pub mod error;
pub mod health;
pub mod llm_providers;
pub mod search_settings;
pub mod slack_bots;
pub mod standard_answers;

pub use client::AdminClient;
pub use error::ApiError;

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::cache::Fetcher;

/// Run `fut` unless `cancel` fires first.
///
/// A cancelled operation resolves to `ApiError::Cancelled`; the in-flight
/// request is dropped and its response is never observed.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ApiError::Cancelled),
        result = fut => result,
    }
}

#[async_trait]
impl Fetcher for AdminClient {
    async fn fetch(&self, key: &str) -> Result<serde_json::Value, ApiError> {
        self.get(key).await
    }
}
