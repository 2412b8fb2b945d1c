//! Backend health check

use super::{AdminClient, ApiError};

pub const HEALTH_PATH: &str = "/api/health";

/// `Ok(())` when the backend answers the health endpoint with a success status
pub async fn check(client: &AdminClient) -> Result<(), ApiError> {
    client
        .get::<serde_json::Value>(HEALTH_PATH)
        .await
        .map(|_| ())
}
