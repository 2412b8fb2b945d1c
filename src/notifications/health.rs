//! Backend health polling and the banner it drives.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::health::HEALTH_PATH;
use crate::cache::Fetcher;

#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    /// No check has completed yet
    Unknown,
    Healthy,
    Unhealthy { reason: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Persistent, informational banner shown while the backend is unhealthy
#[derive(Debug, Clone, PartialEq)]
pub struct HealthBanner {
    pub message: String,
    pub since: DateTime<Utc>,
}

impl HealthBanner {
    const MESSAGE: &'static str =
        "The backend is currently unavailable. Some features may not work until it recovers.";
}

struct State {
    status: HealthStatus,
    banner: Option<HealthBanner>,
}

pub struct HealthMonitor {
    fetcher: Arc<dyn Fetcher>,
    tx: watch::Sender<HealthStatus>,
    state: std::sync::Mutex<State>,
}

impl HealthMonitor {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        let (tx, _rx) = watch::channel(HealthStatus::Unknown);
        Self {
            fetcher,
            tx,
            state: std::sync::Mutex::new(State {
                status: HealthStatus::Unknown,
                banner: None,
            }),
        }
    }

    pub fn status(&self) -> HealthStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthStatus> {
        self.tx.subscribe()
    }

    /// Banner to display, if any
    pub fn banner(&self) -> Option<HealthBanner> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .banner
            .clone()
    }

    /// Run one health check and publish the result
    pub async fn check_once(&self) -> HealthStatus {
        let status = match self.fetcher.fetch(HEALTH_PATH).await {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy {
                reason: e.user_message(),
            },
        };

        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let was_healthy = !matches!(state.status, HealthStatus::Unhealthy { .. });
            match (&status, was_healthy) {
                (HealthStatus::Unhealthy { reason }, true) => {
                    warn!(reason = %reason, "backend health check failing");
                    state.banner = Some(HealthBanner {
                        message: HealthBanner::MESSAGE.to_string(),
                        since: Utc::now(),
                    });
                }
                (HealthStatus::Healthy, false) => {
                    info!("backend health restored");
                    state.banner = None;
                }
                _ => {}
            }
            state.status = status.clone();
        }

        self.tx.send_replace(status.clone());
        status
    }

    /// Poll every `interval` until `cancel` fires
    pub fn spawn(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        monitor.check_once().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Toggle(AtomicBool);

    #[async_trait]
    impl Fetcher for Toggle {
        async fn fetch(&self, key: &str) -> Result<Value, ApiError> {
            assert_eq!(key, HEALTH_PATH);
            if self.0.load(Ordering::SeqCst) {
                Ok(Value::Null)
            } else {
                Err(ApiError::network("connection refused"))
            }
        }
    }

    #[tokio::test]
    async fn test_banner_follows_health() {
        let fetcher = Arc::new(Toggle(AtomicBool::new(false)));
        let monitor = HealthMonitor::new(fetcher.clone());
        assert_eq!(monitor.status(), HealthStatus::Unknown);
        assert!(monitor.banner().is_none());

        let status = monitor.check_once().await;
        assert!(!status.is_healthy());
        let banner = monitor.banner().unwrap();

        // a second failure keeps the original banner
        monitor.check_once().await;
        assert_eq!(monitor.banner().unwrap().since, banner.since);

        fetcher.0.store(true, Ordering::SeqCst);
        assert!(monitor.check_once().await.is_healthy());
        assert!(monitor.banner().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_monitor_publishes() {
        let monitor = Arc::new(HealthMonitor::new(Arc::new(Toggle(AtomicBool::new(true)))));
        let mut rx = monitor.subscribe();
        let cancel = CancellationToken::new();
        let handle = monitor.spawn(Duration::from_secs(60), cancel.clone());

        rx.changed().await.unwrap();
        assert!(rx.borrow().is_healthy());

        cancel.cancel();
        handle.await.unwrap();
    }
}
