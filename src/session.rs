//! Shared per-session services

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::{AdminClient, ApiError};
use crate::cache::ResourceCache;
use crate::config::Config;
use crate::notifications::{HealthMonitor, NotificationCenter};

/// Everything the admin screens share for one session: the API client, the
/// resource cache, the notification queue and the health monitor.
pub struct Session {
    pub config: Config,
    pub client: AdminClient,
    pub cache: Arc<ResourceCache>,
    pub notifications: NotificationCenter,
    pub health: Arc<HealthMonitor>,
    pub cancel: CancellationToken,
}

impl Session {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let client = AdminClient::from_config(&config)?;
        let fetcher = Arc::new(client.clone());
        Ok(Self {
            cache: Arc::new(ResourceCache::new(fetcher.clone())),
            health: Arc::new(HealthMonitor::new(fetcher)),
            notifications: NotificationCenter::new(config.notification_ttl()),
            cancel: CancellationToken::new(),
            client,
            config,
        })
    }

    pub fn page_size(&self) -> usize {
        self.config.ui.page_size
    }

    /// Start background health polling; stops when the session is cancelled
    pub fn start_health_monitor(&self) -> tokio::task::JoinHandle<()> {
        self.health
            .spawn(self.config.cache.health_poll(), self.cancel.child_token())
    }

    /// Keep `key` fresh in the background at the configured listing rate
    pub fn revalidate(&self, key: &str) -> tokio::task::JoinHandle<()> {
        self.cache.spawn_revalidation(
            key,
            self.config.cache.revalidate_interval(),
            self.cancel.child_token(),
        )
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
