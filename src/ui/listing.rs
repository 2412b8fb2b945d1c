//! Sorted, filterable, paginated tables of backend records
//!
//! Items come from the resource cache. The table sorts them once with its
//! comparator, filters the whole set with the search predicate, then slices
//! the result into pages.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{cancellable, ApiError};
use crate::cache::ResourceCache;
use crate::notifications::NotificationCenter;
use crate::ui::form::Values;

type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;
type Matcher<T> = Box<dyn Fn(&T, &str) -> bool + Send + Sync>;

pub struct ListingTable<T> {
    /// All items, already sorted
    items: Vec<T>,
    query: String,
    /// Current page (1-indexed)
    page: usize,
    page_size: usize,
    compare: Comparator<T>,
    matches: Matcher<T>,
    /// Last load error, shown above the table
    error: Option<ApiError>,
    is_loading: bool,
}

impl<T> ListingTable<T> {
    /// Create a table; a zero page size is treated as one
    pub fn new<C, M>(page_size: usize, compare: C, matches: M) -> Self
    where
        C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
        M: Fn(&T, &str) -> bool + Send + Sync + 'static,
    {
        Self {
            items: Vec::new(),
            query: String::new(),
            page: 1,
            page_size: page_size.max(1),
            compare: Box::new(compare),
            matches: Box::new(matches),
            error: None,
            is_loading: false,
        }
    }

    /// Replace the items, sorting them. The page is kept but re-clamped.
    pub fn set_items(&mut self, mut items: Vec<T>) {
        items.sort_by(|a, b| (self.compare)(a, b));
        self.items = items;
        self.clamp_page();
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Change the search text and return to the first page
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.page = 1;
    }

    /// Items matching the current query, in sorted order
    pub fn filtered_items(&self) -> Vec<&T> {
        let query = self.query.trim();
        if query.is_empty() {
            return self.items.iter().collect();
        }
        self.items
            .iter()
            .filter(|item| (self.matches)(*item, query))
            .collect()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages for the filtered items; zero when nothing matches
    pub fn page_count(&self) -> usize {
        self.filtered_items().len().div_ceil(self.page_size)
    }

    /// Current page (1-indexed), always within `1..=max(page_count, 1)`
    pub fn current_page(&self) -> usize {
        self.page
    }

    fn clamp_page(&mut self) {
        self.page = self.page.clamp(1, self.page_count().max(1));
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
        self.clamp_page();
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    /// Items on the current page
    pub fn page_items(&self) -> Vec<&T> {
        let start = (self.page - 1) * self.page_size;
        self.filtered_items()
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Footer text such as "Page 2/5" or "3 items"
    pub fn footer(&self) -> String {
        let count = self.filtered_items().len();
        if self.page_count() <= 1 {
            format!("{count} items")
        } else {
            format!("Page {}/{}", self.page, self.page_count())
        }
    }
}

impl<T: DeserializeOwned> ListingTable<T> {
    /// Pull the latest snapshot of `key` from the cache
    pub fn sync_from_cache(&mut self, cache: &ResourceCache, key: &str) {
        let resource = cache.resource::<Vec<T>>(key);
        self.is_loading = resource.is_loading;
        self.error = resource.error;
        if let Some(items) = resource.data {
            self.set_items(items);
        }
    }

    /// Load `key` through the cache, then sync
    pub async fn load(&mut self, cache: &ResourceCache, key: &str) -> Result<(), ApiError> {
        let result = cache.load(key).await.map(|_| ());
        self.sync_from_cache(cache, key);
        result
    }
}

/// Per-row actions for a record type
#[async_trait]
pub trait RowActions<T: Sync>: Send + Sync {
    /// Cache key of the listing the row belongs to
    fn cache_key(&self) -> &str;

    /// Short name of the row for notifications
    fn describe(&self, item: &T) -> String;

    async fn delete(&self, item: &T) -> Result<(), ApiError>;

    /// Entity id and Draft seed for an edit wizard
    fn seed(&self, item: &T) -> (i64, Values);
}

impl<T: DeserializeOwned + Sync> ListingTable<T> {
    /// Delete a row on the backend. On success the listing is refreshed and
    /// the row disappears; on failure the server's message is pushed as an
    /// error notification and the row stays.
    pub async fn delete_row(
        &mut self,
        item: &T,
        actions: &dyn RowActions<T>,
        cache: &ResourceCache,
        notifications: &NotificationCenter,
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        let name = actions.describe(item);
        match cancellable(cancel, actions.delete(item)).await {
            Ok(()) => {
                debug!(row = %name, "row deleted");
                notifications.success(format!("{name} deleted"));
                if let Err(e) = cache.invalidate(actions.cache_key()).await {
                    warn!(key = actions.cache_key(), error = %e, "listing refresh failed");
                }
                self.sync_from_cache(cache, actions.cache_key());
                Ok(())
            }
            Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
            Err(e) => {
                warn!(row = %name, error = %e, "row delete failed");
                notifications.error(e.user_message());
                Err(e)
            }
        }
    }

    /// Seed for editing `item` in a wizard
    pub fn edit_row(&self, item: &T, actions: &dyn RowActions<T>) -> (i64, Values) {
        actions.seed(item)
    }
}

/// Case-insensitive substring test used by most listing predicates
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
