//! In-memory paged source with stable ordering.
//!
//! Elements are keyed by id and kept in a `BTreeMap`, so consecutive page
//! requests over unmutated data always see the same order. Text search matches
//! case-insensitively against a caller-supplied name extractor, the way the
//! platform filters list endpoints by `textSearch`.
//!
//! # Example Usage
//!
//! ```rust
//! use iot_ws_harness::page::{InMemoryPageSource, PageLink, drain};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = InMemoryPageSource::new(|name: &String| name.clone());
//! for i in 0..178 {
//!     source.put(format!("{:04}", i), format!("Device {}", i)).await;
//! }
//!
//! let all = drain(&source, PageLink::new(23)?).await?;
//! assert_eq!(all.len(), 178);
//! # Ok(())
//! # }
//! ```

use super::{PageData, PageLink, PageSource, SortDirection};
use crate::error::HarnessResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type NameFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Thread-safe in-memory page source.
pub struct InMemoryPageSource<T> {
    // Structure: element id -> element
    data: Arc<RwLock<BTreeMap<String, T>>>,
    name_of: NameFn<T>,
}

impl<T> Clone for InMemoryPageSource<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            name_of: Arc::clone(&self.name_of),
        }
    }
}

impl<T> InMemoryPageSource<T>
where
    T: Clone + Send + Sync,
{
    /// Create an empty source. `name_of` extracts the text that `textSearch`
    /// and name sorting apply to.
    pub fn new<F>(name_of: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            name_of: Arc::new(name_of),
        }
    }

    /// Insert or replace an element.
    pub async fn put(&self, id: impl Into<String>, item: T) {
        let mut guard = self.data.write().await;
        guard.insert(id.into(), item);
    }

    /// Remove an element, returning whether it existed.
    pub async fn delete(&self, id: &str) -> bool {
        let mut guard = self.data.write().await;
        guard.remove(id).is_some()
    }

    /// Clear all data (useful for testing).
    pub async fn clear(&self) {
        let mut guard = self.data.write().await;
        guard.clear();
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    /// Get statistics for debugging.
    pub async fn stats(&self) -> InMemoryPageSourceStats {
        let guard = self.data.read().await;
        let total_elements = guard.len();
        let distinct_names = guard
            .values()
            .map(|item| (self.name_of)(item))
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        InMemoryPageSourceStats {
            total_elements,
            distinct_names,
        }
    }

    /// Compute one page synchronously from a snapshot.
    fn page_from(&self, data: &BTreeMap<String, T>, link: &PageLink) -> PageData<T> {
        let needle = link.text_search().map(str::to_lowercase);

        let mut matching: Vec<(&String, &T)> = data
            .iter()
            .filter(|(_, item)| match &needle {
                Some(needle) => (self.name_of)(item).to_lowercase().contains(needle),
                None => true,
            })
            .collect();

        // Ties keep id order, which the BTreeMap already provides.
        if let Some(order) = link.sort_order() {
            matching.sort_by(|a, b| {
                let ordering = (self.name_of)(a.1).cmp(&(self.name_of)(b.1));
                match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let total_elements = matching.len();
        let total_pages = total_elements.div_ceil(link.page_size());
        let page: Vec<T> = matching
            .into_iter()
            .skip(link.offset())
            .take(link.page_size())
            .map(|(_, item)| item.clone())
            .collect();
        let has_next = link.offset().saturating_add(link.page_size()) < total_elements;

        PageData::new(page, total_pages, total_elements, has_next)
    }
}

impl<T> PageSource<T> for InMemoryPageSource<T>
where
    T: Clone + Send + Sync,
{
    async fn fetch_page(&self, link: &PageLink) -> HarnessResult<PageData<T>> {
        let guard = self.data.read().await;
        Ok(self.page_from(&guard, link))
    }
}

/// Statistics about the current state of an in-memory source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryPageSourceStats {
    /// Number of stored elements
    pub total_elements: usize,
    /// Number of distinct searchable names
    pub distinct_names: usize,
}
