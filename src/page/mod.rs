//! Page-link cursors and paged results.
//!
//! The platform exposes every list endpoint through the same cursor shape: a
//! page size, a zero-based page index, an optional text filter and an optional
//! sort order go out as query parameters, and a `PageData` document comes
//! back with a `hasNext` continuation flag.
//!
//! # Example Usage
//!
//! ```rust
//! use iot_ws_harness::page::{PageLink, SortOrder};
//!
//! let first = PageLink::new(23)
//!     .unwrap()
//!     .with_text_search("Device")
//!     .with_sort_order(SortOrder::asc("name"));
//! let second = first.next_page_link();
//!
//! assert_eq!(second.page(), 1);
//! assert_eq!(second.page_size(), 23);
//! assert_eq!(second.text_search(), Some("Device"));
//! ```

pub mod drain;
pub mod in_memory;

pub use drain::{PageSource, drain, drain_time, drain_unique, drain_with};
pub use in_memory::{InMemoryPageSource, InMemoryPageSourceStats};

use crate::error::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};

/// Sort direction for paged queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort property and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub property: String,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Cursor over a paged result set.
///
/// A link is immutable: [`PageLink::next_page_link`] returns a new link with
/// the index incremented and the size, filter and sort order preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    page_size: usize,
    page: usize,
    text_search: Option<String>,
    sort_order: Option<SortOrder>,
}

impl PageLink {
    /// Create a link to the first page.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a zero page size.
    pub fn new(page_size: usize) -> HarnessResult<Self> {
        if page_size == 0 {
            return Err(HarnessError::invalid_argument("page size must be positive"));
        }
        Ok(Self {
            page_size,
            page: 0,
            text_search: None,
            sort_order: None,
        })
    }

    /// Set the starting page index.
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Set a text filter. Empty strings are treated as no filter.
    pub fn with_text_search(mut self, text_search: impl Into<String>) -> Self {
        let text = text_search.into();
        self.text_search = if text.is_empty() { None } else { Some(text) };
        self
    }

    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn text_search(&self) -> Option<&str> {
        self.text_search.as_deref()
    }

    pub fn sort_order(&self) -> Option<&SortOrder> {
        self.sort_order.as_ref()
    }

    /// Offset of the first element of this page, saturating at `usize::MAX`.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }

    /// Link to the following page.
    pub fn next_page_link(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    /// Query parameters in the order the platform documents them.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("pageSize", self.page_size.to_string()),
            ("page", self.page.to_string()),
        ];
        if let Some(text) = &self.text_search {
            params.push(("textSearch", text.clone()));
        }
        if let Some(order) = &self.sort_order {
            params.push(("sortProperty", order.property.clone()));
            params.push(("sortOrder", order.direction.as_str().to_string()));
        }
        params
    }
}

/// Page link restricted to a time range, in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePageLink {
    page_link: PageLink,
    start_time: Option<i64>,
    end_time: Option<i64>,
}

impl TimePageLink {
    pub fn new(page_size: usize) -> HarnessResult<Self> {
        Ok(Self {
            page_link: PageLink::new(page_size)?,
            start_time: None,
            end_time: None,
        })
    }

    pub fn from_page_link(page_link: PageLink) -> Self {
        Self {
            page_link,
            start_time: None,
            end_time: None,
        }
    }

    /// Restrict to `[start_time, end_time]`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `start_time > end_time`.
    pub fn with_time_range(mut self, start_time: i64, end_time: i64) -> HarnessResult<Self> {
        if start_time > end_time {
            return Err(HarnessError::invalid_argument(format!(
                "start time {} is after end time {}",
                start_time, end_time
            )));
        }
        self.start_time = Some(start_time);
        self.end_time = Some(end_time);
        Ok(self)
    }

    pub fn page_link(&self) -> &PageLink {
        &self.page_link
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<i64> {
        self.end_time
    }

    pub fn next_page_link(&self) -> Self {
        Self {
            page_link: self.page_link.next_page_link(),
            ..self.clone()
        }
    }

    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = self.page_link.to_query_params();
        if let Some(start) = self.start_time {
            params.push(("startTime", start.to_string()));
        }
        if let Some(end) = self.end_time {
            params.push(("endTime", end.to_string()));
        }
        params
    }
}

/// A cursor the drain loop can advance.
pub trait Cursor: Clone {
    /// Zero-based index of the page this cursor addresses.
    fn page_index(&self) -> usize;

    /// Cursor for the following page.
    fn next_cursor(&self) -> Self;
}

impl Cursor for PageLink {
    fn page_index(&self) -> usize {
        self.page
    }

    fn next_cursor(&self) -> Self {
        self.next_page_link()
    }
}

impl Cursor for TimePageLink {
    fn page_index(&self) -> usize {
        self.page_link.page
    }

    fn next_cursor(&self) -> Self {
        self.next_page_link()
    }
}

/// One page of a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData<T> {
    pub data: Vec<T>,
    pub total_pages: usize,
    pub total_elements: usize,
    pub has_next: bool,
}

impl<T> PageData<T> {
    pub fn new(data: Vec<T>, total_pages: usize, total_elements: usize, has_next: bool) -> Self {
        Self {
            data,
            total_pages,
            total_elements,
            has_next,
        }
    }

    /// A page of an empty result set.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 0, false)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn map<U, F>(self, f: F) -> PageData<U>
    where
        F: FnMut(T) -> U,
    {
        PageData {
            data: self.data.into_iter().map(f).collect(),
            total_pages: self.total_pages,
            total_elements: self.total_elements,
            has_next: self.has_next,
        }
    }
}

impl<T> Default for PageData<T> {
    fn default() -> Self {
        Self::empty()
    }
}
