//! Exhaustive pagination over a cursor-based API.
//!
//! The drain loop issues the first request, appends the returned data, and
//! while the response reports `hasNext` derives the next cursor and repeats.
//! There is no retry: an error from the source aborts the drain, because the
//! caller's job is to detect a misbehaving server rather than to tolerate one.

use super::{Cursor, PageData, PageLink, TimePageLink};
use crate::error::{HarnessError, HarnessResult};
use log::{debug, trace};
use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;

/// A paged endpoint that can be drained.
pub trait PageSource<T>: Send + Sync {
    /// Fetch the page addressed by `link`.
    fn fetch_page(
        &self,
        link: &PageLink,
    ) -> impl Future<Output = HarnessResult<PageData<T>>> + Send;
}

/// Drain every page of `source`, starting at `first`.
pub async fn drain<T, S>(source: &S, first: PageLink) -> HarnessResult<Vec<T>>
where
    S: PageSource<T>,
{
    drain_with(first, |link| async move { source.fetch_page(&link).await }).await
}

/// Drain with an arbitrary fetch function.
///
/// An empty result set terminates after exactly one call. A page that
/// reports `hasNext` while carrying no data fails with
/// [`HarnessError::Pagination`] instead of looping forever.
pub async fn drain_with<C, T, F, Fut>(first: C, fetch: F) -> HarnessResult<Vec<T>>
where
    C: Cursor,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = HarnessResult<PageData<T>>>,
{
    drain_inspect(first, fetch, |_, _| Ok(())).await
}

/// Drain and reject any element whose key was already seen.
pub async fn drain_unique<C, T, K, KF, F, Fut>(
    first: C,
    key_of: KF,
    fetch: F,
) -> HarnessResult<Vec<T>>
where
    C: Cursor,
    K: Eq + Hash,
    KF: Fn(&T) -> K,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = HarnessResult<PageData<T>>>,
{
    let mut seen = HashSet::new();
    drain_inspect(first, fetch, |page, data: &[T]| {
        for item in data {
            if !seen.insert(key_of(item)) {
                return Err(HarnessError::pagination(page, "element returned more than once"));
            }
        }
        Ok(())
    })
    .await
}

async fn drain_inspect<C, T, F, Fut, I>(first: C, mut fetch: F, mut inspect: I) -> HarnessResult<Vec<T>>
where
    C: Cursor,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = HarnessResult<PageData<T>>>,
    I: FnMut(usize, &[T]) -> HarnessResult<()>,
{
    let mut cursor = first;
    let mut items = Vec::new();

    loop {
        let page = fetch(cursor.clone()).await?;
        let received = page.data.len();
        let has_next = page.has_next;
        trace!(
            "Fetched page {} with {} elements (total {}, hasNext {})",
            cursor.page_index(),
            received,
            page.total_elements,
            has_next
        );
        inspect(cursor.page_index(), &page.data)?;
        items.extend(page.data);

        if !has_next {
            break;
        }
        if received == 0 {
            return Err(HarnessError::pagination(
                cursor.page_index(),
                "server reported hasNext on an empty page",
            ));
        }
        cursor = cursor.next_cursor();
    }

    debug!(
        "Drained {} elements over {} pages",
        items.len(),
        cursor.page_index() + 1
    );
    Ok(items)
}

/// Drain a time-bounded endpoint.
pub async fn drain_time<T, F, Fut>(first: TimePageLink, fetch: F) -> HarnessResult<Vec<T>>
where
    F: FnMut(TimePageLink) -> Fut,
    Fut: Future<Output = HarnessResult<PageData<T>>>,
{
    drain_with(first, fetch).await
}
