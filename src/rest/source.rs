use super::RestClient;
use crate::error::HarnessResult;
use crate::page::{PageData, PageLink, PageSource};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// A list endpoint read through a logged-in [`RestClient`].
#[derive(Debug)]
pub struct RestPageSource<'a, T> {
    client: &'a RestClient,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> RestPageSource<'a, T> {
    pub fn new(client: &'a RestClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<T> PageSource<T> for RestPageSource<'_, T>
where
    T: DeserializeOwned + Send,
{
    async fn fetch_page(&self, link: &PageLink) -> HarnessResult<PageData<T>> {
        self.client.get_page(&self.path, link).await
    }
}
