//! Lazy, forward-only pagination over list endpoints.
//!
//! A [`PagedFetcher`] only describes a listing: creating one does no network
//! activity. Iteration is driven by [`Pages`] (one page at a time) or
//! [`Items`] (flattened). Both fetch page `n + 1` only after the outcome of
//! page `n` has been observed and only when more is asked for.
//!
//! There is no consistency snapshot across pages; items created or removed
//! on the server between two fetches may be skipped or repeated.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use http::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::classify::{Classifier, Decode};
use crate::client::Client;
use crate::handle::Call;
use crate::Result;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items on this page, in server order.
    pub items: Vec<T>,
    /// Zero-based page index.
    pub page: u32,
    /// Maximum number of items per page.
    pub page_size: u32,
    /// Total number of items in the whole listing.
    pub total_count: u32,
}

impl<T> Page<T> {
    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` if no page follows this one.
    ///
    /// That is the case when the page is short, or when the total count says
    /// every item has been delivered by now. A page size of zero can never
    /// advance, so such a page is always the last.
    pub fn is_last(&self) -> bool {
        let delivered = (u64::from(self.page) + 1) * u64::from(self.page_size);
        self.page_size == 0
            || self.items.is_empty()
            || self.items.len() < self.page_size as usize
            || delivered >= u64::from(self.total_count)
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[derive(Deserialize)]
struct RawPage {
    page: u32,
    page_size: u32,
    count: u32,
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

/// Decodes a page whose items live under a listing-specific key.
pub struct PageDecoder<T> {
    items_key: &'static str,
    _items: std::marker::PhantomData<fn() -> T>,
}

impl<T> PageDecoder<T> {
    /// Creates a decoder reading items from `items_key`.
    pub fn new(items_key: &'static str) -> Self {
        Self {
            items_key,
            _items: std::marker::PhantomData,
        }
    }
}

impl<T> Decode for PageDecoder<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = Page<T>;

    fn decode(&self, body: &[u8]) -> serde_json::Result<Page<T>> {
        let mut raw: RawPage = serde_json::from_slice(body)?;

        // Empty listings may omit the items array.
        let items = match raw.rest.remove(self.items_key) {
            Some(items) => serde_json::from_value(items)?,
            None => Vec::new(),
        };

        Ok(Page {
            items,
            page: raw.page,
            page_size: raw.page_size,
            total_count: raw.count,
        })
    }
}

/// A listing that can be fetched page by page.
pub trait PageSource: Clone + Send + Sync + 'static {
    /// The listed item.
    type Item: DeserializeOwned + Send + 'static;

    /// Sub-path of the listing endpoint, e.g. `/batches`.
    const PATH: &'static str;

    /// JSON key holding the items of a page.
    const ITEMS_KEY: &'static str;

    /// Query parameters selecting page `page` of this listing.
    fn query_params(&self, page: u32) -> Vec<(String, String)>;
}

/// Describes a paginated listing; see the module documentation.
#[derive(Clone)]
pub struct PagedFetcher<S> {
    client: Client,
    source: S,
}

impl<S: PageSource> PagedFetcher<S> {
    pub(crate) fn new(client: Client, source: S) -> Self {
        Self { client, source }
    }

    /// The filter this fetcher lists with.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// A single page, for callers who drive pagination themselves.
    pub fn fetch_page(&self, page: u32) -> Call<PageDecoder<S::Item>> {
        let url = self
            .client
            .url(S::PATH, &self.source.query_params(page));
        self.client.call(
            Method::GET,
            url,
            None,
            Classifier::new(PageDecoder::new(S::ITEMS_KEY)),
        )
    }

    /// A fresh page cursor starting at page 0.
    pub fn pages(&self) -> Pages<S> {
        Pages {
            fetcher: self.clone(),
            next_page: 0,
            done: false,
        }
    }

    /// A fresh item cursor starting at page 0.
    pub fn items(&self) -> Items<S> {
        Items {
            pages: self.pages(),
            buffer: VecDeque::new(),
        }
    }
}

impl<S: PageSource> IntoIterator for PagedFetcher<S> {
    type Item = Result<S::Item>;
    type IntoIter = Items<S>;

    fn into_iter(self) -> Items<S> {
        self.items()
    }
}

/// Forward-only cursor over the pages of a listing.
///
/// Usable asynchronously through [`next_page`](Pages::next_page) or as a
/// blocking [`Iterator`]. After the last page, or after yielding a failure,
/// the cursor is exhausted and issues no further requests.
pub struct Pages<S: PageSource> {
    fetcher: PagedFetcher<S>,
    next_page: u32,
    done: bool,
}

impl<S: PageSource> Pages<S> {
    /// Index of the page the next fetch would request.
    pub fn next_index(&self) -> u32 {
        self.next_page
    }

    /// Returns `true` once no further pages will be fetched.
    pub fn is_exhausted(&self) -> bool {
        self.done
    }

    /// Fetches the next page.
    pub async fn next_page(&mut self) -> Option<Result<Page<S::Item>>> {
        if self.done {
            return None;
        }
        let result = self.fetcher.fetch_page(self.next_page).await;
        Some(self.advance(result))
    }

    fn advance(&mut self, result: Result<Page<S::Item>>) -> Result<Page<S::Item>> {
        match &result {
            Ok(page) if !page.is_last() => self.next_page += 1,
            _ => self.done = true,
        }
        result
    }
}

impl<S: PageSource> Iterator for Pages<S> {
    type Item = Result<Page<S::Item>>;

    /// Blocks the current thread while the page is fetched.
    ///
    /// Panics if called from within an asynchronous execution context.
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.fetcher.fetch_page(self.next_page).blocking();
        Some(self.advance(result))
    }
}

impl<S: PageSource> FusedIterator for Pages<S> {}

/// Forward-only cursor over the items of a listing, across pages.
///
/// A failure while fetching a page is yielded once and ends the sequence.
/// Items yielded before the failure stay valid.
pub struct Items<S: PageSource> {
    pages: Pages<S>,
    buffer: VecDeque<S::Item>,
}

impl<S: PageSource> Items<S> {
    /// Returns the next item, fetching the next page when the current one is used up.
    pub async fn next_item(&mut self) -> Option<Result<S::Item>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            match self.pages.next_page().await? {
                Ok(page) => self.buffer.extend(page.items),
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Returns `true` once every item was yielded and no further pages will be fetched.
    pub fn is_exhausted(&self) -> bool {
        self.buffer.is_empty() && self.pages.is_exhausted()
    }
}

impl<S: PageSource> Iterator for Items<S> {
    type Item = Result<S::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            match self.pages.next()? {
                Ok(page) => self.buffer.extend(page.items),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<S: PageSource> FusedIterator for Items<S> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(items: Vec<u32>, page: u32, page_size: u32, total_count: u32) -> Page<u32> {
        Page {
            items,
            page,
            page_size,
            total_count,
        }
    }

    #[test]
    fn full_page_with_more_remaining_is_not_last() {
        assert!(!page(vec![1, 2], 0, 2, 5).is_last());
        assert!(!page(vec![3, 4], 1, 2, 5).is_last());
    }

    #[test]
    fn short_page_is_last() {
        assert!(page(vec![5], 2, 2, 5).is_last());
    }

    #[test]
    fn count_reached_is_last() {
        assert!(page(vec![1, 2], 1, 2, 4).is_last());
    }

    #[test]
    fn zero_page_size_is_last() {
        assert!(page(vec![1], 0, 0, 5).is_last());
        assert!(page(vec![1, 2], 4, 0, 100).is_last());
    }

    #[test]
    fn empty_page_is_last() {
        assert!(page(vec![], 0, 0, 0).is_last());
        assert!(page(vec![], 3, 10, 100).is_last());
    }

    #[test]
    fn decodes_items_under_key() {
        let decoder = PageDecoder::<String>::new("groups");
        let page = decoder
            .decode(br#"{"page":1,"page_size":2,"count":3,"groups":["c"]}"#)
            .unwrap();

        assert_eq!(page.items, vec!["c".to_string()]);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 2);
        assert_eq!(page.total_count, 3);
        assert!(page.is_last());
    }

    #[test]
    fn missing_items_key_means_no_items() {
        let decoder = PageDecoder::<String>::new("batches");
        let page = decoder
            .decode(br#"{"page":0,"page_size":30,"count":0}"#)
            .unwrap();

        assert!(page.is_empty());
    }

    #[test]
    fn malformed_items_fail_to_decode() {
        let decoder = PageDecoder::<u32>::new("batches");
        assert!(decoder
            .decode(br#"{"page":0,"page_size":30,"count":1,"batches":["x"]}"#)
            .is_err());
        assert!(decoder.decode(br#"{"batches":[]}"#).is_err());
    }
}
