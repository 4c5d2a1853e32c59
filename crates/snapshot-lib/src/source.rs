//! Paginated listing of cluster objects
//!
//! The API server returns large collections in pages linked by continue
//! tokens. [`list_all`] follows the chain until the server stops handing out
//! tokens, so callers always see the complete collection.

use crate::error::{Result, SnapshotError};
use async_trait::async_trait;
use tracing::{debug, info};

/// One page of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Token for the next page, absent on the last one
    pub continue_token: Option<String>,
}

/// Source of paginated object listings
#[async_trait]
pub trait PagedLister<T>: Send + Sync {
    /// Fetch the page starting at `continue_token`, holding at most `limit` items
    async fn list_page(
        &self,
        limit: Option<u32>,
        continue_token: Option<&str>,
    ) -> anyhow::Result<Page<T>>;
}

/// List every object, following continue tokens.
///
/// A `page_size` of zero requests everything in one page.
pub async fn list_all<T, L>(lister: &L, page_size: u32) -> Result<Vec<T>>
where
    T: Send,
    L: PagedLister<T> + ?Sized,
{
    let limit = (page_size > 0).then_some(page_size);
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0;

    loop {
        let page = lister
            .list_page(limit, token.as_deref())
            .await
            .map_err(|source| SnapshotError::Listing { pages, source })?;
        pages += 1;
        debug!(page = pages, items = page.items.len(), "Listed page");
        items.extend(page.items);

        match page.continue_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }

    info!(pages, total = items.len(), "Listing complete");
    Ok(items)
}

/// Serves an in-memory collection in pages.
///
/// Continue tokens are item offsets. Used for objects loaded from files.
#[derive(Debug, Clone, Default)]
pub struct VecLister<T> {
    items: Vec<T>,
}

impl<T> VecLister<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> PagedLister<T> for VecLister<T> {
    async fn list_page(
        &self,
        limit: Option<u32>,
        continue_token: Option<&str>,
    ) -> anyhow::Result<Page<T>> {
        let start = match continue_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("invalid continue token {token:?}"))?,
            None => 0,
        };
        if start > self.items.len() {
            anyhow::bail!("continue token {start} is past the end of the listing");
        }
        let end = match limit {
            Some(limit) => (start + limit as usize).min(self.items.len()),
            None => self.items.len(),
        };
        let continue_token = (end < self.items.len()).then(|| end.to_string());
        Ok(Page {
            items: self.items[start..end].to_vec(),
            continue_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails after serving a fixed number of pages
    struct FlakyLister {
        inner: VecLister<u32>,
        calls: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait]
    impl PagedLister<u32> for FlakyLister {
        async fn list_page(
            &self,
            limit: Option<u32>,
            continue_token: Option<&str>,
        ) -> anyhow::Result<Page<u32>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_on {
                anyhow::bail!("connection reset");
            }
            self.inner.list_page(limit, continue_token).await
        }
    }

    #[tokio::test]
    async fn test_list_all_follows_tokens() {
        let lister = VecLister::new((0..7).collect::<Vec<u32>>());
        let items = list_all(&lister, 3).await.unwrap();
        assert_eq!(items, (0..7).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_list_all_without_limit() {
        let lister = VecLister::new(vec![1u32, 2, 3]);
        let page = lister.list_page(None, None).await.unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.continue_token.is_none());
        assert_eq!(list_all(&lister, 0).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_list_all_empty() {
        let lister = VecLister::<u32>::new(Vec::new());
        assert!(list_all(&lister, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_reports_completed_pages() {
        let lister = FlakyLister {
            inner: VecLister::new((0..10).collect()),
            calls: AtomicUsize::new(0),
            fail_on: 2,
        };
        let err = list_all(&lister, 3).await.unwrap_err();
        match err {
            SnapshotError::Listing { pages, .. } => assert_eq!(pages, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_token() {
        let lister = VecLister::new(vec![1u32]);
        let result = tokio_test::block_on(lister.list_page(Some(1), Some("abc")));
        assert!(result.is_err());
        let result = tokio_test::block_on(lister.list_page(Some(1), Some("5")));
        assert!(result.is_err());
    }
}
