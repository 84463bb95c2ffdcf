//! Sequential page loop shared by all adapters.

use std::future::Future;

use crate::error::DiscoveryResult;
use crate::progress::{ProgressReporter, LARGE_ORG_NOTICE, LARGE_ORG_NOTICE_INTERVAL};

/// One page of results plus the cursor for the following page
#[derive(Debug)]
pub(crate) struct Page<T, C> {
    pub(crate) items: Vec<T>,
    pub(crate) next: Option<C>,
}

impl<T, C> Page<T, C> {
    pub(crate) fn new(items: Vec<T>, next: Option<C>) -> Self {
        Self { items, next }
    }
}

/// Clamp a requested page size to a forge's maximum; 0 means the maximum.
pub(crate) fn effective_page_size(requested: u32, max: u32) -> u32 {
    if requested == 0 || requested > max {
        max
    } else {
        requested
    }
}

/// Fetch pages one at a time, starting at `first`, until a page carries no
/// next cursor. Items keep the order the forge returned them in; nothing is
/// deduplicated. Any error aborts and drops what was collected.
///
/// With `progress` set, a large-listing notice goes out every
/// [`LARGE_ORG_NOTICE_INTERVAL`] pages while more pages remain.
pub(crate) async fn collect_pages<T, C, F, Fut>(
    first: C,
    mut fetch: F,
    progress: Option<&dyn ProgressReporter>,
) -> DiscoveryResult<Vec<T>>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = DiscoveryResult<Page<T, C>>>,
{
    let mut all_items = Vec::new();
    let mut cursor = Some(first);
    let mut pages_fetched: u32 = 0;

    while let Some(current) = cursor {
        let page = fetch(current).await?;
        pages_fetched += 1;
        all_items.extend(page.items);

        if page.next.is_some() && pages_fetched % LARGE_ORG_NOTICE_INTERVAL == 0 {
            if let Some(progress) = progress {
                progress.notice(LARGE_ORG_NOTICE);
            }
        }
        cursor = page.next;
    }

    Ok(all_items)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::{DiscoveryError, UpstreamError};
    use crate::progress::testing::RecordingProgress;

    /// Serves `pages` page-number style; records every requested page.
    struct FakePages {
        pages: Vec<Vec<u32>>,
        requested: RefCell<Vec<u32>>,
        fail_at: Option<u32>,
    }

    impl FakePages {
        fn new(pages: Vec<Vec<u32>>) -> Self {
            Self {
                pages,
                requested: RefCell::new(Vec::new()),
                fail_at: None,
            }
        }

        async fn fetch(&self, page: u32) -> DiscoveryResult<Page<u32, u32>> {
            self.requested.borrow_mut().push(page);
            if self.fail_at == Some(page) {
                return Err(DiscoveryError::upstream(
                    "fake",
                    UpstreamError::Status {
                        status: 502,
                        body: "bad gateway".to_string(),
                    },
                ));
            }
            let items = self.pages[(page - 1) as usize].clone();
            let next = if (page as usize) < self.pages.len() {
                Some(page + 1)
            } else {
                None
            };
            Ok(Page::new(items, next))
        }
    }

    #[tokio::test]
    async fn test_concatenates_all_pages_in_order() {
        let fake = FakePages::new(vec![vec![1, 2], vec![3], vec![4, 5, 6]]);

        let items = collect_pages(1, |page| fake.fetch(page), None).await.unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(*fake.requested.borrow(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_single_page_makes_one_request() {
        let fake = FakePages::new(vec![vec![7]]);

        let items = collect_pages(1, |page| fake.fetch(page), None).await.unwrap();

        assert_eq!(items, vec![7]);
        assert_eq!(fake.requested.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let fake = FakePages::new(vec![vec![1, 1], vec![1]]);

        let items = collect_pages(1, |page| fake.fetch(page), None).await.unwrap();

        assert_eq!(items, vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn test_error_discards_collected_items() {
        let mut fake = FakePages::new(vec![vec![1], vec![2], vec![3]]);
        fake.fail_at = Some(2);

        let result = collect_pages(1, |page| fake.fetch(page), None).await;

        assert!(matches!(result, Err(DiscoveryError::UpstreamApi { .. })));
        assert_eq!(*fake.requested.borrow(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_large_listing_notice_every_twelfth_page() {
        let fake = FakePages::new((1..=25).map(|n| vec![n]).collect());
        let progress = RecordingProgress::default();

        let items = collect_pages(1, |page| fake.fetch(page), Some(&progress))
            .await
            .unwrap();

        assert_eq!(items.len(), 25);
        // after page 12 and page 24; page 24 still has a successor
        assert_eq!(progress.notices(), vec![LARGE_ORG_NOTICE, LARGE_ORG_NOTICE]);
    }

    #[tokio::test]
    async fn test_no_notice_when_last_page_is_a_multiple_of_twelve() {
        let fake = FakePages::new((1..=12).map(|n| vec![n]).collect());
        let progress = RecordingProgress::default();

        collect_pages(1, |page| fake.fetch(page), Some(&progress))
            .await
            .unwrap();

        assert!(progress.notices().is_empty());
    }

    #[test]
    fn test_effective_page_size() {
        assert_eq!(effective_page_size(0, 100), 100);
        assert_eq!(effective_page_size(30, 100), 30);
        assert_eq!(effective_page_size(500, 50), 50);
    }
}
