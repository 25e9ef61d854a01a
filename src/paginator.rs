//! Drives multi-page fetches with dedup and stop conditions.
//!
//! Two modes, chosen by `SearchOptions::concurrency`: a straight loop when
//! concurrency is 1, and a semaphore-bounded concurrent fetch when it is
//! >= 2. Both dedupe accumulated items by `(providerId, entityId)` and stop
//! on the first of: requested page count reached, requested item limit
//! satisfied, an empty page observed, or a reported total fully consumed.
//!
//! A failure fetching the first page is fatal. A failure on any later page
//! is logged and treated as the end of pagination — whatever was
//! accumulated so far is returned successfully, matching the runtime's
//! "non-first-page not-found terminates pagination successfully" rule.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::TrackedError;
use crate::types::Identifiable;

/// One page of results from a [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// Total item count reported by the source, if it reports one.
    pub total: Option<usize>,
}

/// Fetches a single page of items. Implemented per provider/endpoint.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    async fn fetch_page(&self, page: usize) -> Result<PageResult<T>, TrackedError>;
}

/// Pagination parameters, mirroring the relevant subset of
/// [`crate::types::SearchOptions`].
#[derive(Debug, Clone, Copy)]
pub struct PaginationOptions {
    /// 0 = derive from `limit`/keep going until a natural stop condition.
    pub pages: usize,
    /// 0 = no limit.
    pub limit: usize,
    /// 1 = sequential; >= 2 = bounded parallel with this many in-flight
    /// page fetches.
    pub concurrency: usize,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            pages: 0,
            limit: 0,
            concurrency: 1,
        }
    }
}

/// Drives a [`PageFetcher`] to completion per [`PaginationOptions`].
pub struct Paginator;

impl Paginator {
    /// Runs pagination to completion, returning the deduplicated,
    /// page-ordered accumulation.
    pub async fn run<T>(
        fetcher: &dyn PageFetcher<T>,
        options: PaginationOptions,
    ) -> Result<Vec<T>, TrackedError>
    where
        T: Identifiable + Send + 'static,
    {
        if options.concurrency >= 2 {
            Self::run_bounded_parallel(fetcher, options).await
        } else {
            Self::run_sequential(fetcher, options).await
        }
    }

    async fn run_sequential<T>(
        fetcher: &dyn PageFetcher<T>,
        options: PaginationOptions,
    ) -> Result<Vec<T>, TrackedError>
    where
        T: Identifiable,
    {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut results: Vec<T> = Vec::new();
        let mut page = 0usize;
        let mut consumed = 0usize;

        loop {
            let page_result = match fetcher.fetch_page(page).await {
                Ok(r) => r,
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, page, "pagination stopped on later-page failure");
                    break;
                }
            };

            let page_was_empty = page_result.items.is_empty();
            for item in page_result.items {
                let key = (item.provider_id().to_string(), item.entity_id().to_string());
                if seen.insert(key) {
                    results.push(item);
                }
            }
            consumed += 1;

            if should_stop(
                page,
                consumed,
                page_was_empty,
                page_result.total,
                results.len(),
                &options,
            ) {
                break;
            }
            page += 1;
        }

        Ok(trim_to_limit(results, &options))
    }

    async fn run_bounded_parallel<T>(
        fetcher: &dyn PageFetcher<T>,
        options: PaginationOptions,
    ) -> Result<Vec<T>, TrackedError>
    where
        T: Identifiable + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(options.concurrency));
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut results: Vec<T> = Vec::new();
        let mut next_page = 0usize;
        let mut stop_at: Option<usize> = None;

        loop {
            let batch_size = options.concurrency;
            let mut handles = Vec::with_capacity(batch_size);

            for offset in 0..batch_size {
                let page = next_page + offset;
                if let Some(stop) = stop_at {
                    if page > stop {
                        break;
                    }
                }
                let permit = semaphore.clone().acquire_owned().await.unwrap();
                let fetch = fetcher.fetch_page(page);
                handles.push(async move {
                    let r = fetch.await;
                    drop(permit);
                    (page, r)
                });
            }

            if handles.is_empty() {
                break;
            }

            let mut batch: Vec<(usize, Result<PageResult<T>, TrackedError>)> =
                futures::future::join_all(handles).await;
            batch.sort_by_key(|(page, _)| *page);

            let mut batch_stopped = false;
            for (page, outcome) in batch {
                match outcome {
                    Ok(page_result) => {
                        let page_was_empty = page_result.items.is_empty();
                        for item in page_result.items {
                            let key =
                                (item.provider_id().to_string(), item.entity_id().to_string());
                            if seen.insert(key) {
                                results.push(item);
                            }
                        }

                        if should_stop(
                            page,
                            page + 1,
                            page_was_empty,
                            page_result.total,
                            results.len(),
                            &options,
                        ) {
                            stop_at = Some(stop_at.map_or(page, |s| s.min(page)));
                            batch_stopped = true;
                        }
                    }
                    Err(e) if page == 0 => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            page,
                            "pagination stopped on later-page failure"
                        );
                        stop_at = Some(stop_at.map_or(page.saturating_sub(1), |s| s.min(page.saturating_sub(1))));
                        batch_stopped = true;
                    }
                }
            }

            next_page += batch_size;
            if batch_stopped && stop_at.is_some_and(|s| next_page > s) {
                break;
            }
        }

        Ok(trim_to_limit(results, &options))
    }
}

fn should_stop(
    page: usize,
    pages_consumed: usize,
    page_was_empty: bool,
    total: Option<usize>,
    accumulated: usize,
    options: &PaginationOptions,
) -> bool {
    let _ = page;
    if options.pages > 0 && pages_consumed >= options.pages {
        return true;
    }
    if options.pages == 0 && options.limit > 0 && accumulated >= options.limit {
        return true;
    }
    if page_was_empty {
        return true;
    }
    if let Some(total) = total {
        if accumulated >= total {
            return true;
        }
    }
    false
}

/// Trims to `limit` unless the caller supplied an explicit `pages` count,
/// in which case explicit pagination wins over the limit.
fn trim_to_limit<T>(mut results: Vec<T>, options: &PaginationOptions) -> Vec<T> {
    if options.pages == 0 && options.limit > 0 && results.len() > options.limit {
        results.truncate(options.limit);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Manga;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manga(id: &str) -> Manga {
        Manga {
            id: id.to_string(),
            provider_id: "test".to_string(),
            title: id.to_string(),
            alt_titles: vec![],
            authors: vec![],
            tags: vec![],
            status: None,
            description: None,
            cover_url: None,
        }
    }

    struct FixedPages {
        pages: Vec<Vec<Manga>>,
    }

    #[async_trait]
    impl PageFetcher<Manga> for FixedPages {
        async fn fetch_page(&self, page: usize) -> Result<PageResult<Manga>, TrackedError> {
            Ok(PageResult {
                items: self.pages.get(page).cloned().unwrap_or_default(),
                total: None,
            })
        }
    }

    #[tokio::test]
    async fn sequential_stops_on_empty_page() {
        let fetcher = FixedPages {
            pages: vec![vec![manga("a"), manga("b")], vec![]],
        };
        let result = Paginator::run(&fetcher, PaginationOptions::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn sequential_dedupes_across_pages() {
        let fetcher = FixedPages {
            pages: vec![vec![manga("a")], vec![manga("a"), manga("b")], vec![]],
        };
        let result = Paginator::run(&fetcher, PaginationOptions::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn explicit_pages_count_skips_limit_trim() {
        let fetcher = FixedPages {
            pages: vec![vec![manga("a"), manga("b"), manga("c")]],
        };
        let options = PaginationOptions {
            pages: 1,
            limit: 1,
            concurrency: 1,
        };
        let result = Paginator::run(&fetcher, options).await.unwrap();
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn limit_trims_when_pages_unspecified() {
        let fetcher = FixedPages {
            pages: vec![vec![manga("a"), manga("b"), manga("c")], vec![]],
        };
        let options = PaginationOptions {
            pages: 0,
            limit: 2,
            concurrency: 1,
        };
        let result = Paginator::run(&fetcher, options).await.unwrap();
        assert_eq!(result.len(), 2);
    }

    struct FirstPageFails;

    #[async_trait]
    impl PageFetcher<Manga> for FirstPageFails {
        async fn fetch_page(&self, _page: usize) -> Result<PageResult<Manga>, TrackedError> {
            Err(TrackedError::from(crate::error::Error::not_found("nope")))
        }
    }

    #[tokio::test]
    async fn first_page_failure_is_fatal() {
        let err = Paginator::run(&FirstPageFails, PaginationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.category(), crate::error::Category::NotFound);
    }

    struct FailsOnSecondPage {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher<Manga> for FailsOnSecondPage {
        async fn fetch_page(&self, page: usize) -> Result<PageResult<Manga>, TrackedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if page == 0 {
                Ok(PageResult {
                    items: vec![manga("a")],
                    total: None,
                })
            } else {
                Err(TrackedError::from(crate::error::Error::not_found("gone")))
            }
        }
    }

    #[tokio::test]
    async fn later_page_failure_returns_partial_results() {
        let fetcher = FailsOnSecondPage {
            calls: AtomicUsize::new(0),
        };
        let result = Paginator::run(&fetcher, PaginationOptions::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn bounded_parallel_dedupes_and_reassembles_in_order() {
        let fetcher = FixedPages {
            pages: vec![
                vec![manga("a"), manga("b")],
                vec![manga("c")],
                vec![],
            ],
        };
        let options = PaginationOptions {
            pages: 0,
            limit: 0,
            concurrency: 2,
        };
        let result = Paginator::run(&fetcher, options).await.unwrap();
        let ids: Vec<_> = result.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
