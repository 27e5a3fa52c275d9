// src/session.rs

//! A paged book search that records its queries in the search history.

use crate::api::BookSearchApi;
use crate::error::Result;
use crate::models::{
    Book, BookSearchData, BookSearchMeta, MAX_PAGE, MIN_PAGE, SearchParams, SearchTarget,
    SortOrder,
};
use crate::pagination::{PageInfo, Paginator};
use crate::storage::KeyValueStorage;
use crate::store::SearchHistoryStore;

/// Search state of one result list: the last request, its results and the
/// page cursor.
pub struct SearchSession<A, S: KeyValueStorage> {
    api: A,
    history: SearchHistoryStore<S>,
    params: SearchParams,
    paginator: Paginator,
    results: Option<BookSearchData>,
}

impl<A: BookSearchApi, S: KeyValueStorage> SearchSession<A, S> {
    /// Session showing `items_per_page` books per page, clamped to the
    /// page sizes the API accepts.
    pub fn new(api: A, history: SearchHistoryStore<S>, items_per_page: u32) -> Self {
        let page_size = items_per_page.clamp(MIN_PAGE, MAX_PAGE);
        if page_size != items_per_page {
            log::warn!(
                "Page size {} is out of range, using {}",
                items_per_page,
                page_size
            );
        }
        let paginator = Paginator::new(page_size as usize).with_auto_reset(false);
        Self {
            api,
            history,
            params: SearchParams::default(),
            paginator,
            results: None,
        }
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.params.sort = sort;
        self
    }

    /// Search all fields for `query`, starting at page 1.
    ///
    /// Blank queries do nothing and return `Ok(false)`.
    pub async fn search(&mut self, query: &str) -> Result<bool> {
        self.start(query, None).await
    }

    /// Search one field for `query`, starting at page 1.
    pub async fn search_with_target(
        &mut self,
        query: &str,
        target: SearchTarget,
    ) -> Result<bool> {
        self.start(query, Some(target)).await
    }

    async fn start(&mut self, query: &str, target: Option<SearchTarget>) -> Result<bool> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(false);
        }
        self.history.add_query(query);

        self.params = SearchParams {
            query: query.to_string(),
            sort: self.params.sort,
            page: Some(1),
            size: Some(self.paginator.items_per_page() as u32),
            target,
        };
        self.paginator.reset();
        self.fetch().await?;
        Ok(true)
    }

    /// Fetch page `page` of the current search.
    ///
    /// Returns `Ok(false)` without a request when there is no search, the
    /// page is out of range or already shown.
    pub async fn go_to_page(&mut self, page: usize) -> Result<bool> {
        if self.results.is_none() || page > MAX_PAGE as usize {
            return Ok(false);
        }
        let previous = self.paginator.current_page();
        if !self.paginator.go_to_page(page) {
            return Ok(false);
        }

        self.params.page = Some(page as u32);
        if let Err(e) = self.fetch().await {
            self.params.page = Some(previous as u32);
            self.paginator.go_to_page(previous);
            return Err(e);
        }
        Ok(true)
    }

    pub async fn next_page(&mut self) -> Result<bool> {
        if !self.paginator.has_next_page() {
            return Ok(false);
        }
        self.go_to_page(self.paginator.current_page() + 1).await
    }

    pub async fn previous_page(&mut self) -> Result<bool> {
        if !self.paginator.has_previous_page() {
            return Ok(false);
        }
        self.go_to_page(self.paginator.current_page() - 1).await
    }

    async fn fetch(&mut self) -> Result<()> {
        let data = self.api.search_books(&self.params).await?;
        log::info!(
            "Found {} books for '{}' (page {} of {})",
            data.meta.total_count,
            self.params.query,
            self.params.effective_page(),
            data.meta.total_count.div_ceil(self.paginator.items_per_page() as u64)
        );
        self.paginator.set_total_items(data.meta.total_count as usize);
        self.results = Some(data);
        Ok(())
    }

    pub fn books(&self) -> &[Book] {
        self.results
            .as_ref()
            .map(|data| data.books.as_slice())
            .unwrap_or_default()
    }

    pub fn meta(&self) -> Option<BookSearchMeta> {
        self.results.as_ref().map(|data| data.meta)
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub fn page_info(&self) -> PageInfo {
        self.paginator.page_info()
    }

    pub fn history(&self) -> &SearchHistoryStore<S> {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{BookSearchDocument, BookSearchResponse, HistoryConfig};
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Serves `total` numbered books and records every request.
    #[derive(Clone, Default)]
    struct FakeApi {
        total: u64,
        requests: Arc<Mutex<Vec<SearchParams>>>,
        fail: Arc<AtomicBool>,
    }

    impl FakeApi {
        fn with_total(total: u64) -> Self {
            Self {
                total,
                ..Default::default()
            }
        }

        fn requests(&self) -> Vec<SearchParams> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BookSearchApi for FakeApi {
        async fn search(&self, params: &SearchParams) -> Result<BookSearchResponse> {
            self.requests.lock().unwrap().push(params.clone());
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::api(500, "unavailable"));
            }

            let size = params.effective_size() as u64;
            let start = (params.effective_page() as u64 - 1) * size;
            let end = (start + size).min(self.total);
            let documents = (start..end)
                .map(|i| BookSearchDocument {
                    title: format!("Book {i}"),
                    isbn: format!("isbn-{i}"),
                    ..Default::default()
                })
                .collect();

            Ok(BookSearchResponse {
                documents,
                meta: BookSearchMeta {
                    is_end: end >= self.total,
                    pageable_count: self.total,
                    total_count: self.total,
                },
            })
        }
    }

    fn session(api: FakeApi) -> SearchSession<FakeApi, MemoryStorage> {
        let history = SearchHistoryStore::new(MemoryStorage::new(), &HistoryConfig::default());
        SearchSession::new(api, history, 10)
    }

    #[tokio::test]
    async fn test_search_fetches_first_page() {
        let api = FakeApi::with_total(25);
        let mut session = session(api.clone());

        assert!(session.search("  rust  ").await.unwrap());
        assert_eq!(session.books().len(), 10);
        assert_eq!(session.books()[0].id, "isbn-0");
        assert_eq!(session.meta().unwrap().total_count, 25);
        assert_eq!(session.paginator().total_pages(), 3);
        assert_eq!(session.page_info().showing, "1-10 of 25");

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query, "rust");
        assert_eq!(requests[0].page, Some(1));
        assert_eq!(requests[0].size, Some(10));
        assert_eq!(requests[0].target, None);
    }

    #[tokio::test]
    async fn test_blank_search_is_noop() {
        let api = FakeApi::with_total(5);
        let mut session = session(api.clone());

        assert!(!session.search("   ").await.unwrap());
        assert!(api.requests().is_empty());
        assert!(session.books().is_empty());
        assert!(!session.history().has_history());
    }

    #[tokio::test]
    async fn test_search_records_history() {
        let mut session = session(FakeApi::with_total(1));
        session.search("first").await.unwrap();
        session.search_with_target("second", SearchTarget::Person).await.unwrap();

        assert_eq!(session.history().recent_queries(), vec!["second", "first"]);
        assert_eq!(session.params().target, Some(SearchTarget::Person));
    }

    #[tokio::test]
    async fn test_go_to_page_refetches() {
        let api = FakeApi::with_total(25);
        let mut session = session(api.clone());

        assert!(!session.go_to_page(2).await.unwrap());
        session.search("rust").await.unwrap();

        assert!(session.go_to_page(3).await.unwrap());
        assert_eq!(session.books().len(), 5);
        assert_eq!(session.page_info().showing, "21-25 of 25");
        assert_eq!(api.requests().last().unwrap().page, Some(3));

        // Same page and out-of-range pages do not fetch
        assert!(!session.go_to_page(3).await.unwrap());
        assert!(!session.go_to_page(4).await.unwrap());
        assert!(!session.go_to_page(0).await.unwrap());
        assert_eq!(api.requests().len(), 2);

        assert!(session.previous_page().await.unwrap());
        assert_eq!(session.paginator().current_page(), 2);
    }

    #[tokio::test]
    async fn test_new_search_resets_page() {
        let mut session = session(FakeApi::with_total(25));
        session.search("rust").await.unwrap();
        session.next_page().await.unwrap();
        assert_eq!(session.paginator().current_page(), 2);

        session.search("tokio").await.unwrap();
        assert_eq!(session.paginator().current_page(), 1);
        assert_eq!(session.params().page, Some(1));
    }

    #[tokio::test]
    async fn test_failed_page_fetch_keeps_page() {
        let api = FakeApi::with_total(25);
        let mut session = session(api.clone());
        session.search("rust").await.unwrap();

        api.fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            session.go_to_page(2).await,
            Err(AppError::Api { status: 500, .. })
        ));
        assert_eq!(session.paginator().current_page(), 1);
        assert_eq!(session.params().page, Some(1));
    }

    #[tokio::test]
    async fn test_oversized_page_size_is_clamped() {
        let api = FakeApi::with_total(200);
        let history = SearchHistoryStore::new(MemoryStorage::new(), &HistoryConfig::default());
        let mut session = SearchSession::new(api.clone(), history, 100);
        assert_eq!(session.paginator().items_per_page(), 50);

        session.search("rust").await.unwrap();
        assert_eq!(session.books().len(), session.paginator().items_per_page());
        assert_eq!(session.paginator().total_pages(), 4);
        assert_eq!(session.page_info().showing, "1-50 of 200");

        assert!(session.go_to_page(2).await.unwrap());
        assert_eq!(session.books()[0].id, "isbn-50");
        assert_eq!(session.page_info().showing, "51-100 of 200");
        assert_eq!(api.requests().last().unwrap().size, Some(50));
    }

    #[tokio::test]
    async fn test_zero_page_size_is_clamped() {
        let history = SearchHistoryStore::new(MemoryStorage::new(), &HistoryConfig::default());
        let session = SearchSession::new(FakeApi::with_total(5), history, 0);
        assert_eq!(session.paginator().items_per_page(), 1);
    }

    #[tokio::test]
    async fn test_pages_beyond_api_limit_are_refused() {
        let api = FakeApi::with_total(10_000);
        let mut session = session(api.clone());
        session.search("many").await.unwrap();

        assert!(session.go_to_page(50).await.unwrap());
        assert!(!session.go_to_page(51).await.unwrap());
        assert_eq!(api.requests().len(), 2);
    }
}
