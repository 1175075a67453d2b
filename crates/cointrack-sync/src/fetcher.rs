// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use cointrack_app::{
    ApiError, ApiResult, Observers, Page, RemoteTotals, SubscriptionId, ViewParameters,
};
use std::rc::Rc;
use std::sync::mpsc::Sender;
use std::thread;

use crate::backend::{PageSource, RemotePage, SessionHandler, SortKeyOf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<K> {
    pub seq: u64,
    pub params: ViewParameters<K>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse<R> {
    pub seq: u64,
    pub result: ApiResult<RemotePage<R>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<R> {
    Applied(Page<R>),
    /// A newer request was issued after this one, or it was cancelled.
    Discarded,
    /// The requested page no longer exists. The fetcher's parameters now
    /// point at `last_page`; nothing was applied.
    OutOfRange { last_page: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent<R> {
    PageReady { page: Page<R>, totals: RemoteTotals },
    Failed(ApiError),
}

/// Server-side filtered, sorted, and paged view. Only the response to the most
/// recently issued request is ever applied.
pub struct RemotePageFetcher<S: PageSource> {
    source: S,
    session: Rc<dyn SessionHandler>,
    params: ViewParameters<SortKeyOf<S>>,
    latest_seq: u64,
    pending: Option<PageRequest<SortKeyOf<S>>>,
    page: Page<S::Record>,
    totals: RemoteTotals,
    observers: Observers<FetchEvent<S::Record>>,
}

impl<S: PageSource> RemotePageFetcher<S> {
    pub fn new(
        source: S,
        session: Rc<dyn SessionHandler>,
        params: ViewParameters<SortKeyOf<S>>,
    ) -> Self {
        Self {
            source,
            session,
            params,
            latest_seq: 0,
            pending: None,
            page: Page::empty(),
            totals: RemoteTotals::default(),
            observers: Observers::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Parameters of the most recent request, clamped after an out-of-range
    /// reply.
    pub fn params(&self) -> &ViewParameters<SortKeyOf<S>> {
        &self.params
    }

    /// Last applied page. Unchanged by failed or discarded responses.
    pub fn page(&self) -> &Page<S::Record> {
        &self.page
    }

    pub fn totals(&self) -> &RemoteTotals {
        &self.totals
    }

    pub fn pending(&self) -> Option<&PageRequest<SortKeyOf<S>>> {
        self.pending.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&FetchEvent<S::Record>) + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Registers `params` as the latest request. Any response still in flight
    /// for an earlier request becomes stale.
    pub fn issue(&mut self, params: ViewParameters<SortKeyOf<S>>) -> PageRequest<SortKeyOf<S>> {
        let request = PageRequest {
            seq: self.next_seq(),
            params: params.clone(),
        };
        self.params = params;
        self.pending = Some(request.clone());
        log::debug!(
            "page request {} issued for page {}",
            request.seq,
            request.params.page()
        );
        request
    }

    /// Stops waiting for the pending request. Every response still in
    /// flight will be discarded.
    pub fn cancel_pending(&mut self) -> bool {
        self.next_seq();
        self.pending.take().is_some()
    }

    fn next_seq(&mut self) -> u64 {
        self.latest_seq = self.latest_seq.saturating_add(1);
        if self.latest_seq == 0 {
            self.latest_seq = 1;
        }
        self.latest_seq
    }

    /// Applies `response` if it answers the pending request. An expired
    /// session is reported to the session handler even for stale responses.
    pub fn resolve(
        &mut self,
        response: PageResponse<S::Record>,
    ) -> ApiResult<FetchOutcome<S::Record>> {
        let is_current = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.seq == response.seq);
        if !is_current {
            if matches!(response.result, Err(ApiError::AuthExpired)) {
                self.session.session_expired();
                return Err(ApiError::AuthExpired);
            }
            log::debug!("discarding stale page response {}", response.seq);
            return Ok(FetchOutcome::Discarded);
        }
        let Some(request) = self.pending.take() else {
            return Ok(FetchOutcome::Discarded);
        };

        let remote = match response.result {
            Ok(remote) => remote,
            Err(error) => {
                if error.is_auth_expired() {
                    self.session.session_expired();
                }
                log::warn!("page request {} failed: {error}", request.seq);
                self.observers.emit(&FetchEvent::Failed(error.clone()));
                return Err(error);
            }
        };

        let total_pages = remote.total_pages.max(1);
        let requested = request.params.page();
        if requested > total_pages {
            log::debug!("page {requested} is past the last page {total_pages}");
            self.params = request.params.with_page(total_pages);
            return Ok(FetchOutcome::OutOfRange {
                last_page: total_pages,
            });
        }

        let page = Page {
            items: remote.items,
            current_page: remote.current_page.clamp(1, total_pages),
            total_pages,
            total_items: remote.totals.total_items,
            requested_page: requested,
        };
        self.page = page.clone();
        self.totals = remote.totals;
        self.observers.emit(&FetchEvent::PageReady {
            page: page.clone(),
            totals: remote.totals,
        });
        Ok(FetchOutcome::Applied(page))
    }

    /// Fetches on the calling thread. A page past the end is refetched once
    /// at the last page.
    pub fn fetch_page(
        &mut self,
        params: ViewParameters<SortKeyOf<S>>,
    ) -> ApiResult<Page<S::Record>> {
        match self.fetch_once(params)? {
            FetchOutcome::Applied(page) => Ok(page),
            FetchOutcome::Discarded => Ok(self.page.clone()),
            FetchOutcome::OutOfRange { .. } => match self.fetch_once(self.params.clone())? {
                FetchOutcome::Applied(page) => Ok(page),
                FetchOutcome::Discarded => Ok(self.page.clone()),
                FetchOutcome::OutOfRange { last_page } => {
                    let error = ApiError::Network(format!(
                        "server page count changed again, page {last_page} is out of range"
                    ));
                    log::warn!("{error}");
                    self.observers.emit(&FetchEvent::Failed(error.clone()));
                    Err(error)
                }
            },
        }
    }

    pub fn refresh(&mut self) -> ApiResult<Page<S::Record>> {
        self.fetch_page(self.params.clone())
    }

    pub fn go_to_page(&mut self, page: u32) -> ApiResult<Page<S::Record>> {
        let params = self.params.clone().with_page(page);
        self.fetch_page(params)
    }

    fn fetch_once(
        &mut self,
        params: ViewParameters<SortKeyOf<S>>,
    ) -> ApiResult<FetchOutcome<S::Record>> {
        let request = self.issue(params);
        let result = self.source.fetch_page(&request.params);
        self.resolve(PageResponse {
            seq: request.seq,
            result,
        })
    }
}

impl<S> RemotePageFetcher<S>
where
    S: PageSource + Clone + Send + 'static,
    S::Record: Send + 'static,
    SortKeyOf<S>: Send + 'static,
{
    /// Issues `params` and runs the request on a worker thread. The response
    /// arrives on `tx` and must be handed back through [`Self::resolve`].
    pub fn spawn(
        &mut self,
        params: ViewParameters<SortKeyOf<S>>,
        tx: Sender<PageResponse<S::Record>>,
    ) -> u64 {
        let request = self.issue(params);
        let source = self.source.clone();
        let seq = request.seq;
        thread::spawn(move || {
            let result = source.fetch_page(&request.params);
            let _ = tx.send(PageResponse { seq, result });
        });
        seq
    }
}
