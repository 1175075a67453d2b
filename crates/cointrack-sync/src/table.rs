// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use cointrack_app::{
    FieldFilter, Observers, Page, SortDirection, SubscriptionId, TableRecord, ViewParameters,
    project,
};
use time::Date;

use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent<R> {
    PageChanged(Page<R>),
    RecordRemoved(String),
    Cleared,
}

/// View state for one locally projected table: the records, the active view
/// parameters, and the page currently shown.
pub struct TableView<R: TableRecord> {
    store: RecordStore<Vec<R>>,
    params: ViewParameters<R::SortKey>,
    page: Page<R>,
    observers: Observers<TableEvent<R>>,
}

impl<R: TableRecord> TableView<R> {
    pub fn new(params: ViewParameters<R::SortKey>) -> Self {
        Self {
            store: RecordStore::new(),
            params,
            page: Page::empty(),
            observers: Observers::new(),
        }
    }

    pub fn params(&self) -> &ViewParameters<R::SortKey> {
        &self.params
    }

    pub fn page(&self) -> &Page<R> {
        &self.page
    }

    pub fn store(&self) -> &RecordStore<Vec<R>> {
        &self.store
    }

    pub fn records(&self) -> &[R] {
        self.store.records()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&TableEvent<R>) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn load(&mut self, records: Vec<R>) -> &Page<R> {
        self.store.replace(records);
        self.reproject()
    }

    pub fn set_params(&mut self, params: ViewParameters<R::SortKey>) -> &Page<R> {
        self.params = params;
        self.reproject()
    }

    pub fn set_filter_text(&mut self, text: &str) -> &Page<R> {
        let params = self.params.clone().with_filter_text(text);
        self.set_params(params)
    }

    pub fn set_field_filter(&mut self, filter: FieldFilter) -> &Page<R> {
        let params = self.params.clone().with_field_filter(filter);
        self.set_params(params)
    }

    pub fn set_date_range(&mut self, from: Option<Date>, to: Option<Date>) -> &Page<R> {
        let params = self.params.clone().with_date_range(from, to);
        self.set_params(params)
    }

    pub fn set_sort(&mut self, key: R::SortKey, direction: SortDirection) -> &Page<R> {
        let params = self.params.clone().with_sort(key, direction);
        self.set_params(params)
    }

    pub fn toggle_sort(&mut self, key: R::SortKey) -> &Page<R> {
        let params = self.params.clone().toggle_sort(key);
        self.set_params(params)
    }

    pub fn set_page_size(&mut self, page_size: u32) -> &Page<R> {
        let params = self.params.clone().with_page_size(page_size);
        self.set_params(params)
    }

    pub fn go_to_page(&mut self, page: u32) -> &Page<R> {
        let params = self.params.clone().with_page(page);
        self.set_params(params)
    }

    pub fn next_page(&mut self) -> &Page<R> {
        let next = self.page.current_page.saturating_add(1);
        self.go_to_page(next)
    }

    pub fn previous_page(&mut self) -> &Page<R> {
        let previous = self.page.current_page.saturating_sub(1);
        self.go_to_page(previous)
    }

    /// Local reconciliation after the server confirmed a delete. The current
    /// page position is kept and clamped if the last page emptied.
    pub fn remove_record(&mut self, id: &str) -> Option<R> {
        let removed = self.store.remove(id)?;
        self.observers.emit(&TableEvent::RecordRemoved(id.to_owned()));
        self.reproject();
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.page = Page::empty();
        self.params = self.params.clone().with_page(1);
        self.observers.emit(&TableEvent::Cleared);
    }

    fn reproject(&mut self) -> &Page<R> {
        let page = project(self.store.records(), &self.params);
        if page.was_clamped() {
            self.params = self.params.clone().with_page(page.current_page);
        }
        self.observers.emit(&TableEvent::PageChanged(page.clone()));
        self.page = page;
        &self.page
    }
}
