// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::Date;

use crate::model::{SortDirection, TransactionSortKey, UserSortKey};

pub const ALL_SENTINEL: &str = "all";
pub const DEFAULT_USERS_PAGE_SIZE: u32 = 15;
pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 20;

/// Exact-match constraint on a record's categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FieldFilter {
    #[default]
    All,
    Only(String),
}

impl FieldFilter {
    /// Maps the `"all"` sentinel (and blank input) to [`FieldFilter::All`].
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == ALL_SENTINEL {
            Self::All
        } else {
            Self::Only(trimmed.to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_SENTINEL,
            Self::Only(value) => value,
        }
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => value == Some(expected.as_str()),
        }
    }
}

/// Sort, filter, and page position for one table. Values are immutable per
/// request; every `with_*` builder except [`ViewParameters::with_page`]
/// returns a value positioned on page 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewParameters<K> {
    sort_key: K,
    sort_direction: SortDirection,
    filter_text: String,
    field_filter: FieldFilter,
    date_from: Option<Date>,
    date_to: Option<Date>,
    page: u32,
    page_size: u32,
}

impl<K: Copy + PartialEq> ViewParameters<K> {
    pub fn new(sort_key: K, sort_direction: SortDirection, page_size: u32) -> Self {
        Self {
            sort_key,
            sort_direction,
            filter_text: String::new(),
            field_filter: FieldFilter::All,
            date_from: None,
            date_to: None,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn sort_key(&self) -> K {
        self.sort_key
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn field_filter(&self) -> &FieldFilter {
        &self.field_filter
    }

    pub fn date_from(&self) -> Option<Date> {
        self.date_from
    }

    pub fn date_to(&self) -> Option<Date> {
        self.date_to
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn with_sort(self, sort_key: K, sort_direction: SortDirection) -> Self {
        Self {
            sort_key,
            sort_direction,
            page: 1,
            ..self
        }
    }

    /// Header-click behaviour: the active key flips direction, a new key
    /// starts ascending.
    pub fn toggle_sort(self, sort_key: K) -> Self {
        let direction = if self.sort_key == sort_key {
            self.sort_direction.reversed()
        } else {
            SortDirection::Ascending
        };
        self.with_sort(sort_key, direction)
    }

    pub fn with_filter_text(self, filter_text: impl Into<String>) -> Self {
        Self {
            filter_text: filter_text.into(),
            page: 1,
            ..self
        }
    }

    pub fn with_field_filter(self, field_filter: FieldFilter) -> Self {
        Self {
            field_filter,
            page: 1,
            ..self
        }
    }

    pub fn with_date_range(self, date_from: Option<Date>, date_to: Option<Date>) -> Self {
        Self {
            date_from,
            date_to,
            page: 1,
            ..self
        }
    }

    pub fn with_page_size(self, page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
            ..self
        }
    }

    pub fn with_page(self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self
        }
    }
}

impl ViewParameters<UserSortKey> {
    pub fn users() -> Self {
        Self::new(
            UserSortKey::Username,
            SortDirection::Ascending,
            DEFAULT_USERS_PAGE_SIZE,
        )
    }
}

impl ViewParameters<TransactionSortKey> {
    /// Newest first, the order the history endpoint serves by default.
    pub fn history() -> Self {
        Self::new(
            TransactionSortKey::Date,
            SortDirection::Descending,
            DEFAULT_HISTORY_PAGE_SIZE,
        )
    }
}

/// One page of a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: usize,
    pub requested_page: u32,
}

impl<R> Page<R> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            current_page: 1,
            total_pages: 1,
            total_items: 0,
            requested_page: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn was_clamped(&self) -> bool {
        self.current_page != self.requested_page
    }
}

impl<R> Default for Page<R> {
    fn default() -> Self {
        Self::empty()
    }
}

pub fn total_pages(total_items: usize, page_size: u32) -> u32 {
    let size = page_size.max(1) as usize;
    let pages = total_items.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.clamp(1, total_pages.max(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Previous { target: u32, enabled: bool },
    Number { page: u32, current: bool },
    Gap,
    Next { target: u32, enabled: bool },
}

/// Pagination controls around `current`: neighbours within two pages, the
/// first and last page, and gaps between them. Empty for a single page.
pub fn page_window(current: u32, total: u32) -> Vec<PageLink> {
    if total <= 1 {
        return Vec::new();
    }
    let current = clamp_page(current, total);
    let start = current.saturating_sub(2).max(1);
    let end = current.saturating_add(2).min(total);

    let mut links = vec![PageLink::Previous {
        target: current.saturating_sub(1).max(1),
        enabled: current > 1,
    }];
    if start > 1 {
        links.push(PageLink::Number {
            page: 1,
            current: false,
        });
        links.push(PageLink::Gap);
    }
    for page in start..=end {
        links.push(PageLink::Number {
            page,
            current: page == current,
        });
    }
    if end < total {
        links.push(PageLink::Gap);
        links.push(PageLink::Number {
            page: total,
            current: false,
        });
    }
    links.push(PageLink::Next {
        target: current.saturating_add(1).min(total),
        enabled: current < total,
    });
    links
}
