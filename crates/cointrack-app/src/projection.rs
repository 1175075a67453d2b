// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;
use time::{Date, OffsetDateTime};

use crate::model::{SortDirection, Transaction, TransactionSortKey, User, UserSortKey};
use crate::view::{Page, ViewParameters, clamp_page, total_pages};

/// Typed value a record exposes for one sort key. The variant decides how two
/// records compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortValue<'a> {
    Number(Option<i64>),
    Instant(Option<OffsetDateTime>),
    Text(&'a str),
}

impl SortValue<'_> {
    fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => {
                left.unwrap_or(0).cmp(&right.unwrap_or(0))
            }
            (Self::Instant(left), Self::Instant(right)) => {
                instant_key(*left).cmp(&instant_key(*right))
            }
            (Self::Text(left), Self::Text(right)) => cmp_text(left, right),
            // A sort key always yields one variant; mixed pairs only arise
            // from a broken `TableRecord` impl.
            (Self::Number(_), _) => Ordering::Less,
            (_, Self::Number(_)) => Ordering::Greater,
            (Self::Instant(_), _) => Ordering::Less,
            (_, Self::Instant(_)) => Ordering::Greater,
        }
    }
}

fn instant_key(value: Option<OffsetDateTime>) -> i128 {
    value.map(OffsetDateTime::unix_timestamp_nanos).unwrap_or(0)
}

fn cmp_text(left: &str, right: &str) -> Ordering {
    left.chars()
        .flat_map(char::to_lowercase)
        .cmp(right.chars().flat_map(char::to_lowercase))
}

/// A row the projection engine can filter, sort, and page.
pub trait TableRecord: Clone {
    type SortKey: Copy + PartialEq;

    fn record_id(&self) -> &str;

    /// Text matched by the free-text filter.
    fn search_text(&self) -> &str;

    /// Field matched exactly by a [`crate::FieldFilter`].
    fn category(&self) -> Option<&str> {
        None
    }

    /// Instant matched by the date-range filter.
    fn filter_date(&self) -> Option<OffsetDateTime> {
        None
    }

    fn sort_value(&self, key: Self::SortKey) -> SortValue<'_>;
}

impl TableRecord for User {
    type SortKey = UserSortKey;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }

    fn search_text(&self) -> &str {
        &self.username
    }

    fn sort_value(&self, key: UserSortKey) -> SortValue<'_> {
        match key {
            UserSortKey::Username => SortValue::Text(&self.username),
            UserSortKey::Balance => SortValue::Number(Some(self.balance)),
            UserSortKey::TransactionCount => SortValue::Number(Some(self.transaction_count)),
            UserSortKey::LastUpdated => SortValue::Instant(self.last_updated),
            UserSortKey::CreatedAt => SortValue::Instant(self.created_at),
        }
    }
}

impl TableRecord for Transaction {
    type SortKey = TransactionSortKey;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }

    fn search_text(&self) -> &str {
        &self.source
    }

    fn category(&self) -> Option<&str> {
        Some(&self.source)
    }

    fn filter_date(&self) -> Option<OffsetDateTime> {
        Some(self.date)
    }

    fn sort_value(&self, key: TransactionSortKey) -> SortValue<'_> {
        match key {
            TransactionSortKey::Date => SortValue::Instant(Some(self.date)),
            TransactionSortKey::Amount => SortValue::Number(Some(self.amount)),
            TransactionSortKey::Source => SortValue::Text(&self.source),
            TransactionSortKey::PreviousBalance => SortValue::Number(Some(self.previous_balance)),
        }
    }
}

pub fn matches<R: TableRecord>(record: &R, params: &ViewParameters<R::SortKey>) -> bool {
    let needle = params.filter_text();
    if !needle.is_empty() && !contains_ignore_case(record.search_text(), needle) {
        return false;
    }
    if !params.field_filter().matches(record.category()) {
        return false;
    }
    // Calendar day in the timestamp's own offset.
    if let Some(instant) = record.filter_date() {
        if !within(instant.date(), params.date_from(), params.date_to()) {
            return false;
        }
    }
    true
}

fn within(day: Date, from: Option<Date>, to: Option<Date>) -> bool {
    from.is_none_or(|from| day >= from) && to.is_none_or(|to| day <= to)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Total order used by [`project`]: the typed sort value, then the record
/// id. Descending inverts the whole comparison, tiebreak included.
pub fn compare<R: TableRecord>(
    left: &R,
    right: &R,
    key: R::SortKey,
    direction: SortDirection,
) -> Ordering {
    let order = left
        .sort_value(key)
        .cmp_value(&right.sort_value(key))
        .then_with(|| left.record_id().cmp(right.record_id()));
    match direction {
        SortDirection::Ascending => order,
        SortDirection::Descending => order.reverse(),
    }
}

/// Filters, sorts, and slices `records` for `params`. A page past the end is
/// clamped to the last page and reported as such.
pub fn project<R: TableRecord>(records: &[R], params: &ViewParameters<R::SortKey>) -> Page<R> {
    let mut matched: Vec<&R> = records
        .iter()
        .filter(|record| matches(*record, params))
        .collect();
    let key = params.sort_key();
    let direction = params.sort_direction();
    matched.sort_by(|left, right| compare(*left, *right, key, direction));

    let total_items = matched.len();
    let total_pages = total_pages(total_items, params.page_size());
    let current_page = clamp_page(params.page(), total_pages);
    let size = params.page_size() as usize;
    let start = (current_page as usize - 1) * size;

    let items = matched
        .into_iter()
        .skip(start)
        .take(size)
        .cloned()
        .collect();

    Page {
        items,
        current_page,
        total_pages,
        total_items,
        requested_page: params.page(),
    }
}
