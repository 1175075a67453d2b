// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use cointrack_app::TableRecord;

/// Sole owner of the last-known server value for one view. Changes only by
/// whole replacement, by `clear`, or by removing one record after a
/// confirmed server-side delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStore<S> {
    value: Option<S>,
    revision: u64,
}

impl<S> Default for RecordStore<S> {
    fn default() -> Self {
        Self {
            value: None,
            revision: 0,
        }
    }
}

impl<S> RecordStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Option<&S> {
        self.value.as_ref()
    }

    /// Bumped on every change, including `clear`.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the new revision alongside the stored value.
    pub fn replace(&mut self, value: S) -> (u64, &S) {
        self.revision += 1;
        (self.revision, self.value.insert(value))
    }

    pub fn clear(&mut self) {
        if self.value.take().is_some() {
            self.revision += 1;
        }
    }
}

impl<R: TableRecord> RecordStore<Vec<R>> {
    pub fn records(&self) -> &[R] {
        self.value.as_deref().unwrap_or(&[])
    }

    /// Drops the record with `id` without a refetch. Returns the removed
    /// record, or `None` when it was not present.
    pub fn remove(&mut self, id: &str) -> Option<R> {
        let records = self.value.as_mut()?;
        let index = records.iter().position(|record| record.record_id() == id)?;
        self.revision += 1;
        Some(records.remove(index))
    }
}
