// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use cointrack_app::{
    AdminStats, ApiResult, Broadcast, CanonicalSnapshot, Mutation, Profiles, RemoteTotals,
    SessionUser, TableRecord, User, UserId, ViewParameters,
};
use std::cell::Cell;

/// Per-user ledger endpoints. Every mutation answers with the complete
/// post-mutation snapshot.
pub trait LedgerBackend {
    fn load_snapshot(&self) -> ApiResult<CanonicalSnapshot>;
    fn apply(&self, mutation: &Mutation) -> ApiResult<CanonicalSnapshot>;
    fn profiles(&self) -> ApiResult<Profiles>;
    fn current_user(&self) -> ApiResult<SessionUser>;
    fn broadcast(&self) -> ApiResult<Broadcast>;
}

pub trait AdminBackend {
    fn list_users(&self) -> ApiResult<Vec<User>>;
    fn admin_stats(&self) -> ApiResult<AdminStats>;
    fn delete_user(&self, id: &UserId) -> ApiResult<()>;
    fn set_broadcast(&self, message: &str) -> ApiResult<()>;
}

/// One server-side page as reported by the server, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePage<R> {
    pub items: Vec<R>,
    pub current_page: u32,
    pub total_pages: u32,
    pub totals: RemoteTotals,
}

pub type SortKeyOf<S> = <<S as PageSource>::Record as TableRecord>::SortKey;

/// A collection that the server filters, sorts, and pages.
pub trait PageSource {
    type Record: TableRecord;

    fn fetch_page(
        &self,
        params: &ViewParameters<<Self::Record as TableRecord>::SortKey>,
    ) -> ApiResult<RemotePage<Self::Record>>;
}

/// Collaborator told when the server rejects the session. Controllers call it
/// instead of retrying.
pub trait SessionHandler {
    fn session_expired(&self);
}

/// Remembers that the session expired; enough for a CLI that exits on expiry.
#[derive(Debug, Default)]
pub struct SessionFlag {
    expired: Cell<bool>,
}

impl SessionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expired(&self) -> bool {
        self.expired.get()
    }
}

impl SessionHandler for SessionFlag {
    fn session_expired(&self) {
        log::warn!("session expired; a new login is required");
        self.expired.set(true);
    }
}
