// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use cointrack_app::{
    AdminStats, ApiError, ApiResult, Observers, Page, SubscriptionId, User, UserId,
    UserSortKey, ViewParameters,
};
use std::rc::Rc;

use crate::backend::{AdminBackend, SessionHandler};
use crate::table::TableView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminEvent {
    UsersLoaded { count: usize },
    StatsLoaded,
    UserDeleted { id: UserId },
    BroadcastSet { message: String },
    Failed { action: &'static str, error: ApiError },
    SessionExpired,
}

/// Admin dashboard state: the users table, projected locally, plus the last
/// fetched stats and broadcast.
pub struct AdminController<B: AdminBackend> {
    backend: B,
    session: Rc<dyn SessionHandler>,
    users: TableView<User>,
    stats: Option<AdminStats>,
    broadcast: Option<String>,
    observers: Observers<AdminEvent>,
}

impl<B: AdminBackend> AdminController<B> {
    pub fn new(backend: B, session: Rc<dyn SessionHandler>) -> Self {
        Self::with_params(backend, session, ViewParameters::users())
    }

    pub fn with_params(
        backend: B,
        session: Rc<dyn SessionHandler>,
        params: ViewParameters<UserSortKey>,
    ) -> Self {
        Self {
            backend,
            session,
            users: TableView::new(params),
            stats: None,
            broadcast: None,
            observers: Observers::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn users(&self) -> &TableView<User> {
        &self.users
    }

    /// Sort, filter, and paging go straight to the table.
    pub fn users_mut(&mut self) -> &mut TableView<User> {
        &mut self.users
    }

    pub fn stats(&self) -> Option<&AdminStats> {
        self.stats.as_ref()
    }

    pub fn broadcast(&self) -> Option<&str> {
        self.broadcast.as_deref()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&AdminEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn refresh_users(&mut self) -> ApiResult<&Page<User>> {
        let users = self.check("list users", self.backend.list_users())?;
        let count = users.len();
        self.users.load(users);
        self.observers.emit(&AdminEvent::UsersLoaded { count });
        Ok(self.users.page())
    }

    pub fn refresh_stats(&mut self) -> ApiResult<&AdminStats> {
        let stats = self.check("load stats", self.backend.admin_stats())?;
        self.observers.emit(&AdminEvent::StatsLoaded);
        Ok(&*self.stats.insert(stats))
    }

    /// Deletes on the server, then drops the row locally without refetching
    /// the user list. Stats are refetched since every total changes; a failed
    /// refetch is reported to observers and does not undo the delete.
    pub fn delete_user(&mut self, id: &UserId) -> ApiResult<()> {
        self.check("delete user", self.backend.delete_user(id))?;
        if self.users.remove_record(id.as_str()).is_none() {
            log::debug!("deleted user {id} was not in the loaded table");
        }
        self.observers.emit(&AdminEvent::UserDeleted { id: id.clone() });
        if self.refresh_stats().is_err() {
            log::debug!("stats are stale after deleting user {id}");
        }
        Ok(())
    }

    pub fn set_broadcast(&mut self, message: &str) -> ApiResult<()> {
        let message = message.trim();
        self.check("set broadcast", self.backend.set_broadcast(message))?;
        self.broadcast = Some(message.to_owned());
        self.observers.emit(&AdminEvent::BroadcastSet {
            message: message.to_owned(),
        });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.users.clear();
        self.stats = None;
        self.broadcast = None;
    }

    fn check<T>(&mut self, action: &'static str, result: ApiResult<T>) -> ApiResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(ApiError::AuthExpired) => {
                self.session.session_expired();
                self.observers.emit(&AdminEvent::SessionExpired);
                Err(ApiError::AuthExpired)
            }
            Err(error) => {
                log::warn!("{action} failed: {error}");
                self.observers.emit(&AdminEvent::Failed {
                    action,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }
}
