// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use cointrack_app::{
    ApiError, ApiResult, CanonicalSnapshot, Mutation, Observers, Page, SubscriptionId,
    Transaction, TransactionSortKey, ViewParameters, project,
};
use std::rc::Rc;
use std::sync::mpsc::Sender;
use std::thread;

use crate::backend::{LedgerBackend, SessionHandler};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    SnapshotReplaced { revision: u64 },
    /// Derived views must recompute from the current snapshot, or clear
    /// themselves when there is none.
    ViewsInvalidated,
    LoadFailed(ApiError),
    MutationFailed { action: &'static str, error: ApiError },
    SessionExpired,
}

/// Permission to run one mutation off the owning thread. Only the most
/// recently issued ticket can complete.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationTicket {
    pub seq: u64,
    pub mutation: Mutation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationResponse {
    pub seq: u64,
    pub result: ApiResult<CanonicalSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    seq: u64,
    action: &'static str,
}

/// What produced a snapshot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Load,
    Mutation(&'static str),
}

impl Step {
    fn label(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Mutation(action) => action,
        }
    }

    fn failed(self, error: ApiError) -> SyncEvent {
        match self {
            Self::Load => SyncEvent::LoadFailed(error),
            Self::Mutation(action) => SyncEvent::MutationFailed { action, error },
        }
    }
}

/// Owns the canonical snapshot and routes every state change through the
/// backend. Mutations run one at a time; a successful one replaces the whole
/// snapshot with the server's answer.
pub struct SyncController<B: LedgerBackend> {
    backend: B,
    session: Rc<dyn SessionHandler>,
    store: RecordStore<CanonicalSnapshot>,
    next_seq: u64,
    in_flight: Option<InFlight>,
    observers: Observers<SyncEvent>,
}

impl<B: LedgerBackend> SyncController<B> {
    pub fn new(backend: B, session: Rc<dyn SessionHandler>) -> Self {
        Self {
            backend,
            session,
            store: RecordStore::new(),
            next_seq: 0,
            in_flight: None,
            observers: Observers::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn snapshot(&self) -> Option<&CanonicalSnapshot> {
        self.store.get()
    }

    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&SyncEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn subscribe_sender(&mut self, tx: Sender<SyncEvent>) -> SubscriptionId {
        self.observers.subscribe_sender(tx)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn load(&mut self) -> ApiResult<&CanonicalSnapshot> {
        let result = self.backend.load_snapshot();
        self.finish(Step::Load, result)
    }

    /// Runs `mutation` on the calling thread.
    pub fn apply_mutation(&mut self, mutation: &Mutation) -> ApiResult<&CanonicalSnapshot> {
        if let Some(in_flight) = self.in_flight {
            log::debug!(
                "refusing {} while {} is pending",
                mutation.label(),
                in_flight.action
            );
            return Err(busy());
        }
        let result = self.backend.apply(mutation);
        self.finish(Step::Mutation(mutation.label()), result)
    }

    /// Reserves the mutation slot. `None` while another mutation is pending.
    pub fn begin_mutation(&mut self, mutation: Mutation) -> Option<MutationTicket> {
        if self.in_flight.is_some() {
            return None;
        }
        self.next_seq = self.next_seq.saturating_add(1);
        let seq = self.next_seq;
        self.in_flight = Some(InFlight {
            seq,
            action: mutation.label(),
        });
        log::debug!("mutation {seq} ({}) started", mutation.label());
        Some(MutationTicket { seq, mutation })
    }

    /// Applies the answer to the pending ticket. Answers to any other ticket
    /// are dropped and yield `Ok(None)`.
    pub fn complete_mutation(
        &mut self,
        response: MutationResponse,
    ) -> ApiResult<Option<&CanonicalSnapshot>> {
        let in_flight = match self.in_flight {
            Some(in_flight) if in_flight.seq == response.seq => in_flight,
            _ => {
                if matches!(response.result, Err(ApiError::AuthExpired)) {
                    self.expire_session();
                    return Err(ApiError::AuthExpired);
                }
                log::debug!("discarding stale mutation response {}", response.seq);
                return Ok(None);
            }
        };
        self.in_flight = None;
        self.finish(Step::Mutation(in_flight.action), response.result)
            .map(Some)
    }

    /// Gives up on the pending mutation. Its answer will be discarded, so the
    /// snapshot may lag the server until the next load.
    pub fn abandon_mutation(&mut self) -> bool {
        self.in_flight.take().is_some()
    }

    pub fn transactions_page(
        &self,
        params: &ViewParameters<TransactionSortKey>,
    ) -> Page<Transaction> {
        let transactions = self
            .store
            .get()
            .map(|snapshot| snapshot.transactions.as_slice())
            .unwrap_or(&[]);
        project(transactions, params)
    }

    /// Drops the snapshot, e.g. on logout.
    pub fn clear(&mut self) {
        self.store.clear();
        self.in_flight = None;
        self.observers.emit(&SyncEvent::ViewsInvalidated);
    }

    fn finish(
        &mut self,
        step: Step,
        result: ApiResult<CanonicalSnapshot>,
    ) -> ApiResult<&CanonicalSnapshot> {
        match result {
            Ok(snapshot) => {
                let (revision, snapshot) = self.store.replace(snapshot);
                log::debug!("{} replaced snapshot, revision {revision}", step.label());
                self.observers.emit(&SyncEvent::SnapshotReplaced { revision });
                self.observers.emit(&SyncEvent::ViewsInvalidated);
                Ok(snapshot)
            }
            Err(ApiError::AuthExpired) => {
                self.expire_session();
                Err(ApiError::AuthExpired)
            }
            Err(error) => {
                log::warn!("{} failed: {error}", step.label());
                self.observers.emit(&step.failed(error.clone()));
                Err(error)
            }
        }
    }

    fn expire_session(&mut self) {
        self.session.session_expired();
        self.observers.emit(&SyncEvent::SessionExpired);
    }
}

impl<B> SyncController<B>
where
    B: LedgerBackend + Clone + Send + 'static,
{
    /// Begins `mutation` and runs it on a worker thread. The answer arrives on
    /// `tx` and goes back through [`Self::complete_mutation`].
    pub fn spawn_mutation(
        &mut self,
        mutation: Mutation,
        tx: Sender<MutationResponse>,
    ) -> ApiResult<u64> {
        let ticket = self.begin_mutation(mutation).ok_or_else(busy)?;
        let backend = self.backend.clone();
        let seq = ticket.seq;
        thread::spawn(move || {
            let result = backend.apply(&ticket.mutation);
            let _ = tx.send(MutationResponse { seq, result });
        });
        Ok(seq)
    }
}

fn busy() -> ApiError {
    ApiError::Validation("another change is still being saved".to_owned())
}
