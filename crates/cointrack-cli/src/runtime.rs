// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use cointrack_app::{
    ApiError, ApiResult, FieldFilter, ImportFile, Mutation, SortDirection, Transaction,
    TransactionId, TransactionSortKey, UserId, UserSortKey, ViewParameters,
};
use cointrack_sync::{
    AdminBackend, AdminController, FetchEvent, LedgerBackend, PageSource, RemotePageFetcher,
    SessionFlag, SessionHandler, SyncController, TableEvent,
};
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use crate::render;
use crate::{Command, ViewArgs};

pub const SESSION_EXPIRED_MESSAGE: &str =
    "session expired; log in again in the browser and update COINTRACK_SESSION";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizes {
    pub users: u32,
    pub history: u32,
}

/// Text written by the controller observers while a command runs.
#[derive(Debug, Clone, Default)]
struct Output(Rc<RefCell<String>>);

impl Output {
    fn push(&self, text: &str) {
        self.0.borrow_mut().push_str(text);
    }

    fn take(&self) -> String {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

/// Runs one command against `backend` and returns what it printed.
pub fn execute<B>(command: &Command, backend: B, sizes: PageSizes) -> Result<String>
where
    B: LedgerBackend + AdminBackend + PageSource<Record = Transaction> + Clone,
{
    let session = Rc::new(SessionFlag::new());
    let runtime = Runtime {
        backend,
        session: session.clone(),
        sizes,
        output: Output::default(),
    };
    let result = runtime.run(command);
    if session.is_expired() {
        bail!(SESSION_EXPIRED_MESSAGE);
    }
    result
}

struct Runtime<B> {
    backend: B,
    session: Rc<SessionFlag>,
    sizes: PageSizes,
    output: Output,
}

impl<B> Runtime<B>
where
    B: LedgerBackend + AdminBackend + PageSource<Record = Transaction> + Clone,
{
    fn run(&self, command: &Command) -> Result<String> {
        match command {
            Command::Summary => {
                let mut sync = self.sync();
                let snapshot = api(sync.load(), "load dashboard")?;
                self.output.push(&render::summary(snapshot));
            }
            Command::Transactions(args) => self.transactions(args)?,
            Command::History(args) => self.history(args)?,
            Command::Add {
                amount,
                source,
                date,
            } => {
                let source = source.trim();
                if source.is_empty() {
                    bail!("a transaction needs a source, for example \"Chores\"");
                }
                let mutation = Mutation::AddTransaction {
                    amount: *amount,
                    source: source.to_owned(),
                    date: *date,
                };
                let balance = self.mutate(&mutation)?;
                self.output
                    .push(&format!("added {amount:+} from {source}; balance {balance}\n"));
            }
            Command::Delete { id } => {
                let balance = self.mutate(&Mutation::DeleteTransaction {
                    id: TransactionId::new(id.as_str()),
                })?;
                self.output
                    .push(&format!("deleted transaction {id}; balance {balance}\n"));
            }
            Command::Import { path } => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("read import file {}", path.display()))?;
                let file = ImportFile::parse(&raw)
                    .with_context(|| format!("import file {}", path.display()))?;
                let count = file.transactions.len();
                let balance = self.mutate(&Mutation::ImportData(file))?;
                self.output
                    .push(&format!("imported {count} transactions; balance {balance}\n"));
            }
            Command::Profiles => {
                let profiles = api(self.backend.profiles(), "list profiles")?;
                self.output.push(&render::profiles(&profiles));
            }
            Command::SwitchProfile { name } => {
                let mut sync = self.sync();
                let snapshot = api(
                    sync.apply_mutation(&Mutation::SwitchProfile { name: name.clone() }),
                    "switch profile",
                )?;
                self.output.push(&render::summary(snapshot));
            }
            Command::CreateProfile { name } => {
                self.mutate(&Mutation::CreateProfile { name: name.clone() })?;
                self.output.push(&format!("created profile {name}\n"));
            }
            Command::Whoami => {
                let user = api(self.backend.current_user(), "load current user")?;
                self.output.push(&render::session_user(&user));
            }
            Command::Users(args) => self.users(args)?,
            Command::Stats => {
                let mut admin = self.admin(ViewParameters::users());
                let stats = api(admin.refresh_stats(), "load admin stats")?;
                self.output.push(&render::admin_stats(stats));
            }
            Command::DeleteUser { id } => {
                let mut admin = self.admin(ViewParameters::users());
                api(admin.delete_user(&UserId::new(id.as_str())), "delete user")?;
                if let Some(stats) = admin.stats() {
                    self.output.push(&render::admin_stats(stats));
                }
            }
            Command::Broadcast { message: None } => {
                let current = api(LedgerBackend::broadcast(&self.backend), "load broadcast")?;
                self.output.push(&render::broadcast(&current));
            }
            Command::Broadcast {
                message: Some(message),
            } => {
                let mut admin = self.admin(ViewParameters::users());
                api(admin.set_broadcast(message), "set broadcast")?;
            }
        }
        Ok(self.output.take())
    }

    fn transactions(&self, args: &ViewArgs) -> Result<()> {
        let params = transaction_params(args, self.sizes.history)?;
        let mut sync = self.sync();
        api(sync.load(), "load transactions")?;
        self.output
            .push(&render::transactions(&sync.transactions_page(&params)));
        Ok(())
    }

    fn history(&self, args: &ViewArgs) -> Result<()> {
        let params = transaction_params(args, self.sizes.history)?;
        let mut fetcher = RemotePageFetcher::new(self.backend.clone(), self.handler(), params);
        let output = self.output.clone();
        fetcher.subscribe(move |event| {
            if let FetchEvent::PageReady { page, totals } = event {
                output.push(&render::transactions(page));
                output.push(&render::totals(totals));
            }
        });
        api(fetcher.refresh(), "load history")?;
        Ok(())
    }

    fn users(&self, args: &ViewArgs) -> Result<()> {
        if args.source.is_some() || args.from.is_some() || args.to.is_some() {
            bail!("users can only be filtered by name; drop --source, --from, and --to");
        }
        let base = ViewParameters::users().with_page_size(self.sizes.users);
        let params = view_params(args, base, &UserSortKey::ALL, UserSortKey::as_str)?;

        let mut admin = self.admin(params);
        let output = self.output.clone();
        admin.users_mut().subscribe(move |event| {
            if let TableEvent::PageChanged(page) = event {
                output.push(&render::users(page));
            }
        });
        api(admin.refresh_users(), "list users")?;
        Ok(())
    }

    /// Applies `mutation` and returns the balance from the new snapshot.
    fn mutate(&self, mutation: &Mutation) -> Result<i64> {
        let mut sync = self.sync();
        let snapshot = api(sync.apply_mutation(mutation), mutation.label())?;
        Ok(snapshot.balance)
    }

    fn sync(&self) -> SyncController<B> {
        SyncController::new(self.backend.clone(), self.handler())
    }

    fn admin(&self, params: ViewParameters<UserSortKey>) -> AdminController<B> {
        let mut admin = AdminController::with_params(self.backend.clone(), self.handler(), params);
        let output = self.output.clone();
        admin.subscribe(move |event| {
            if let Some(notice) = render::admin_notice(event) {
                output.push(&notice);
            }
        });
        admin
    }

    fn handler(&self) -> Rc<dyn SessionHandler> {
        self.session.clone()
    }
}

fn api<T>(result: ApiResult<T>, action: &str) -> Result<T> {
    result.map_err(|error| match error {
        ApiError::AuthExpired => anyhow!(SESSION_EXPIRED_MESSAGE),
        other => anyhow::Error::new(other).context(format!("{action} failed")),
    })
}

fn transaction_params(
    args: &ViewArgs,
    page_size: u32,
) -> Result<ViewParameters<TransactionSortKey>> {
    let base = ViewParameters::history().with_page_size(page_size);
    view_params(
        args,
        base,
        &TransactionSortKey::ALL,
        TransactionSortKey::as_str,
    )
}

/// Layers the command-line view flags over `base`. The page is applied last
/// since every other setter returns to page 1.
fn view_params<K: Copy + PartialEq>(
    args: &ViewArgs,
    base: ViewParameters<K>,
    keys: &[K],
    name: fn(K) -> &'static str,
) -> Result<ViewParameters<K>> {
    let mut params = base;
    match &args.sort {
        Some(raw) => {
            let key = keys
                .iter()
                .copied()
                .find(|key| name(*key) == raw.as_str())
                .ok_or_else(|| {
                    let names: Vec<&str> = keys.iter().map(|key| name(*key)).collect();
                    anyhow!(
                        "unknown sort key {raw:?}; expected one of: {}",
                        names.join(", ")
                    )
                })?;
            let direction = args.direction.unwrap_or(SortDirection::Ascending);
            params = params.with_sort(key, direction);
        }
        None => {
            if let Some(direction) = args.direction {
                let key = params.sort_key();
                params = params.with_sort(key, direction);
            }
        }
    }
    if let Some(filter) = &args.filter {
        params = params.with_filter_text(filter.as_str());
    }
    if let Some(source) = &args.source {
        params = params.with_field_filter(FieldFilter::parse(source));
    }
    if args.from.is_some() || args.to.is_some() {
        params = params.with_date_range(args.from, args.to);
    }
    if let Some(size) = args.page_size {
        params = params.with_page_size(size);
    }
    if let Some(page) = args.page {
        params = params.with_page(page);
    }
    Ok(params)
}
