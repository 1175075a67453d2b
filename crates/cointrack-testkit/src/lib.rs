// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use cointrack_app::{
    AdminStats, ApiError, ApiResult, Broadcast, CanonicalSnapshot, DEFAULT_GOAL, Mutation,
    Profiles, RemoteTotals, SessionUser, Settings, Transaction, TransactionId, TransactionSortKey,
    User, UserId, ViewParameters, project,
};
use cointrack_sync::{AdminBackend, LedgerBackend, PageSource, RemotePage};
use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

const INCOME_SOURCES: [&str; 6] = [
    "Allowance",
    "Chores",
    "Birthday Gift",
    "Deposit",
    "Lemonade Stand",
    "Bonus",
];

const SPENDING_SOURCES: [&str; 6] = [
    "Snacks",
    "Video Games",
    "Toys",
    "Books",
    "Movie Tickets",
    "Savings Withdrawal",
];

const FIRST_NAMES: [&str; 16] = [
    "avery", "jordan", "taylor", "riley", "morgan", "casey", "alex", "quinn", "parker", "drew",
    "kai", "elliot", "robin", "cameron", "hayden", "rowan",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as u64;
        min + (self.next_u64() % span) as i64
    }
}

/// Seeded generator of users and ledgers. The same seed always yields the
/// same data.
#[derive(Debug, Clone)]
pub struct LedgerFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl LedgerFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// Random UUID-v4-shaped id, as the server issues.
    pub fn id(&mut self) -> String {
        let high = self.rng.next_u64();
        let low = self.rng.next_u64();
        format!(
            "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
            high >> 32,
            (high >> 16) & 0xFFFF,
            high & 0x0FFF,
            ((low >> 48) & 0x3FFF) | 0x8000,
            low & 0xFFFF_FFFF_FFFF,
        )
    }

    pub fn user(&mut self) -> User {
        let name = FIRST_NAMES[self.rng.int_n(FIRST_NAMES.len())];
        let created_at = self.instant_before(reference_now(), 365);
        let last_updated = if self.rng.int_n(5) == 0 {
            None
        } else {
            Some(self.instant_before(reference_now(), 30))
        };
        User {
            id: UserId::new(self.id()),
            username: format!("{name}{}", self.rng.range(1, 999)),
            balance: self.rng.range(0, 20_000),
            transaction_count: self.rng.range(0, 250),
            last_updated,
            created_at: Some(created_at),
        }
    }

    pub fn users(&mut self, count: usize) -> Vec<User> {
        (0..count).map(|_| self.user()).collect()
    }

    pub fn transaction(&mut self, previous_balance: i64, date: OffsetDateTime) -> Transaction {
        let income = previous_balance <= 0 || self.rng.int_n(3) != 0;
        let (source, amount) = if income {
            let source = INCOME_SOURCES[self.rng.int_n(INCOME_SOURCES.len())];
            (source, self.rng.range(1, 500))
        } else {
            let source = SPENDING_SOURCES[self.rng.int_n(SPENDING_SOURCES.len())];
            (source, -self.rng.range(1, previous_balance.min(300)))
        };
        Transaction {
            id: TransactionId::new(self.id()),
            amount,
            source: source.to_owned(),
            date,
            previous_balance,
        }
    }

    /// `count` transactions in date order, each starting from the balance the
    /// previous one left.
    pub fn history(&mut self, count: usize) -> Vec<Transaction> {
        let mut balance = 0;
        let mut date = reference_now() - Duration::days(count as i64);
        let mut transactions = Vec::with_capacity(count);
        for _ in 0..count {
            date += Duration::hours(self.rng.range(1, 30));
            let transaction = self.transaction(balance, date);
            balance = transaction.balance_after();
            transactions.push(transaction);
        }
        transactions
    }

    pub fn snapshot(&mut self, count: usize) -> CanonicalSnapshot {
        let transactions = self.history(count);
        let balance = transactions.last().map_or(0, Transaction::balance_after);
        let all_sources: BTreeSet<String> = transactions
            .iter()
            .map(|transaction| transaction.source.clone())
            .collect();
        CanonicalSnapshot {
            profile: "default".to_owned(),
            settings: Settings {
                all_sources: all_sources.into_iter().collect(),
                ..Settings::default()
            },
            balance,
            goal: DEFAULT_GOAL,
            progress: (balance * 100 / DEFAULT_GOAL).clamp(0, 100),
            transactions,
            ..CanonicalSnapshot::default()
        }
    }

    fn instant_before(&mut self, end: OffsetDateTime, max_days: i64) -> OffsetDateTime {
        end - Duration::seconds(self.rng.range(0, max_days * 86_400))
    }
}

pub fn reference_now() -> OffsetDateTime {
    datetime!(2026-02-19 12:34:56 UTC)
}

/// Export file body for `snapshot`, shaped like the server's export.
pub fn import_file_contents(snapshot: &CanonicalSnapshot) -> Result<String> {
    let body = serde_json::json!({
        "transactions": snapshot.transactions,
        "settings": snapshot.settings,
    });
    serde_json::to_string_pretty(&body).context("serialize import file")
}

pub fn temp_import_file(contents: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("coin-tracker-export.json");
    std::fs::write(&path, contents)
        .with_context(|| format!("write import file {}", path.display()))?;
    Ok((dir, path))
}

/// In-memory stand-in for `/api/history`: filters and sorts like the local
/// projection, then pages the way the server does (no clamping, zero pages
/// when nothing matches).
#[derive(Debug, Clone, Default)]
pub struct HistoryServer {
    transactions: Vec<Transaction>,
}

impl HistoryServer {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }
}

impl PageSource for HistoryServer {
    type Record = Transaction;

    fn fetch_page(
        &self,
        params: &ViewParameters<TransactionSortKey>,
    ) -> ApiResult<RemotePage<Transaction>> {
        let unpaged = params.clone().with_page_size(u32::MAX);
        let matched = project(&self.transactions, &unpaged).items;

        let size = params.page_size() as usize;
        let total_pages = u32::try_from(matched.len().div_ceil(size)).unwrap_or(u32::MAX);
        let start = (params.page() as usize - 1).saturating_mul(size);
        let totals = RemoteTotals {
            total_items: matched.len(),
            total_earned: matched
                .iter()
                .filter(|transaction| transaction.amount > 0)
                .map(|transaction| transaction.amount)
                .sum(),
            total_spent: matched
                .iter()
                .filter(|transaction| transaction.amount < 0)
                .map(|transaction| transaction.amount)
                .sum(),
        };
        Ok(RemotePage {
            items: matched.into_iter().skip(start).take(size).collect(),
            current_page: params.page(),
            total_pages,
            totals,
        })
    }
}

#[derive(Debug, Default)]
struct Script {
    snapshots: VecDeque<ApiResult<CanonicalSnapshot>>,
    profiles: VecDeque<ApiResult<Profiles>>,
    current_users: VecDeque<ApiResult<SessionUser>>,
    broadcasts: VecDeque<ApiResult<Broadcast>>,
    users: VecDeque<ApiResult<Vec<User>>>,
    stats: VecDeque<ApiResult<AdminStats>>,
    acks: VecDeque<ApiResult<()>>,
    pages: VecDeque<ApiResult<RemotePage<Transaction>>>,
    calls: Vec<String>,
    page_requests: Vec<ViewParameters<TransactionSortKey>>,
}

fn next<T>(queue: &mut VecDeque<ApiResult<T>>, what: &str) -> ApiResult<T> {
    queue
        .pop_front()
        .unwrap_or_else(|| Err(ApiError::Network(format!("no scripted response for {what}"))))
}

/// Backend that answers from queued responses and records every call.
/// Clones share one script, so a clone moved to a worker thread still
/// reports into the original.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answers the next `load_snapshot` or `apply`.
    pub fn push_snapshot(&self, result: ApiResult<CanonicalSnapshot>) -> &Self {
        self.script().snapshots.push_back(result);
        self
    }

    pub fn push_profiles(&self, result: ApiResult<Profiles>) -> &Self {
        self.script().profiles.push_back(result);
        self
    }

    pub fn push_current_user(&self, result: ApiResult<SessionUser>) -> &Self {
        self.script().current_users.push_back(result);
        self
    }

    pub fn push_broadcast(&self, result: ApiResult<Broadcast>) -> &Self {
        self.script().broadcasts.push_back(result);
        self
    }

    pub fn push_users(&self, result: ApiResult<Vec<User>>) -> &Self {
        self.script().users.push_back(result);
        self
    }

    pub fn push_stats(&self, result: ApiResult<AdminStats>) -> &Self {
        self.script().stats.push_back(result);
        self
    }

    /// Answers the next `delete_user` or `set_broadcast`.
    pub fn push_ack(&self, result: ApiResult<()>) -> &Self {
        self.script().acks.push_back(result);
        self
    }

    pub fn push_page(&self, result: ApiResult<RemotePage<Transaction>>) -> &Self {
        self.script().pages.push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }

    pub fn page_requests(&self) -> Vec<ViewParameters<TransactionSortKey>> {
        self.script().page_requests.clone()
    }

    fn record(&self, call: String) -> MutexGuard<'_, Script> {
        let mut script = self.script();
        script.calls.push(call);
        script
    }
}

impl LedgerBackend for ScriptedBackend {
    fn load_snapshot(&self) -> ApiResult<CanonicalSnapshot> {
        next(&mut self.record("load".to_owned()).snapshots, "load")
    }

    fn apply(&self, mutation: &Mutation) -> ApiResult<CanonicalSnapshot> {
        let label = mutation.label();
        next(&mut self.record(format!("apply {label}")).snapshots, label)
    }

    fn profiles(&self) -> ApiResult<Profiles> {
        next(&mut self.record("profiles".to_owned()).profiles, "profiles")
    }

    fn current_user(&self) -> ApiResult<SessionUser> {
        next(&mut self.record("user".to_owned()).current_users, "user")
    }

    fn broadcast(&self) -> ApiResult<Broadcast> {
        next(&mut self.record("broadcast".to_owned()).broadcasts, "broadcast")
    }
}

impl AdminBackend for ScriptedBackend {
    fn list_users(&self) -> ApiResult<Vec<User>> {
        next(&mut self.record("list users".to_owned()).users, "list users")
    }

    fn admin_stats(&self) -> ApiResult<AdminStats> {
        next(&mut self.record("admin stats".to_owned()).stats, "admin stats")
    }

    fn delete_user(&self, id: &UserId) -> ApiResult<()> {
        next(&mut self.record(format!("delete user {id}")).acks, "delete user")
    }

    fn set_broadcast(&self, message: &str) -> ApiResult<()> {
        next(&mut self.record(format!("set broadcast {message}")).acks, "set broadcast")
    }
}

impl PageSource for ScriptedBackend {
    type Record = Transaction;

    fn fetch_page(
        &self,
        params: &ViewParameters<TransactionSortKey>,
    ) -> ApiResult<RemotePage<Transaction>> {
        let mut script = self.record(format!("fetch page {}", params.page()));
        script.page_requests.push(params.clone());
        next(&mut script.pages, "fetch page")
    }
}
