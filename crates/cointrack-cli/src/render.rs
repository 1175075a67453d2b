// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Plain-text rendering of pages, snapshots, and controller notices.

use cointrack_app::timestamp::{ABSENT_MARKER, format_date};
use cointrack_app::{
    AdminStats, Broadcast, CanonicalSnapshot, Page, PageLink, Profiles, RemoteTotals, Role,
    SessionUser, Transaction, User, page_window,
};
use cointrack_sync::AdminEvent;
use std::fmt::Write as _;
use time::OffsetDateTime;

pub fn transactions(page: &Page<Transaction>) -> String {
    if page.is_empty() {
        return format!("no matching transactions\n{}", pager(page));
    }

    let source_width = column_width(page.items.iter().map(|item| item.source.as_str()), "SOURCE");
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10}  {:>8}  {:<source_width$}  {:>8}  ID",
        "DATE", "AMOUNT", "SOURCE", "BALANCE"
    );
    for item in &page.items {
        let _ = writeln!(
            out,
            "{:<10}  {:>+8}  {:<source_width$}  {:>8}  {}",
            day(Some(item.date)),
            item.amount,
            item.source,
            item.balance_after(),
            item.id
        );
    }
    out.push_str(&pager(page));
    out
}

pub fn users(page: &Page<User>) -> String {
    if page.is_empty() {
        return format!("no matching users\n{}", pager(page));
    }

    let name_width = column_width(page.items.iter().map(|item| item.username.as_str()), "USERNAME");
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<name_width$}  {:>8}  {:>5}  {:<10}  {:<10}  ID",
        "USERNAME", "BALANCE", "TXNS", "UPDATED", "CREATED"
    );
    for item in &page.items {
        let _ = writeln!(
            out,
            "{:<name_width$}  {:>8}  {:>5}  {:<10}  {:<10}  {}",
            item.username,
            item.balance,
            item.transaction_count,
            day(item.last_updated),
            day(item.created_at),
            item.id
        );
    }
    out.push_str(&pager(page));
    out
}

/// `page 4 of 8 (53 records)` followed by the pagination controls, if any.
pub fn pager<R>(page: &Page<R>) -> String {
    let noun = if page.total_items == 1 {
        "record"
    } else {
        "records"
    };
    let mut out = format!(
        "page {} of {} ({} {noun})",
        page.current_page, page.total_pages, page.total_items
    );
    let links = page_window(page.current_page, page.total_pages);
    if !links.is_empty() {
        let controls: Vec<String> = links
            .into_iter()
            .filter_map(|link| match link {
                PageLink::Previous { enabled, .. } => enabled.then(|| "<".to_owned()),
                PageLink::Number { page, current } if current => Some(format!("[{page}]")),
                PageLink::Number { page, .. } => Some(page.to_string()),
                PageLink::Gap => Some("..".to_owned()),
                PageLink::Next { enabled, .. } => enabled.then(|| ">".to_owned()),
            })
            .collect();
        out.push_str("  ");
        out.push_str(&controls.join(" "));
    }
    out.push('\n');
    out
}

pub fn totals(totals: &RemoteTotals) -> String {
    format!(
        "{} transactions in range, earned {}, spent {}\n",
        totals.total_items,
        totals.total_earned,
        totals.total_spent.unsigned_abs()
    )
}

pub fn summary(snapshot: &CanonicalSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "profile   {}", snapshot.profile);
    let _ = writeln!(out, "balance   {}", snapshot.balance);
    let _ = writeln!(
        out,
        "goal      {} ({}%, {} to go)",
        snapshot.goal,
        snapshot.progress,
        snapshot.remaining_to_goal()
    );
    let estimate = snapshot
        .estimated_days
        .map(|days| format!("{days} days"))
        .unwrap_or_else(|| ABSENT_MARKER.to_owned());
    let _ = writeln!(out, "estimate  {estimate}");
    let stats = &snapshot.dashboard_stats;
    let _ = writeln!(
        out,
        "earned    today {}, week {}, month {}",
        stats.today, stats.week, stats.month
    );
    let _ = writeln!(
        out,
        "records   {} transactions, {} achievements",
        snapshot.transactions.len(),
        snapshot.achievements.len()
    );
    let actions = &snapshot.settings.quick_actions;
    if !actions.is_empty() {
        let labels: Vec<String> = actions
            .iter()
            .map(|action| format!("{:+} {}", action.signed_amount(), action.text))
            .collect();
        let _ = writeln!(out, "quick     {}", labels.join(", "));
    }
    out
}

pub fn profiles(profiles: &Profiles) -> String {
    let mut out = String::new();
    for name in &profiles.profiles {
        let marker = if *name == profiles.current_profile {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(out, "{marker} {name}");
    }
    out
}

pub fn session_user(user: &SessionUser) -> String {
    let role = match user.role {
        Role::User => "user",
        Role::Admin => "admin",
    };
    format!("{} ({role})\n", user.username)
}

pub fn broadcast(broadcast: &Broadcast) -> String {
    if broadcast.message.trim().is_empty() {
        return "no broadcast\n".to_owned();
    }
    match &broadcast.set_by {
        Some(author) => format!("{} (from {author})\n", broadcast.message),
        None => format!("{}\n", broadcast.message),
    }
}

pub fn admin_stats(stats: &AdminStats) -> String {
    let mut out = format!(
        "{} users, {} coins, {} transactions\n",
        stats.stats.total_users, stats.stats.total_coins, stats.stats.total_transactions
    );
    let signups: i64 = stats.chart_data.data.iter().sum();
    if !stats.chart_data.labels.is_empty() {
        let _ = writeln!(
            out,
            "{signups} sign-ups over the last {} days",
            stats.chart_data.labels.len()
        );
    }
    out
}

/// One-line notice for admin events that change server state or report a
/// failed follow-up step.
pub fn admin_notice(event: &AdminEvent) -> Option<String> {
    match event {
        AdminEvent::UserDeleted { id } => Some(format!("deleted user {id}\n")),
        AdminEvent::Failed { action, error } => Some(format!("{action} failed: {error}\n")),
        AdminEvent::BroadcastSet { message } if message.is_empty() => {
            Some("broadcast cleared\n".to_owned())
        }
        AdminEvent::BroadcastSet { message } => Some(format!("broadcast set: {message}\n")),
        _ => None,
    }
}

fn day(value: Option<OffsetDateTime>) -> String {
    value
        .map(|instant| format_date(instant.date()))
        .unwrap_or_else(|| ABSENT_MARKER.to_owned())
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>, header: &str) -> usize {
    values
        .map(|value| value.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(header.len())
}
