// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::error::ApiError;
use crate::ids::*;
use crate::timestamp;

pub const DEFAULT_GOAL: i64 = 13_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Ascending),
            "desc" => Some(Self::Descending),
            _ => None,
        }
    }

    pub const fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserSortKey {
    Username,
    Balance,
    TransactionCount,
    LastUpdated,
    CreatedAt,
}

impl UserSortKey {
    pub const ALL: [Self; 5] = [
        Self::Username,
        Self::Balance,
        Self::TransactionCount,
        Self::LastUpdated,
        Self::CreatedAt,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Balance => "balance",
            Self::TransactionCount => "txn_count",
            Self::LastUpdated => "last_updated",
            Self::CreatedAt => "created_at",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "username" => Some(Self::Username),
            "balance" => Some(Self::Balance),
            "txn_count" => Some(Self::TransactionCount),
            "last_updated" => Some(Self::LastUpdated),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionSortKey {
    Date,
    Amount,
    Source,
    PreviousBalance,
}

impl TransactionSortKey {
    pub const ALL: [Self; 4] = [
        Self::Date,
        Self::Amount,
        Self::Source,
        Self::PreviousBalance,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Amount => "amount",
            Self::Source => "source",
            Self::PreviousBalance => "previous_balance",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "date" => Some(Self::Date),
            "amount" => Some(Self::Amount),
            "source" => Some(Self::Source),
            "previous_balance" => Some(Self::PreviousBalance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub balance: i64,
    #[serde(default, rename = "txn_count")]
    pub transaction_count: i64,
    #[serde(default, with = "timestamp::optional")]
    pub last_updated: Option<OffsetDateTime>,
    #[serde(default, with = "timestamp::optional")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub amount: i64,
    pub source: String,
    #[serde(with = "timestamp::required")]
    pub date: OffsetDateTime,
    #[serde(default)]
    pub previous_balance: i64,
}

impl Transaction {
    pub const fn is_income(&self) -> bool {
        self.amount > 0
    }

    pub const fn balance_after(&self) -> i64 {
        self.previous_balance + self.amount
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAction {
    pub text: String,
    pub value: i64,
    pub is_positive: bool,
}

impl QuickAction {
    pub const fn signed_amount(&self) -> i64 {
        if self.is_positive {
            self.value
        } else {
            -self.value
        }
    }
}

fn default_goal() -> i64 {
    DEFAULT_GOAL
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_goal")]
    pub goal: i64,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub quick_actions: Vec<QuickAction>,
    #[serde(default)]
    pub all_sources: Vec<String>,
    #[serde(default)]
    pub firebase_available: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            goal: DEFAULT_GOAL,
            dark_mode: false,
            quick_actions: Vec::new(),
            all_sources: Vec::new(),
            firebase_available: false,
        }
    }
}

/// Partial settings update; only the fields that are set are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
}

impl SettingsPatch {
    pub const fn is_empty(&self) -> bool {
        self.goal.is_none() && self.dark_mode.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DashboardStats {
    #[serde(default)]
    pub today: i64,
    #[serde(default)]
    pub week: i64,
    #[serde(default)]
    pub month: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    #[serde(with = "timestamp::optional", default)]
    pub date: Option<OffsetDateTime>,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Analytics {
    #[serde(default)]
    pub total_earnings: i64,
    #[serde(default)]
    pub total_spending: i64,
    #[serde(default)]
    pub net_balance: i64,
    #[serde(default)]
    pub earnings_breakdown: BTreeMap<String, i64>,
    #[serde(default)]
    pub spending_breakdown: BTreeMap<String, i64>,
    #[serde(default)]
    pub timeline: Vec<TimelinePoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub icon: String,
    pub name: String,
    pub desc: String,
}

/// Complete server-authoritative application state, as returned by
/// `GET /api/data` and by every state-changing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CanonicalSnapshot {
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub balance: i64,
    #[serde(default = "default_goal")]
    pub goal: i64,
    #[serde(default)]
    pub progress: i64,
    #[serde(default, deserialize_with = "deserialize_estimated_days")]
    pub estimated_days: Option<i64>,
    #[serde(default)]
    pub dashboard_stats: DashboardStats,
    #[serde(default)]
    pub analytics: Analytics,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
}

impl CanonicalSnapshot {
    pub fn transaction(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|transaction| &transaction.id == id)
    }

    pub fn remaining_to_goal(&self) -> i64 {
        (self.goal - self.balance).max(0)
    }
}

// The server writes a day count, or "N/A" when no estimate exists yet.
fn deserialize_estimated_days<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Days(i64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Days(days)) => Some(days),
        Some(Raw::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

/// Totals over the whole filtered history range, not just the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RemoteTotals {
    #[serde(default, rename = "total_transactions")]
    pub total_items: usize,
    #[serde(default)]
    pub total_earned: i64,
    /// Sum of the negative amounts, so zero or below.
    #[serde(default)]
    pub total_spent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Profiles {
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub current_profile: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Broadcast {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub set_by: Option<String>,
    #[serde(default, with = "timestamp::optional")]
    pub set_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AdminTotals {
    #[serde(default)]
    pub total_users: i64,
    #[serde(default)]
    pub total_coins: i64,
    #[serde(default)]
    pub total_transactions: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SignupSeries {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub data: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AdminStats {
    #[serde(default)]
    pub stats: AdminTotals,
    #[serde(default)]
    pub chart_data: SignupSeries,
}

/// Contents of an exported ledger file, validated before upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportFile {
    pub transactions: Vec<serde_json::Value>,
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl ImportFile {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|error| ApiError::MalformedInput(format!("not valid JSON ({error})")))?;
        let serde_json::Value::Object(mut root) = value else {
            return Err(ApiError::MalformedInput(
                "expected a JSON object with 'transactions' and 'settings'".to_owned(),
            ));
        };

        let transactions = match root.remove("transactions") {
            Some(serde_json::Value::Array(items)) => items,
            Some(_) => {
                return Err(ApiError::MalformedInput(
                    "'transactions' must be an array".to_owned(),
                ));
            }
            None => {
                return Err(ApiError::MalformedInput(
                    "missing 'transactions' or 'settings'".to_owned(),
                ));
            }
        };
        let settings = match root.remove("settings") {
            Some(serde_json::Value::Object(settings)) => settings,
            Some(_) => {
                return Err(ApiError::MalformedInput(
                    "'settings' must be an object".to_owned(),
                ));
            }
            None => {
                return Err(ApiError::MalformedInput(
                    "missing 'transactions' or 'settings'".to_owned(),
                ));
            }
        };

        Ok(Self {
            transactions,
            settings,
        })
    }
}

/// A state-changing request. Every variant is answered with a complete
/// [`CanonicalSnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddTransaction {
        amount: i64,
        source: String,
        date: Option<OffsetDateTime>,
    },
    UpdateTransaction {
        id: TransactionId,
        amount: i64,
        source: String,
        date: OffsetDateTime,
    },
    DeleteTransaction {
        id: TransactionId,
    },
    UpdateSettings(SettingsPatch),
    AddQuickAction(QuickAction),
    DeleteQuickAction {
        index: usize,
    },
    SwitchProfile {
        name: String,
    },
    CreateProfile {
        name: String,
    },
    ImportData(ImportFile),
}

impl Mutation {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AddTransaction { .. } => "add transaction",
            Self::UpdateTransaction { .. } => "update transaction",
            Self::DeleteTransaction { .. } => "delete transaction",
            Self::UpdateSettings(_) => "update settings",
            Self::AddQuickAction(_) => "add quick action",
            Self::DeleteQuickAction { .. } => "delete quick action",
            Self::SwitchProfile { .. } => "switch profile",
            Self::CreateProfile { .. } => "create profile",
            Self::ImportData(_) => "import data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CanonicalSnapshot, ImportFile, SortDirection, TransactionSortKey, User, UserSortKey};
    use crate::ApiError;

    #[test]
    fn sort_keys_round_trip_through_wire_names() {
        for key in UserSortKey::ALL {
            assert_eq!(UserSortKey::parse(key.as_str()), Some(key));
        }
        for key in TransactionSortKey::ALL {
            assert_eq!(TransactionSortKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(UserSortKey::parse("password"), None);
        assert_eq!(SortDirection::parse("desc"), Some(SortDirection::Descending));
        assert_eq!(SortDirection::Ascending.reversed(), SortDirection::Descending);
    }

    #[test]
    fn admin_user_row_decodes_absent_markers() {
        let user: User = serde_json::from_str(
            r#"{"user_id":"u1","username":"ana","created_at":"N/A","balance":12,"last_updated":"N/A","txn_count":3}"#,
        )
        .expect("decode user");
        assert_eq!(user.id.as_str(), "u1");
        assert_eq!(user.transaction_count, 3);
        assert!(user.created_at.is_none());
        assert!(user.last_updated.is_none());
    }

    #[test]
    fn snapshot_accepts_na_estimate_and_missing_sections() {
        let snapshot: CanonicalSnapshot = serde_json::from_str(
            r#"{"profile":"Default","transactions":[{"id":"t1","amount":50,"source":"Login","date":"2025-01-02T03:04:05+00:00"}],"balance":50,"estimated_days":"N/A","success":true}"#,
        )
        .expect("decode snapshot");
        assert_eq!(snapshot.estimated_days, None);
        assert_eq!(snapshot.goal, super::DEFAULT_GOAL);
        assert_eq!(snapshot.transactions[0].previous_balance, 0);
        assert_eq!(snapshot.remaining_to_goal(), super::DEFAULT_GOAL - 50);

        let counted: CanonicalSnapshot =
            serde_json::from_str(r#"{"estimated_days":12}"#).expect("decode estimate");
        assert_eq!(counted.estimated_days, Some(12));
    }

    #[test]
    fn import_file_requires_transactions_and_settings() {
        let parsed = ImportFile::parse(r#"{"transactions":[{"amount":5}],"settings":{"goal":10}}"#)
            .expect("valid import");
        assert_eq!(parsed.transactions.len(), 1);
        assert!(parsed.settings.contains_key("goal"));

        let missing = ImportFile::parse(r#"{"transactions":[]}"#).expect_err("settings missing");
        assert!(matches!(missing, ApiError::MalformedInput(_)));

        let garbage = ImportFile::parse("not json").expect_err("garbage rejected");
        assert!(matches!(garbage, ApiError::MalformedInput(_)));
    }
}
