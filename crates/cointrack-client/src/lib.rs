// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use cointrack_app::timestamp::{format_date, format_timestamp};
use cointrack_app::{
    AdminStats, ApiError, ApiResult, Broadcast, CanonicalSnapshot, FieldFilter, Mutation,
    Profiles, RemoteTotals, SessionUser, Transaction, TransactionSortKey, User, UserId,
    ViewParameters,
};
use cointrack_sync::{AdminBackend, LedgerBackend, PageSource, RemotePage};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use time::OffsetDateTime;
use url::Url;

pub const SESSION_COOKIE_NAME: &str = "session";

/// Blocking client for the coin tracker JSON API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session_cookie: Option<&str>) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }
        Url::parse(&base_url)
            .with_context(|| format!("server.base_url {base_url:?} is not a valid URL"))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("XMLHttpRequest"),
        );
        if let Some(cookie) = session_cookie.map(str::trim).filter(|c| !c.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("{SESSION_COOKIE_NAME}={cookie}"))
                .context("session cookie contains characters not allowed in a header")?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `GET /api/history` for `params`.
    pub fn history(
        &self,
        params: &ViewParameters<TransactionSortKey>,
    ) -> ApiResult<RemotePage<Transaction>> {
        let mut url = self.endpoint(&["api", "history"])?;
        let query = history_query(params);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(&query);
        }
        log::debug!("GET {url}");

        let envelope: HistoryEnvelope = self.send(self.http.get(url), "history page")?;
        Ok(RemotePage {
            items: envelope.transactions,
            current_page: envelope.current_page,
            total_pages: envelope.total_pages,
            totals: envelope.totals,
        })
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str], what: &str) -> ApiResult<T> {
        let url = self.endpoint(segments)?;
        self.send(self.http.get(url), what)
    }

    fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &Value,
        what: &str,
    ) -> ApiResult<T> {
        let url = self.endpoint(segments)?;
        self.send(self.http.post(url).json(body), what)
    }

    fn post_ack(&self, segments: &[&str], body: &Value, what: &str) -> ApiResult<()> {
        let ack: Ack = self.post(segments, body, what)?;
        if ack.success {
            Ok(())
        } else {
            Err(ApiError::Validation(
                ack.error.unwrap_or_else(|| format!("{what} was rejected")),
            ))
        }
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> ApiResult<T> {
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        let response = check_status(response)?;
        response
            .json()
            .map_err(|error| ApiError::Network(format!("decode {what}: {error}")))
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| ApiError::Network(format!("invalid server URL: {error}")))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Network(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl LedgerBackend for ApiClient {
    fn load_snapshot(&self) -> ApiResult<CanonicalSnapshot> {
        self.get(&["api", "data"], "ledger data")
    }

    fn apply(&self, mutation: &Mutation) -> ApiResult<CanonicalSnapshot> {
        let what = mutation.label();
        log::debug!("applying {what}");
        match mutation {
            Mutation::AddTransaction {
                amount,
                source,
                date,
            } => {
                let date = date.unwrap_or_else(OffsetDateTime::now_utc);
                let body = transaction_body(*amount, source, date);
                self.post(&["api", "add-transaction"], &body, what)
            }
            Mutation::UpdateTransaction {
                id,
                amount,
                source,
                date,
            } => {
                let body = transaction_body(*amount, source, *date);
                self.post(&["api", "update-transaction", id.as_str()], &body, what)
            }
            Mutation::DeleteTransaction { id } => {
                self.post(&["api", "delete-transaction", id.as_str()], &json!({}), what)
            }
            Mutation::UpdateSettings(patch) => {
                self.post(&["api", "update-settings"], &to_body(patch)?, what)
            }
            Mutation::AddQuickAction(action) => {
                self.post(&["api", "add-quick-action"], &to_body(action)?, what)
            }
            Mutation::DeleteQuickAction { index } => self.post(
                &["api", "delete-quick-action"],
                &json!({ "index": index }),
                what,
            ),
            // Both profile calls answer with an acknowledgement only.
            Mutation::SwitchProfile { name } => {
                self.post_ack(
                    &["api", "switch-profile"],
                    &json!({ "profile_name": name }),
                    what,
                )?;
                self.load_snapshot()
            }
            Mutation::CreateProfile { name } => {
                self.post_ack(
                    &["api", "create-profile"],
                    &json!({ "profile_name": name }),
                    what,
                )?;
                self.load_snapshot()
            }
            Mutation::ImportData(file) => {
                self.post(&["api", "import-data"], &to_body(file)?, what)
            }
        }
    }

    fn profiles(&self) -> ApiResult<Profiles> {
        self.get(&["api", "profiles"], "profiles")
    }

    fn current_user(&self) -> ApiResult<SessionUser> {
        self.get(&["api", "user"], "current user")
    }

    fn broadcast(&self) -> ApiResult<Broadcast> {
        self.get(&["api", "broadcast"], "broadcast")
    }
}

impl AdminBackend for ApiClient {
    fn list_users(&self) -> ApiResult<Vec<User>> {
        let envelope: UsersEnvelope = self.get(&["api", "admin", "users"], "user list")?;
        Ok(envelope.users)
    }

    fn admin_stats(&self) -> ApiResult<AdminStats> {
        self.get(&["api", "admin", "stats"], "admin stats")
    }

    fn delete_user(&self, id: &UserId) -> ApiResult<()> {
        self.post_ack(
            &["api", "admin", "delete-user"],
            &json!({ "user_id": id }),
            "delete user",
        )
    }

    fn set_broadcast(&self, message: &str) -> ApiResult<()> {
        self.post_ack(
            &["api", "admin", "broadcast"],
            &json!({ "message": message }),
            "set broadcast",
        )
    }
}

impl PageSource for ApiClient {
    type Record = Transaction;

    fn fetch_page(
        &self,
        params: &ViewParameters<TransactionSortKey>,
    ) -> ApiResult<RemotePage<Transaction>> {
        self.history(params)
    }
}

/// Query pairs for `GET /api/history`. Defaults are left out so the server
/// applies its own.
pub fn history_query(params: &ViewParameters<TransactionSortKey>) -> Vec<(&'static str, String)> {
    let defaults = ViewParameters::history();
    let mut query = Vec::new();
    if params.page() != 1 {
        query.push(("page", params.page().to_string()));
    }
    if params.page_size() != defaults.page_size() {
        query.push(("limit", params.page_size().to_string()));
    }
    if let Some(from) = params.date_from() {
        query.push(("date_from", format_date(from)));
    }
    if let Some(to) = params.date_to() {
        query.push(("date_to", format_date(to)));
    }
    let search = params.filter_text().trim();
    if !search.is_empty() {
        query.push(("search", search.to_owned()));
    }
    if let FieldFilter::Only(source) = params.field_filter() {
        query.push(("source", source.clone()));
    }
    if params.sort_key() != defaults.sort_key()
        || params.sort_direction() != defaults.sort_direction()
    {
        query.push(("sort", params.sort_key().as_str().to_owned()));
        query.push(("order", params.sort_direction().as_str().to_owned()));
    }
    query
}

fn transaction_body(amount: i64, source: &str, date: OffsetDateTime) -> Value {
    json!({
        "amount": amount,
        "source": source,
        "date": format_timestamp(date),
    })
}

fn to_body<T: serde::Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|error| ApiError::MalformedInput(error.to_string()))
}

fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::AuthExpired);
    }
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(clean_error_response(status, &body))
}

fn connection_error(base_url: &str, error: reqwest::Error) -> ApiError {
    ApiError::Network(format!(
        "cannot reach {base_url} -- check that the server is running ({error})"
    ))
}

fn clean_error_response(status: StatusCode, body: &str) -> ApiError {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        return ApiError::Validation(error);
    }

    let body = body.trim();
    if !body.is_empty() && body.len() < 100 && !body.contains('<') && !body.contains('{') {
        return ApiError::Network(format!("server error ({}): {body}", status.as_u16()));
    }

    ApiError::Network(format!("server returned {}", status.as_u16()))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default)]
    total_pages: u32,
    #[serde(default = "first_page")]
    current_page: u32,
    #[serde(flatten)]
    totals: RemoteTotals,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct UsersEnvelope {
    #[serde(default)]
    users: Vec<User>,
}
