// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use cointrack_app::{
    ApiError, FieldFilter, ImportFile, Mutation, QuickAction, SettingsPatch, TransactionId, UserId,
    ViewParameters,
};
use cointrack_client::ApiClient;
use cointrack_sync::{AdminBackend, LedgerBackend, PageSource, RemotePageFetcher, SessionFlag};
use cointrack_testkit::LedgerFaker;
use std::io::Read;
use std::rc::Rc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

#[derive(Debug)]
struct Recorded {
    method: String,
    url: String,
    body: String,
    headers: Vec<(String, String)>,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Answers one request per entry in `replies`, in order, and hands back what
/// it received.
fn mock_server(replies: Vec<(u16, String)>) -> Result<(String, JoinHandle<Vec<Recorded>>)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let mut recorded = Vec::new();
        for (status, body) in replies {
            let mut request = server.recv().expect("request expected");
            let mut request_body = String::new();
            request
                .as_reader()
                .read_to_string(&mut request_body)
                .expect("request body should be readable");
            recorded.push(Recorded {
                method: request.method().to_string(),
                url: request.url().to_owned(),
                body: request_body,
                headers: request
                    .headers()
                    .iter()
                    .map(|header| (header.field.to_string(), header.value.to_string()))
                    .collect(),
            });
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    Header::from_bytes("Content-Type", "application/json")
                        .expect("valid content type header"),
                );
            request.respond(response).expect("response should succeed");
        }
        recorded
    });
    Ok((addr, handle))
}

fn client(addr: &str) -> Result<ApiClient> {
    ApiClient::new(addr, Duration::from_secs(2), Some("signed-cookie"))
}

fn snapshot_json(seed: u64, transactions: usize) -> Result<String> {
    Ok(serde_json::to_string(&LedgerFaker::new(seed).snapshot(transactions))?)
}

#[test]
fn unreachable_server_is_a_network_error() -> Result<()> {
    let client = ApiClient::new("http://127.0.0.1:1", Duration::from_millis(50), None)?;
    let error = client.load_snapshot().expect_err("nothing listens on port 1");
    let ApiError::Network(message) = &error else {
        panic!("expected network error, got {error:?}");
    };
    assert!(message.contains("cannot reach http://127.0.0.1:1"));
    Ok(())
}

#[test]
fn invalid_base_url_is_rejected_up_front() {
    assert!(ApiClient::new("", Duration::from_secs(1), None).is_err());
    assert!(ApiClient::new("not a url", Duration::from_secs(1), None).is_err());
    assert!(
        ApiClient::new(
            "http://localhost:5000",
            Duration::from_secs(1),
            Some("bad\nvalue")
        )
        .is_err()
    );
}

#[test]
fn load_snapshot_sends_session_and_ajax_headers() -> Result<()> {
    let body = snapshot_json(1, 4)?;
    let (addr, handle) = mock_server(vec![(200, body)])?;

    let snapshot = client(&format!("{addr}/"))?.load_snapshot()?;
    assert_eq!(snapshot.transactions.len(), 4);

    let requests = handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, "/api/data");
    assert_eq!(requests[0].header("X-Requested-With"), Some("XMLHttpRequest"));
    assert_eq!(requests[0].header("Cookie"), Some("session=signed-cookie"));
    Ok(())
}

#[test]
fn unauthorized_maps_to_auth_expired_before_reading_the_body() -> Result<()> {
    let (addr, handle) = mock_server(vec![(
        401,
        r#"{"error": "Unauthorized", "success": false}"#.to_owned(),
    )])?;

    let result = client(&addr)?.profiles();
    assert_eq!(result, Err(ApiError::AuthExpired));
    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn error_body_becomes_validation_error() -> Result<()> {
    let (addr, handle) = mock_server(vec![(
        400,
        r#"{"success": false, "error": "Invalid index"}"#.to_owned(),
    )])?;

    let result = client(&addr)?.apply(&Mutation::DeleteQuickAction { index: 7 });
    assert_eq!(
        result,
        Err(ApiError::Validation("Invalid index".to_owned()))
    );

    let requests = handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].url, "/api/delete-quick-action");
    let body: serde_json::Value = serde_json::from_str(&requests[0].body)?;
    assert_eq!(body, serde_json::json!({ "index": 7 }));
    Ok(())
}

#[test]
fn undecodable_success_body_is_a_network_error() -> Result<()> {
    let (addr, handle) = mock_server(vec![(200, "<html>login</html>".to_owned())])?;

    let result = client(&addr)?.current_user();
    assert!(matches!(
        result,
        Err(ApiError::Network(message)) if message.starts_with("decode current user")
    ));
    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn transaction_mutations_post_to_their_endpoints() -> Result<()> {
    let snapshot = snapshot_json(2, 1)?;
    let (addr, handle) = mock_server(vec![(200, snapshot); 6])?;
    let client = client(&addr)?;

    client.apply(&Mutation::AddTransaction {
        amount: -25,
        source: "Snacks".to_owned(),
        date: Some(time::macros::datetime!(2026-02-01 09:30:00 UTC)),
    })?;
    client.apply(&Mutation::DeleteTransaction {
        id: TransactionId::new("5f0c6d1e-0000-4000-8000-00000000abcd"),
    })?;
    client.apply(&Mutation::UpdateSettings(SettingsPatch {
        goal: Some(2500),
        dark_mode: None,
    }))?;
    client.apply(&Mutation::AddQuickAction(QuickAction {
        text: "Dishes".to_owned(),
        value: 15,
        is_positive: true,
    }))?;
    client.apply(&Mutation::DeleteQuickAction { index: 1 })?;
    client.apply(&Mutation::ImportData(ImportFile::parse(
        r#"{"transactions": [{"amount": 40, "source": "Gift"}], "settings": {"goal": 800}}"#,
    )?))?;

    let requests = handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    assert_eq!(requests[0].url, "/api/add-transaction");
    let body: serde_json::Value = serde_json::from_str(&requests[0].body)?;
    assert_eq!(
        body,
        serde_json::json!({
            "amount": -25,
            "source": "Snacks",
            "date": "2026-02-01T09:30:00Z",
        })
    );
    assert_eq!(
        requests[1].url,
        "/api/delete-transaction/5f0c6d1e-0000-4000-8000-00000000abcd"
    );

    let urls: Vec<&str> = requests[2..]
        .iter()
        .map(|request| request.url.as_str())
        .collect();
    assert_eq!(
        urls,
        vec![
            "/api/update-settings",
            "/api/add-quick-action",
            "/api/delete-quick-action",
            "/api/import-data",
        ]
    );
    let bodies = requests[2..]
        .iter()
        .map(|request| serde_json::from_str(&request.body))
        .collect::<serde_json::Result<Vec<serde_json::Value>>>()?;
    assert_eq!(
        bodies,
        vec![
            serde_json::json!({ "goal": 2500 }),
            serde_json::json!({ "text": "Dishes", "value": 15, "is_positive": true }),
            serde_json::json!({ "index": 1 }),
            serde_json::json!({
                "transactions": [{ "amount": 40, "source": "Gift" }],
                "settings": { "goal": 800 },
            }),
        ]
    );
    Ok(())
}

#[test]
fn switching_profile_reloads_the_snapshot() -> Result<()> {
    let (addr, handle) = mock_server(vec![
        (200, r#"{"success": true}"#.to_owned()),
        (200, snapshot_json(3, 2)?),
    ])?;

    let snapshot = client(&addr)?.apply(&Mutation::SwitchProfile {
        name: "School Savings".to_owned(),
    })?;
    assert_eq!(snapshot.transactions.len(), 2);

    let requests = handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    assert_eq!(requests[0].url, "/api/switch-profile");
    assert!(requests[0].body.contains(r#""profile_name":"School Savings""#));
    assert_eq!(requests[1].url, "/api/data");
    Ok(())
}

#[test]
fn duplicate_profile_is_rejected_without_reloading() -> Result<()> {
    let (addr, handle) = mock_server(vec![(
        409,
        r#"{"success": false, "error": "Profile already exists"}"#.to_owned(),
    )])?;

    let result = client(&addr)?.apply(&Mutation::CreateProfile {
        name: "Default".to_owned(),
    });
    assert_eq!(
        result,
        Err(ApiError::Validation("Profile already exists".to_owned()))
    );
    assert_eq!(handle.join().map_err(|_| anyhow!("server thread panicked"))?.len(), 1);
    Ok(())
}

#[test]
fn history_sends_only_non_default_parameters() -> Result<()> {
    let transactions = LedgerFaker::new(4).history(2);
    let body = serde_json::json!({
        "transactions": transactions,
        "total_pages": 3,
        "current_page": 2,
        "total_transactions": 42,
        "total_earned": 900,
        "total_spent": -120,
    });
    let (addr, handle) = mock_server(vec![(200, body.to_string())])?;

    let params = ViewParameters::history()
        .with_filter_text("gift & more")
        .with_field_filter(FieldFilter::Only("Birthday Gift".to_owned()))
        .with_page(2);
    let page = client(&addr)?.fetch_page(&params)?;

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.current_page, 2);
    assert_eq!(page.totals.total_items, 42);
    assert_eq!(page.totals.total_earned, 900);
    assert_eq!(page.totals.total_spent, -120);

    let requests = handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    assert_eq!(
        requests[0].url,
        "/api/history?page=2&search=gift+%26+more&source=Birthday+Gift"
    );
    Ok(())
}

#[test]
fn fetcher_over_http_refetches_a_vanished_page() -> Result<()> {
    let last_page = LedgerFaker::new(5).history(3);
    let empty = serde_json::json!({
        "transactions": [],
        "total_pages": 2,
        "current_page": 5,
        "total_transactions": 23,
    });
    let filled = serde_json::json!({
        "transactions": last_page,
        "total_pages": 2,
        "current_page": 2,
        "total_transactions": 23,
    });
    let (addr, handle) = mock_server(vec![(200, empty.to_string()), (200, filled.to_string())])?;

    let mut fetcher = RemotePageFetcher::new(
        client(&addr)?,
        Rc::new(SessionFlag::new()),
        ViewParameters::history(),
    );
    let page = fetcher.go_to_page(5)?;
    assert_eq!(page.current_page, 2);
    assert_eq!(page.items.len(), 3);

    let requests = handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    let urls: Vec<&str> = requests.iter().map(|request| request.url.as_str()).collect();
    assert_eq!(urls, vec!["/api/history?page=5", "/api/history?page=2"]);
    Ok(())
}

#[test]
fn admin_endpoints_round_trip() -> Result<()> {
    let users = serde_json::json!({
        "success": true,
        "users": [
            {
                "user_id": "u-1",
                "username": "avery",
                "created_at": "2025-11-02T08:00:00+00:00",
                "balance": 1200,
                "last_updated": "N/A",
                "txn_count": 14
            }
        ]
    });
    let (addr, handle) = mock_server(vec![
        (200, users.to_string()),
        (200, r#"{"success": true}"#.to_owned()),
        (200, r#"{"success": true}"#.to_owned()),
    ])?;
    let client = client(&addr)?;

    let listed = client.list_users()?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].transaction_count, 14);
    assert_eq!(listed[0].last_updated, None);

    client.delete_user(&UserId::new("u-1"))?;
    client.set_broadcast("Pizza party on Friday")?;

    let requests = handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    assert_eq!(requests[1].url, "/api/admin/delete-user");
    assert_eq!(requests[1].body, r#"{"user_id":"u-1"}"#);
    assert_eq!(requests[2].url, "/api/admin/broadcast");
    assert_eq!(requests[2].body, r#"{"message":"Pizza party on Friday"}"#);
    Ok(())
}
