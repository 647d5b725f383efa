//! SQL query, paging and reconciliation tests against a mock AXL server.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use common::*;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use axl_connector::{reconcile, AxlError, LoginUser, SqlQuery, UserDeviceLine};

fn jtapi_users() -> Vec<String> {
    vec!["JTAPI_Rec".to_string()]
}

/// Mount an `executeSQLQuery` answer for requests whose body contains `needle`.
async fn mount_sql(server: &MockServer, needle: &str, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(AXL_PATH))
        .and(body_string_contains("executeSQLQuery"))
        .and(body_string_contains(needle))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Counts SQL requests so tests can assert how many pages were fetched.
struct CountingResponder {
    body: String,
    calls: Arc<AtomicU32>,
}

impl Respond for CountingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_string(self.body.clone())
    }
}

// =============================================================================
// Single Request
// =============================================================================

#[tokio::test]
async fn test_fetch_login_users() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(
        &server,
        "dg.name = 'Recorded Agents'",
        ResponseTemplate::new(200)
            .set_body_string(rows_body(&[login_row("alice"), login_row("bob")])),
    )
    .await;

    let mut connector = create_connector(&server);
    let users = connector
        .fetch_login_users("Recorded Agents", false)
        .await
        .unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].user_id, "alice");
    assert!(!users[0].is_local_user);
    assert!(users.iter().all(|u| !u.uccx), "uccx must be cleared");
}

#[tokio::test]
async fn test_uccx_kept_when_ccx_importer_coexists() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(
        &server,
        "dirgroup",
        ResponseTemplate::new(200).set_body_string(rows_body(&[login_row("alice")])),
    )
    .await;

    let mut connector = create_connector(&server);
    let users = connector.fetch_login_users("Agents", true).await.unwrap();

    assert!(users[0].uccx);
}

#[tokio::test]
async fn test_empty_result_set() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(
        &server,
        "dirgroup",
        ResponseTemplate::new(200).set_body_string(rows_body(&[])),
    )
    .await;

    let mut connector = create_connector(&server);
    let users = connector.fetch_login_users("Agents", false).await.unwrap();

    assert!(users.is_empty());
}

#[tokio::test]
async fn test_query_uses_negotiated_namespace_and_next_sequence() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(
        &server,
        "AXL/API/14.0\"><soapenv:Header/><soapenv:Body><ns:executeSQLQuery sequence=\"12\">",
        ResponseTemplate::new(200).set_body_string(rows_body(&[login_row("alice")])),
    )
    .await;

    let mut connector = create_connector(&server);
    let users = connector.fetch_login_users("Agents", false).await.unwrap();

    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn test_invalid_parameters_are_never_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut connector = create_connector(&server);
    let err = connector
        .fetch_login_users("x delete from enduser", false)
        .await
        .unwrap_err();

    assert!(matches!(err, AxlError::InvalidQuery { .. }));
}

#[tokio::test]
async fn test_unspecified_fault() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(
        &server,
        "dirgroup",
        ResponseTemplate::new(500).set_body_string(fault_body("Cannot execute query")),
    )
    .await;

    let mut connector = create_connector(&server);
    let err = connector
        .fetch_login_users("Agents", false)
        .await
        .unwrap_err();

    match err {
        AxlError::Fault { code, message } => {
            assert_eq!(code, "soapenv:Server");
            assert_eq!(message, "Cannot execute query");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unexpected_status() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(&server, "dirgroup", ResponseTemplate::new(503)).await;

    let mut connector = create_connector(&server);
    let err = connector
        .fetch_login_users("Agents", false)
        .await
        .unwrap_err();

    match err {
        AxlError::UnexpectedStatus { status, .. } => {
            assert_eq!(status, "503 Service Unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_rows_payload() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(
        &server,
        "dirgroup",
        ResponseTemplate::new(200).set_body_string(envelope(
            "executeSQLQuery",
            "<return><row><userid>a</row></return>",
        )),
    )
    .await;

    let mut connector = create_connector(&server);
    let err = connector
        .query::<LoginUser>(&SqlQuery::login_users("Agents"))
        .await
        .unwrap_err();

    assert!(matches!(err, AxlError::MalformedPayload { .. }));
}

// =============================================================================
// Paging
// =============================================================================

#[tokio::test]
async fn test_too_large_query_is_paged_in_order() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(
        &server,
        "<sql>select eu.pkid",
        ResponseTemplate::new(500).set_body_string(too_large_body(5, 2)),
    )
    .await;
    mount_sql(
        &server,
        "<sql>SELECT SKIP 0 LIMIT 2 eu.pkid",
        ResponseTemplate::new(200)
            .set_body_string(rows_body(&[device_row("a", "1", "1"), device_row("b", "2", "2")])),
    )
    .await;
    mount_sql(
        &server,
        "<sql>SELECT SKIP 2 LIMIT 2 eu.pkid",
        ResponseTemplate::new(200)
            .set_body_string(rows_body(&[device_row("c", "3", "3"), device_row("d", "4", "4")])),
    )
    .await;
    mount_sql(
        &server,
        "<sql>SELECT SKIP 4 LIMIT 2 eu.pkid",
        ResponseTemplate::new(200).set_body_string(rows_body(&[device_row("e", "5", "5")])),
    )
    .await;

    let mut connector = create_connector(&server);
    let rows = connector
        .fetch_user_device_lines(&jtapi_users(), false)
        .await
        .unwrap();

    let users: Vec<&str> = rows.iter().map(|r| r.user_id.as_str()).collect();
    assert_eq!(users, vec!["a", "b", "c", "d", "e"]);
    // version request, unpaged query, three pages
    assert_eq!(connector.session().sequence(), 15);
}

#[tokio::test]
async fn test_too_large_with_huge_counts_is_paged() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(
        &server,
        "<sql>select eu.pkid",
        ResponseTemplate::new(500).set_body_string(too_large_body(
            100_000_000_000_000_000,
            50_000_000_000_000_000,
        )),
    )
    .await;
    mount_sql(
        &server,
        "<sql>SELECT SKIP 0 LIMIT 50000000000000000 eu.pkid",
        ResponseTemplate::new(200).set_body_string(rows_body(&[device_row("a", "1", "1")])),
    )
    .await;
    mount_sql(
        &server,
        "<sql>SELECT SKIP 50000000000000000 LIMIT 50000000000000000 eu.pkid",
        ResponseTemplate::new(200).set_body_string(rows_body(&[device_row("b", "2", "2")])),
    )
    .await;

    let mut connector = create_connector(&server);
    let rows = connector
        .fetch_user_device_lines(&jtapi_users(), false)
        .await
        .unwrap();

    let users: Vec<&str> = rows.iter().map(|r| r.user_id.as_str()).collect();
    assert_eq!(users, vec!["a", "b"]);
}

#[tokio::test]
async fn test_too_many_pages_rejected_before_paging() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;

    let calls = Arc::new(AtomicU32::new(0));
    Mock::given(method("POST"))
        .and(body_string_contains("SKIP"))
        .respond_with(CountingResponder {
            body: rows_body(&[]),
            calls: calls.clone(),
        })
        .mount(&server)
        .await;
    mount_sql(
        &server,
        "<sql>select eu.pkid",
        ResponseTemplate::new(500).set_body_string(too_large_body(1_000_000, 10)),
    )
    .await;

    let mut connector = create_connector(&server);
    let err = connector
        .fetch_user_device_lines(&jtapi_users(), false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AxlError::QueryTooLarge {
            total: 1_000_000,
            fetch_max: 10
        }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_page_discards_partial_result() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(
        &server,
        "<sql>select eu.pkid",
        ResponseTemplate::new(500).set_body_string(too_large_body(6, 2)),
    )
    .await;
    mount_sql(
        &server,
        "SKIP 0 LIMIT 2",
        ResponseTemplate::new(200).set_body_string(rows_body(&[device_row("a", "1", "1")])),
    )
    .await;
    mount_sql(
        &server,
        "SKIP 2 LIMIT 2",
        ResponseTemplate::new(500).set_body_string(fault_body("Timed out")),
    )
    .await;

    let calls = Arc::new(AtomicU32::new(0));
    Mock::given(method("POST"))
        .and(body_string_contains("SKIP 4 LIMIT 2"))
        .respond_with(CountingResponder {
            body: rows_body(&[]),
            calls: calls.clone(),
        })
        .mount(&server)
        .await;

    let mut connector = create_connector(&server);
    let err = connector
        .fetch_user_device_lines(&jtapi_users(), false)
        .await
        .unwrap_err();

    match err {
        AxlError::IncompletePages {
            failed_page,
            pages,
            message,
        } => {
            assert_eq!(failed_page, 2);
            assert_eq!(pages, 3);
            assert!(message.contains("Timed out"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0, "later pages must not be fetched");
}

#[tokio::test]
async fn test_too_large_without_limits_is_a_fault() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(
        &server,
        "<sql>select eu.pkid",
        ResponseTemplate::new(500).set_body_string(fault_body("Query request too large.")),
    )
    .await;

    let mut connector = create_connector(&server);
    let err = connector
        .fetch_user_device_lines(&jtapi_users(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, AxlError::Fault { .. }));
}

// =============================================================================
// End to End
// =============================================================================

#[tokio::test]
async fn test_shared_device_rows_are_excluded() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;
    mount_sql(
        &server,
        "lower(name) in ('jtapi_rec')",
        ResponseTemplate::new(200).set_body_string(rows_body(&[
            device_row("alice", "100", "2001"),
            device_row("bob", "100", "2002"),
            device_row("carol", "200", "2003"),
        ])),
    )
    .await;

    let mut connector = create_connector(&server);
    let rows: Vec<UserDeviceLine> = connector
        .fetch_user_device_lines(&jtapi_users(), false)
        .await
        .unwrap();
    let result = reconcile(rows);

    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].user_id, "carol");
    assert_eq!(result.removed, 2);
    assert_eq!(
        result.ambiguities[0].to_string(),
        "Device [SEP100 - Phone 100] is associated with users: [alice, bob]"
    );
}
