//! Version negotiation tests against a mock AXL server.

mod common;

use common::*;
use wiremock::matchers::{basic_auth, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use axl_connector::{AxlConfig, AxlConnector, AxlError, DbVersion, Negotiation, NegotiationState};

// =============================================================================
// Candidate Selection
// =============================================================================

#[tokio::test]
async fn test_negotiation_stops_at_first_accepted_candidate() {
    let server = MockServer::start().await;
    mount_version_check(&server, "10.0", 599, String::new()).await;
    mount_version_check(&server, "12.0", 599, String::new()).await;
    mount_version_check(&server, "14.0", 200, version_body("14.0.1.10000(1)")).await;

    Mock::given(method("POST"))
        .and(body_string_contains("AXL/API/16.0\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(version_body("16.0.1")))
        .expect(0)
        .named("16.0 must not be tried")
        .mount(&server)
        .await;

    let mut connector = create_connector(&server);
    let negotiation = connector.negotiate().await.unwrap();

    assert_eq!(
        negotiation,
        Negotiation::Supported {
            schema_version: "14.0".to_string(),
            component_version: "14.0.1.10000(1)".to_string(),
        }
    );
    assert_eq!(
        connector.session().version(),
        &DbVersion::Negotiated("14.0".to_string())
    );
    assert_eq!(connector.session().state(), NegotiationState::Authenticated);
    assert!(connector.session().is_authenticated());
    // three version requests: 11, 12, 13
    assert_eq!(connector.session().sequence(), 13);
}

#[tokio::test]
async fn test_reported_version_is_normalized_to_major_minor() {
    let server = MockServer::start().await;
    mount_version_check(&server, "10.0", 200, version_body("11.5.1.14900(11)")).await;

    let mut connector = create_connector(&server);
    let version = connector.ensure_negotiated().await.unwrap();

    assert_eq!(version, "11.5");
}

#[tokio::test]
async fn test_undecodable_version_moves_to_next_candidate() {
    let server = MockServer::start().await;
    mount_version_check(&server, "10.0", 200, envelope("getCCMVersion", "<return/>")).await;
    mount_version_check(&server, "12.0", 200, version_body("12.5.1.11900(146)")).await;

    let mut connector = create_connector(&server);
    let version = connector.ensure_negotiated().await.unwrap();

    assert_eq!(version, "12.5");
}

#[tokio::test]
async fn test_exhausted_candidates_are_unsupported_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AXL_PATH))
        .respond_with(ResponseTemplate::new(599))
        .expect(4)
        .mount(&server)
        .await;

    let mut connector = create_connector(&server);
    let negotiation = connector.negotiate().await.unwrap();

    assert_eq!(negotiation, Negotiation::Unsupported);
    assert_eq!(connector.session().version(), &DbVersion::Unsupported);
    assert_eq!(connector.session().state(), NegotiationState::Failed);

    let err = connector.ensure_negotiated().await.unwrap_err();
    assert!(matches!(err, AxlError::UnsupportedVersion { .. }));
}

#[tokio::test]
async fn test_server_fault_on_version_request_moves_to_next_candidate() {
    let server = MockServer::start().await;
    mount_version_check(&server, "10.0", 500, fault_body("Unknown schema")).await;
    mount_version_check(&server, "12.0", 200, version_body("12.0.1")).await;

    let mut connector = create_connector(&server);
    assert_eq!(connector.ensure_negotiated().await.unwrap(), "12.0");
}

// =============================================================================
// Fatal Failures
// =============================================================================

#[tokio::test]
async fn test_auth_failure_aborts_negotiation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AXL_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("<html>denied</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut connector = create_connector(&server);
    let err = connector.negotiate().await.unwrap_err();

    assert!(matches!(err, AxlError::AuthenticationFailed { .. }));
    assert!(err.is_fatal_for_run());
    assert!(!connector.session().is_authenticated());
    assert_eq!(connector.session().state(), NegotiationState::Failed);
}

#[tokio::test]
async fn test_is_login_valid_reports_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut connector = create_connector(&server);
    assert!(!connector.is_login_valid().await.unwrap());
}

#[tokio::test]
async fn test_is_login_valid_after_negotiation() {
    let server = MockServer::start().await;
    mount_supported_version(&server).await;

    let mut connector = create_connector(&server);
    assert!(connector.is_login_valid().await.unwrap());
}

#[tokio::test]
async fn test_transport_failure_aborts_negotiation() {
    // Nothing listens on the discard port.
    let config = AxlConfig::new("cucm.test", USER, PASSWORD)
        .with_endpoint("http://127.0.0.1:9/axl/")
        .with_timeout_secs(2);
    let mut connector = AxlConnector::new(config).unwrap();

    let err = connector.negotiate().await.unwrap_err();

    assert!(matches!(err, AxlError::Transport { .. }));
    // the client error stays in the chain
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(connector.session().version(), &DbVersion::Unsupported);
    // only the first candidate was tried
    assert_eq!(connector.session().sequence(), 11);
}

// =============================================================================
// Request Shape
// =============================================================================

#[tokio::test]
async fn test_version_request_carries_headers_and_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AXL_PATH))
        .and(header("content-type", "text/xml"))
        .and(header("cache-control", "no-cache"))
        .and(header("pragma", "no-cache"))
        .and(basic_auth(USER, PASSWORD))
        .and(body_string_contains("<ns:getCCMVersion sequence=\"11\">"))
        .respond_with(ResponseTemplate::new(200).set_body_string(version_body("14.0.1")))
        .expect(1)
        .mount(&server)
        .await;

    let mut connector = create_connector(&server);
    connector.negotiate().await.unwrap();
}

#[tokio::test]
async fn test_negotiation_runs_once_per_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("getCCMVersion"))
        .respond_with(ResponseTemplate::new(200).set_body_string(version_body("14.0.1")))
        .expect(1)
        .mount(&server)
        .await;

    let mut connector = create_connector(&server);
    connector.ensure_negotiated().await.unwrap();
    connector.ensure_negotiated().await.unwrap();
}
