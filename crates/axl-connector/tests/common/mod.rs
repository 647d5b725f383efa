//! Mock AXL server fixtures shared by the integration tests.

#![allow(dead_code)]

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use axl_connector::{AxlConfig, AxlConnector};

pub const AXL_PATH: &str = "/axl/";
pub const USER: &str = "axl-user";
pub const PASSWORD: &str = "axl-secret";

pub fn create_config(server: &MockServer) -> AxlConfig {
    AxlConfig::new("cucm.test", USER, PASSWORD)
        .with_endpoint(format!("{}{}", server.uri(), AXL_PATH))
        .with_timeout_secs(5)
}

pub fn create_connector(server: &MockServer) -> AxlConnector {
    AxlConnector::new(create_config(server)).unwrap()
}

/// Wrap a response element into a SOAP envelope.
pub fn envelope(operation: &str, inner: &str) -> String {
    format!(
        "<?xml version='1.0' encoding='UTF-8'?>\
         <soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soapenv:Body><ns:{operation}Response xmlns:ns=\"http://www.cisco.com/AXL/API/14.0\">\
         {inner}</ns:{operation}Response></soapenv:Body></soapenv:Envelope>"
    )
}

pub fn version_body(version: &str) -> String {
    envelope(
        "getCCMVersion",
        &format!("<return><componentVersion><version>{version}</version></componentVersion></return>"),
    )
}

pub fn rows_body(rows: &[String]) -> String {
    if rows.is_empty() {
        return envelope("executeSQLQuery", "<return/>");
    }
    envelope(
        "executeSQLQuery",
        &format!("<return>{}</return>", rows.concat()),
    )
}

pub fn fault_body(fault_string: &str) -> String {
    format!(
        "<?xml version='1.0' encoding='UTF-8'?>\
         <soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soapenv:Body><soapenv:Fault><faultcode>soapenv:Server</faultcode>\
         <faultstring>{fault_string}</faultstring><detail><axlError><axlcode>-1</axlcode>\
         <axlmessage>{fault_string}</axlmessage><request>executeSQLQuery</request>\
         </axlError></detail></soapenv:Fault></soapenv:Body></soapenv:Envelope>"
    )
}

pub fn too_large_body(total: usize, fetch_max: usize) -> String {
    fault_body(&format!(
        "Query request too large. Total rows matched: {total} rows. \
         Suggestive Row Fetch: less than {fetch_max} rows"
    ))
}

/// One `<row>` of the user/device/line query.
pub fn device_row(user: &str, device: &str, line: &str) -> String {
    format!(
        "<row><user_pkid>u-{user}</user_pkid><device_pkid>d-{device}</device_pkid>\
         <line_pkid>l-{line}</line_pkid><firstname>{user}</firstname><middlename/>\
         <lastname>Tester</lastname><userid>{user}</userid><department>QA</department>\
         <status>1</status><islocaluser>t</islocaluser><uccx>t</uccx><directoryuri/>\
         <mailid>{user}@example.com</mailid><devicename>SEP{device}</devicename>\
         <devicedescrition>Phone {device}</devicedescrition><dnorpattern>{line}</dnorpattern>\
         <alertingnameascii>{user}</alertingnameascii>\
         <cluster_name>StandAloneCluster</cluster_name><line_description/></row>"
    )
}

/// One `<row>` of the login-user query.
pub fn login_row(user: &str) -> String {
    format!(
        "<row><user_pkid>u-{user}</user_pkid><firstname>{user}</firstname><middlename/>\
         <lastname>Tester</lastname><userid>{user}</userid><department>QA</department>\
         <status>1</status><islocaluser>f</islocaluser><uccx>t</uccx><directoryuri/>\
         <mailid>{user}@example.com</mailid><cluster_name>StandAloneCluster</cluster_name></row>"
    )
}

/// Answer the version request for `candidate` with `status` and `body`.
pub async fn mount_version_check(server: &MockServer, candidate: &str, status: u16, body: String) {
    Mock::given(method("POST"))
        .and(path(AXL_PATH))
        .and(body_string_contains("getCCMVersion"))
        .and(body_string_contains(format!("AXL/API/{candidate}\"")))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Accept the 14.0 schema on the first version request.
pub async fn mount_supported_version(server: &MockServer) {
    mount_version_check(server, "10.0", 200, version_body("14.0.1.10000(1)")).await;
}
