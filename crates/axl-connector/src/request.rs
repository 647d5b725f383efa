//! SOAP envelope construction and query pagination.

use quick_xml::escape::partial_escape;

use crate::error::{AxlError, AxlResult};
use crate::session::Session;

const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const AXL_NS_PREFIX: &str = "http://www.cisco.com/AXL/API/";

/// Maximum characters of a request body written to trace logs.
const SHORT_BODY_CHARS: usize = 120;

/// Upper bound on requests issued for one paged query.
pub const MAX_PAGES: usize = 10_000;

/// AXL operations this engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Capability request returning the component version.
    GetCcmVersion,
    /// Arbitrary read-only SQL.
    ExecuteSqlQuery,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetCcmVersion => "getCCMVersion",
            Operation::ExecuteSqlQuery => "executeSQLQuery",
        }
    }
}

/// Build a `getCCMVersion` request for the session's current version.
///
/// Consumes one sequence number.
pub fn build_version_request(session: &mut Session) -> AxlResult<String> {
    envelope(session, Operation::GetCcmVersion, "")
}

/// Build an `executeSQLQuery` request carrying `sql`.
///
/// Consumes one sequence number.
pub fn build_query(session: &mut Session, sql: &str) -> AxlResult<String> {
    let inner = format!("<sql>{}</sql>", partial_escape(sql));
    envelope(session, Operation::ExecuteSqlQuery, &inner)
}

fn envelope(session: &mut Session, operation: Operation, inner: &str) -> AxlResult<String> {
    let version = session
        .version()
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AxlError::UnsupportedVersion {
            server: session.server().to_string(),
        })?;
    let sequence = session.next_sequence();
    let op = operation.as_str();

    Ok(format!(
        "<soapenv:Envelope xmlns:soapenv=\"{SOAP_ENV_NS}\" xmlns:ns=\"{AXL_NS_PREFIX}{version}\">\
         <soapenv:Header/><soapenv:Body><ns:{op} sequence=\"{sequence}\">\n{inner}</ns:{op}>\
         </soapenv:Body></soapenv:Envelope>"
    ))
}

/// Split `sql` into `SKIP/LIMIT` pages covering `total_rows`.
///
/// When one call can return everything the unpaged query is the only page.
/// Otherwise page `i` selects rows `i * page_size .. (i + 1) * page_size`,
/// in ascending order.
pub fn plan_pages(sql: &str, page_size: usize, total_rows: usize) -> AxlResult<Vec<String>> {
    if page_size == 0 {
        return Err(AxlError::invalid_query("page size must be greater than zero"));
    }
    if page_size >= total_rows {
        return Ok(vec![sql.to_string()]);
    }

    let projection = strip_select(sql)
        .ok_or_else(|| AxlError::invalid_query("only SELECT statements can be paged"))?;
    let pages = total_rows.div_ceil(page_size);
    if pages > MAX_PAGES {
        return Err(AxlError::QueryTooLarge {
            total: total_rows,
            fetch_max: page_size,
        });
    }

    Ok((0..pages)
        .map(|i| format!("SELECT SKIP {} LIMIT {page_size} {projection}", i * page_size))
        .collect())
}

/// Text after the leading `select` keyword, if the statement starts with one.
fn strip_select(sql: &str) -> Option<&str> {
    let trimmed = sql.trim_start();
    let keyword = trimmed.get(..6)?;
    if !keyword.eq_ignore_ascii_case("select") {
        return None;
    }
    let rest = &trimmed[6..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim_start())
}

/// Request body shortened for trace logs: the envelope line is dropped and
/// the remainder truncated.
pub fn short_body(body: &str) -> String {
    let body = body.split_once('\n').map_or(body, |(_, rest)| rest);
    if body.chars().count() < SHORT_BODY_CHARS {
        return body.to_string();
    }
    let head: String = body.chars().take(SHORT_BODY_CHARS - 2).collect();
    format!("{head} ...")
}
