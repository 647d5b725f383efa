//! Classification of raw AXL replies into typed outcomes.
//!
//! Envelopes are never parsed as a whole. The success or fault section is
//! cut out by delimiter scan, and only that fragment is handed to a parser.

use crate::fault::{FaultDetail, QueryLimits};

const RETURN_START: &str = "<return>";
const RETURN_END: &str = "</return>";
const RETURN_SHORT: &str = "<return/>";

const FAULT_START: &str = "<soapenv:Fault>";
const FAULT_END: &str = "</soapenv:Fault>";
const FAULT_SHORT: &str = "<soapenv:Fault/>";

/// Status CUCM uses for an unknown schema version or request format.
pub const STATUS_BAD_VERSION: u16 = 599;

/// HTTP reply after the body has been read.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    /// Status line text, e.g. `500 Internal Server Error`.
    pub status_text: String,
    pub body: String,
}

/// Failure before any HTTP status was received.
#[derive(Debug, Clone)]
pub struct TransportFailure {
    pub message: String,
}

/// Server-reported fault, split by whether pagination can recover it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationFault {
    /// Result exceeds the per-call row limit.
    QueryTooLarge {
        limits: QueryLimits,
        detail: FaultDetail,
    },
    /// Any other fault, including ones whose body could not be decoded.
    Unspecified {
        detail: Option<FaultDetail>,
        message: String,
    },
}

impl ApplicationFault {
    pub fn message(&self) -> &str {
        match self {
            ApplicationFault::QueryTooLarge { detail, .. } => &detail.message,
            ApplicationFault::Unspecified { message, .. } => message,
        }
    }
}

/// Result of one AXL request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `<return>` section of a 200 reply, possibly empty.
    Success(String),
    AuthFailure,
    VersionMismatch,
    Fault(ApplicationFault),
    /// Network failure or a status outside the AXL contract.
    TransportError(String),
}

/// Map a reply to its outcome.
///
/// Priority: transport failure, 401, 599, 200, 500, anything else.
pub fn classify(reply: Result<HttpReply, TransportFailure>) -> Outcome {
    let reply = match reply {
        Ok(reply) => reply,
        Err(failure) => return Outcome::TransportError(failure.message),
    };

    match reply.status {
        401 => Outcome::AuthFailure,
        STATUS_BAD_VERSION => Outcome::VersionMismatch,
        200 => Outcome::Success(success_payload(&reply.body).to_string()),
        500 => Outcome::Fault(decode_fault(fault_section(&reply.body))),
        _ => Outcome::TransportError(reply.status_text),
    }
}

fn decode_fault(section: &str) -> ApplicationFault {
    let detail = match FaultDetail::decode(section) {
        Ok(detail) => detail,
        Err(e) => {
            return ApplicationFault::Unspecified {
                detail: None,
                message: e.to_string(),
            }
        }
    };

    if detail.is_query_too_large() {
        match detail.query_limits() {
            Ok(limits) => return ApplicationFault::QueryTooLarge { limits, detail },
            Err(e) => {
                return ApplicationFault::Unspecified {
                    message: e.to_string(),
                    detail: Some(detail),
                }
            }
        }
    }

    ApplicationFault::Unspecified {
        message: detail.summary().to_string(),
        detail: Some(detail),
    }
}

/// `<return>...</return>` section of a success body.
pub fn success_payload(body: &str) -> &str {
    extract_between(body, RETURN_START, RETURN_END, RETURN_SHORT)
}

/// `<soapenv:Fault>...</soapenv:Fault>` section of a fault body.
pub fn fault_section(body: &str) -> &str {
    extract_between(body, FAULT_START, FAULT_END, FAULT_SHORT)
}

/// Slice from the first `start` through the first `end` after it.
///
/// Falls back to `short` when only the self-closing form is present and to
/// an empty slice when no marker is found or `end` never follows `start`.
pub fn extract_between<'a>(body: &'a str, start: &str, end: &str, short: &'a str) -> &'a str {
    if let Some(from) = body.find(start) {
        let tail = &body[from..];
        return match tail.find(end) {
            Some(to) => &tail[..to + end.len()],
            None => "",
        };
    }
    if body.contains(short) {
        return short;
    }
    ""
}
