//! Typed rows decoded from `executeSQLQuery` results.
//!
//! Serialized field names are the column aliases of the SQL templates; the
//! persistence layer relies on them when it unpacks the JSON batch.

use serde::{Deserialize, Serialize};

use crate::error::{AxlError, AxlResult};
use crate::xml::{self, Element};

/// One `<row>` of a result set.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    element: &'a Element,
}

impl<'a> Row<'a> {
    /// Column text, empty when the column is absent or null.
    pub fn text(&self, column: &str) -> &'a str {
        self.element.child_text(column)
    }

    pub fn string(&self, column: &str) -> String {
        self.text(column).to_string()
    }

    /// Informix booleans come back as `t`/`f`.
    pub fn flag(&self, column: &str) -> bool {
        matches!(
            self.text(column).trim().to_ascii_lowercase().as_str(),
            "t" | "true" | "1"
        )
    }

    /// Integer column; absent or unparsable values read as zero.
    pub fn int(&self, column: &str) -> i32 {
        self.text(column).trim().parse().unwrap_or(0)
    }
}

/// A row type that can be built from a result-set row.
pub trait AxlRow: Sized {
    fn from_row(row: &Row<'_>) -> Self;

    /// Drop the contact-center flag.
    fn clear_uccx(&mut self);
}

/// Decode every `<row>` of a `<return>` payload.
///
/// An empty payload or `<return/>` is an empty result set.
pub fn decode_rows<T: AxlRow>(payload: &str) -> AxlResult<Vec<T>> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    let root = xml::parse(payload).map_err(AxlError::malformed_payload)?;
    if root.name != "return" {
        return Err(AxlError::malformed_payload(format!(
            "expected return element, found <{}>",
            root.name
        )));
    }
    Ok(root
        .children
        .iter()
        .filter(|c| c.name == "row")
        .map(|element| T::from_row(&Row { element }))
        .collect())
}

/// Unless the CCX importer runs alongside, the `uccx` flag is cleared so
/// the destination never treats users as contact-center agents.
pub fn apply_ccx_policy<T: AxlRow>(rows: &mut [T], coexist_ccx_importer: bool) {
    if coexist_ccx_importer {
        return;
    }
    rows.iter_mut().for_each(T::clear_uccx);
}

/// User joined with one of their devices and one line on that device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeviceLine {
    pub user_pkid: String,
    pub device_pkid: String,
    pub line_pkid: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "middlename")]
    pub middle_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    #[serde(rename = "userid")]
    pub user_id: String,
    pub department: String,
    pub status: i32,
    #[serde(rename = "islocaluser")]
    pub is_local_user: bool,
    pub uccx: bool,
    #[serde(rename = "directoryuri")]
    pub directory_uri: String,
    #[serde(rename = "mailid")]
    pub mail_id: String,
    #[serde(rename = "devicename")]
    pub device_name: String,
    #[serde(rename = "devicedescrition")]
    pub device_description: String,
    #[serde(rename = "dnorpattern")]
    pub line_number: String,
    #[serde(rename = "alertingnameascii")]
    pub line_alerting_name: String,
    pub line_description: String,
    pub cluster_name: String,
}

impl AxlRow for UserDeviceLine {
    fn from_row(row: &Row<'_>) -> Self {
        Self {
            user_pkid: row.string("user_pkid"),
            device_pkid: row.string("device_pkid"),
            line_pkid: row.string("line_pkid"),
            first_name: row.string("firstname"),
            middle_name: row.string("middlename"),
            last_name: row.string("lastname"),
            user_id: row.string("userid"),
            department: row.string("department"),
            status: row.int("status"),
            is_local_user: row.flag("islocaluser"),
            uccx: row.flag("uccx"),
            directory_uri: row.string("directoryuri"),
            mail_id: row.string("mailid"),
            device_name: row.string("devicename"),
            device_description: row.string("devicedescrition"),
            line_number: row.string("dnorpattern"),
            line_alerting_name: row.string("alertingnameascii"),
            line_description: row.string("line_description"),
            cluster_name: row.string("cluster_name"),
        }
    }

    fn clear_uccx(&mut self) {
        self.uccx = false;
    }
}

/// Member of the access control group allowed to log in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginUser {
    pub user_pkid: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "middlename")]
    pub middle_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    #[serde(rename = "userid")]
    pub user_id: String,
    pub department: String,
    pub status: i32,
    #[serde(rename = "islocaluser")]
    pub is_local_user: bool,
    pub uccx: bool,
    #[serde(rename = "directoryuri")]
    pub directory_uri: String,
    #[serde(rename = "mailid")]
    pub mail_id: String,
    pub cluster_name: String,
}

impl AxlRow for LoginUser {
    fn from_row(row: &Row<'_>) -> Self {
        Self {
            user_pkid: row.string("user_pkid"),
            first_name: row.string("firstname"),
            middle_name: row.string("middlename"),
            last_name: row.string("lastname"),
            user_id: row.string("userid"),
            department: row.string("department"),
            status: row.int("status"),
            is_local_user: row.flag("islocaluser"),
            uccx: row.flag("uccx"),
            directory_uri: row.string("directoryuri"),
            mail_id: row.string("mailid"),
            cluster_name: row.string("cluster_name"),
        }
    }

    fn clear_uccx(&mut self) {
        self.uccx = false;
    }
}
