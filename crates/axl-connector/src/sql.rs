//! SQL templates sent through `executeSQLQuery`.
//!
//! Parameters are substituted textually into positional tokens. Values are
//! sanitized on the way in and a query whose parameters look like a nested
//! statement never renders.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Positional placeholders, in substitution order.
const TOKENS: [&str; 3] = ["TOKEN_01", "TOKEN_02", "TOKEN_03"];

/// Characters replaced by a space in every parameter.
const STRIPPED_CHARS: [char; 4] = ['%', '*', '?', ';'];

static NESTED_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)[\s;]+(insert|update|select|delete)[\s;]+")
        .expect("Invalid nested statement regex")
});

const USER_DEVICE_LINE_SQL: &str = r"select eu.pkid as user_pkid,
       d.pkid as device_pkid,
       np.pkid as line_pkid,
       eu.firstname,
       eu.middlename,
       eu.lastname,
       eu.userid,
       eu.department,
       eu.status,
       eu.islocaluser,
       eunp.uccx,
       eu.directoryuri,
       eu.mailid,
       d.name as devicename,
       d.description as devicedescrition,
       np.dnorpattern,
       np.alertingnameascii,
       (select paramvalue from processconfig where paramname = 'ClusterID') as cluster_name,
       np.description as line_description
from enduser eu
         LEFT OUTER JOIN (SELECT fkenduser, max(CASE tkdnusage WHEN 2 THEN tkdnusage ELSE null END) is not null AS uccx
                          FROM endusernumplanmap
                          GROUP BY fkenduser
) AS eunp ON eunp.fkenduser = eu.pkid
         INNER JOIN enduserdevicemap eudm ON eudm.fkenduser = eu.pkid
         INNER JOIN device d ON d.pkid = eudm.fkdevice
         INNER JOIN devicenumplanmap dnpm ON d.pkid = dnpm.fkdevice
         INNER JOIN numplan np ON np.pkid = dnpm.fknumplan
WHERE d.pkid IN (
    select fkdevice
    from applicationuserdevicemap
    where fkapplicationuser in (select au.pkid from applicationuser au where lower(name) in (TOKEN_01))
    union
    select fkdevice
    from enduserdevicemap
    where fkenduser in (select au.pkid from enduser au where lower(userid) in (TOKEN_01))
)
ORDER BY eu.pkid, d.pkid, np.pkid";

const LOGIN_USERS_SQL: &str = r"select enduser.pkid as user_pkid,
       enduser.firstname,
       enduser.middlename,
       enduser.lastname,
       enduser.userid,
       enduser.department,
       enduser.status,
       enduser.islocaluser,
       eunp.uccx,
       enduser.directoryuri,
       enduser.mailid,
       (select paramvalue from processconfig where paramname = 'ClusterID') as cluster_name
from enduser
         LEFT OUTER JOIN (SELECT fkenduser, max(CASE tkdnusage WHEN 2 THEN tkdnusage ELSE null END) is not null AS uccx
                          FROM endusernumplanmap
                          GROUP BY fkenduser
) AS eunp ON eunp.fkenduser = enduser.pkid
where enduser.pkid in (
    select e.fkenduser
    from enduserdirgroupmap as e
             inner join dirgroup as dg on e.fkdirgroup = dg.pkid
    where dg.name = 'TOKEN_01')";

/// Known query templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTemplate {
    /// Users with their devices and lines, for devices monitored by the
    /// given application (JTAPI) users.
    UserDeviceLine,
    /// Members of an access control group.
    LoginUsers,
}

impl QueryTemplate {
    pub fn sql(&self) -> &'static str {
        match self {
            QueryTemplate::UserDeviceLine => USER_DEVICE_LINE_SQL,
            QueryTemplate::LoginUsers => LOGIN_USERS_SQL,
        }
    }

    /// Number of parameters the template needs to render.
    pub fn required_parameters(&self) -> usize {
        match self {
            QueryTemplate::UserDeviceLine | QueryTemplate::LoginUsers => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryTemplate::UserDeviceLine => "user_device_line",
            QueryTemplate::LoginUsers => "login_users",
        }
    }
}

/// A template plus its sanitized parameters.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    template: QueryTemplate,
    parameters: Vec<String>,
}

impl SqlQuery {
    pub fn new(template: QueryTemplate) -> Self {
        trace!(
            template = template.name(),
            parameters = template.required_parameters(),
            "Prepare SQL request"
        );
        Self {
            template,
            parameters: Vec::new(),
        }
    }

    /// Query for the devices and lines of the given application users.
    ///
    /// Names are matched case-insensitively against lower-cased columns, so
    /// they are quoted, joined and lower-cased into one list parameter.
    pub fn user_device_line<S: AsRef<str>>(jtapi_users: &[S]) -> Self {
        let list = jtapi_users
            .iter()
            .map(|u| format!("'{}'", u.as_ref().to_lowercase()))
            .collect::<Vec<_>>()
            .join(",");
        let mut query = Self::new(QueryTemplate::UserDeviceLine);
        query.add_parameter(&list);
        query
    }

    /// Query for members of the access control group.
    pub fn login_users(access_group: &str) -> Self {
        let mut query = Self::new(QueryTemplate::LoginUsers);
        query.add_parameter(access_group);
        query
    }

    pub fn template(&self) -> QueryTemplate {
        self.template
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Sanitize and store a parameter. Returns the number stored so far.
    ///
    /// A value that is empty after sanitizing is dropped.
    pub fn add_parameter(&mut self, value: &str) -> usize {
        let value = sanitize(value);
        if !value.is_empty() {
            self.parameters.push(value);
        }
        self.parameters.len()
    }

    /// No parameter looks like an embedded statement.
    pub fn is_valid(&self) -> bool {
        self.parameters.iter().all(|p| !NESTED_STATEMENT.is_match(p))
    }

    /// Rendered SQL, or an empty string when the query must not be sent.
    pub fn render(&self) -> String {
        if self.parameters.len() < self.template.required_parameters() || !self.is_valid() {
            return String::new();
        }
        TOKENS
            .iter()
            .zip(&self.parameters)
            .fold(self.template.sql().to_string(), |sql, (token, value)| {
                sql.replace(token, value)
            })
    }
}

/// Replace each of `% * ? ;` with a space.
pub fn sanitize(value: &str) -> String {
    value.replace(STRIPPED_CHARS, " ")
}
