//! AXL connector
//!
//! Drives one [`Session`] over HTTP: version negotiation, single SQL
//! requests, and automatic paging when the server reports a result set as
//! too large. All requests of a connector are issued one after another.

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::AxlConfig;
use crate::error::{AxlError, AxlResult};
use crate::request::{build_query, build_version_request, plan_pages, short_body, Operation};
use crate::response::{classify, ApplicationFault, HttpReply, Outcome, TransportFailure};
use crate::rows::{apply_ccx_policy, decode_rows, AxlRow, LoginUser, UserDeviceLine};
use crate::session::{DbVersion, Session};
use crate::sql::SqlQuery;
use crate::version::{ComponentVersion, SUPPORTED_VERSIONS};

/// Result of version negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// The server accepted a candidate and reported this version.
    Supported {
        /// `major.minor` used in the request namespace from now on.
        schema_version: String,
        /// Full version string, e.g. `14.0.1.10000(1)`.
        component_version: String,
    },
    /// Every candidate was rejected.
    Unsupported,
}

/// Outcome of one request plus the HTTP status when one was received.
struct Exchange {
    status: Option<StatusCode>,
    outcome: Outcome,
    /// Client error behind a transport failure.
    failure: Option<reqwest::Error>,
}

/// Connector for the CUCM AXL SOAP API.
pub struct AxlConnector {
    config: AxlConfig,
    client: Client,
    session: Session,
}

impl std::fmt::Debug for AxlConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxlConnector")
            .field("config", &self.config.redacted())
            .field("session", &self.session)
            .finish()
    }
}

impl AxlConnector {
    /// Create a connector with a fresh session.
    pub fn new(config: AxlConfig) -> AxlResult<Self> {
        config.validate()?;
        let client = Self::build_client(&config)?;
        let session = Session::from_config(&config);

        debug!(
            session_id = %session.id(),
            server = %config.server,
            url = %config.url(),
            "Created AXL connector"
        );

        Ok(Self {
            config,
            client,
            session,
        })
    }

    fn build_client(config: &AxlConfig) -> AxlResult<Client> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if !config.verify_certificate {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(|e| {
            AxlError::invalid_configuration(format!("Failed to build HTTP client: {e}"))
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &AxlConfig {
        &self.config
    }

    /// Post one envelope and classify the reply.
    ///
    /// The response body is read exactly once; the response is consumed on
    /// every path.
    async fn send(&mut self, operation: Operation, body: String) -> Exchange {
        trace!(
            session_id = %self.session.id(),
            server = %self.session.server(),
            operation = operation.as_str(),
            sequence = self.session.sequence(),
            body = %short_body(&body),
            "Sending AXL request"
        );

        let result = self
            .client
            .post(self.config.url())
            .basic_auth(self.session.user(), Some(self.session.password()))
            .header(header::CONTENT_TYPE, "text/xml")
            .header(header::ACCEPT, "*/*")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .header(header::USER_AGENT, &self.config.user_agent)
            .body(body)
            .send()
            .await;

        let mut failure = None;
        let (status, reply) = match result {
            Ok(response) => {
                let status = response.status();
                let reply = match response.text().await {
                    Ok(body) => Ok(HttpReply {
                        status: status.as_u16(),
                        status_text: status_line(status),
                        body,
                    }),
                    Err(e) => {
                        let message = format!("failed to read response body: {e}");
                        failure = Some(e);
                        Err(TransportFailure { message })
                    }
                };
                (Some(status), reply)
            }
            Err(e) => {
                error!(
                    session_id = %self.session.id(),
                    server = %self.session.server(),
                    operation = operation.as_str(),
                    error = %e,
                    "AXL request failed"
                );
                let message = e.to_string();
                failure = Some(e);
                (None, Err(TransportFailure { message }))
            }
        };

        // A body that could not be read counts as a transport failure.
        let status = status.filter(|_| reply.is_ok());
        let outcome = classify(reply);

        debug!(
            session_id = %self.session.id(),
            server = %self.session.server(),
            operation = operation.as_str(),
            status = status.map(|s| s.as_u16()),
            "Received AXL response"
        );

        Exchange {
            status,
            outcome,
            failure,
        }
    }

    /// Try candidate schema versions in order until one is accepted.
    ///
    /// Transport and authentication failures end negotiation with an error.
    /// Exhausting the candidates is not an error; the session is left
    /// `Unsupported` and [`Negotiation::Unsupported`] is returned.
    #[instrument(skip(self), fields(session_id = %self.session.id(), server = %self.session.server()))]
    pub async fn negotiate(&mut self) -> AxlResult<Negotiation> {
        for (index, candidate) in SUPPORTED_VERSIONS.iter().enumerate() {
            self.session.begin_candidate(index, candidate);
            debug!(candidate = %candidate, "Testing AXL schema version");

            let body = build_version_request(&mut self.session)?;
            let exchange = self.send(Operation::GetCcmVersion, body).await;

            match exchange.outcome {
                Outcome::Success(payload) => match decode_version(&payload) {
                    Ok((component, schema)) => {
                        info!(
                            component_version = %component.raw,
                            schema_version = %schema,
                            "AXL schema version negotiated"
                        );
                        self.session.adopt_version(schema.clone());
                        return Ok(Negotiation::Supported {
                            schema_version: schema,
                            component_version: component.raw,
                        });
                    }
                    Err(e) => {
                        warn!(candidate = %candidate, error = %e, "Problem decoding version response");
                    }
                },
                Outcome::AuthFailure => {
                    self.session.reject_credentials();
                    error!(user = %self.session.user(), "AXL authorization rejected");
                    return Err(AxlError::AuthenticationFailed {
                        server: self.session.server().to_string(),
                        user: self.session.user().to_string(),
                    });
                }
                Outcome::TransportError(message) if exchange.status.is_none() => {
                    self.session.mark_unsupported();
                    return Err(transport_error(
                        self.session.server(),
                        message,
                        exchange.failure,
                    ));
                }
                Outcome::VersionMismatch => {
                    debug!(candidate = %candidate, "Schema version rejected");
                }
                Outcome::Fault(fault) => {
                    warn!(candidate = %candidate, fault = %fault.message(), "Version request returned a fault");
                }
                Outcome::TransportError(status) => {
                    warn!(candidate = %candidate, status = %status, "Unexpected status for version request");
                }
            }
        }

        self.session.mark_unsupported();
        error!("No supported AXL schema version");
        Ok(Negotiation::Unsupported)
    }

    /// Negotiate once per session and return the schema version in use.
    pub async fn ensure_negotiated(&mut self) -> AxlResult<String> {
        match self.session.version() {
            DbVersion::Negotiated(version) => return Ok(version.clone()),
            DbVersion::Unsupported => {
                return Err(AxlError::UnsupportedVersion {
                    server: self.session.server().to_string(),
                })
            }
            DbVersion::Unknown | DbVersion::Candidate(_) => {}
        }

        match self.negotiate().await? {
            Negotiation::Supported { schema_version, .. } => Ok(schema_version),
            Negotiation::Unsupported => Err(AxlError::UnsupportedVersion {
                server: self.session.server().to_string(),
            }),
        }
    }

    /// Whether the configured credentials are accepted.
    pub async fn is_login_valid(&mut self) -> AxlResult<bool> {
        match self.ensure_negotiated().await {
            Ok(_) => {
                info!(
                    session_id = %self.session.id(),
                    user = %self.session.user(),
                    "Login to AXL server is valid"
                );
                Ok(self.session.is_authenticated())
            }
            Err(AxlError::AuthenticationFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Send one `executeSQLQuery` and return its `<return>` payload.
    pub async fn execute_sql(&mut self, sql: &str) -> AxlResult<String> {
        self.ensure_negotiated().await?;
        let body = build_query(&mut self.session, sql)?;
        let exchange = self.send(Operation::ExecuteSqlQuery, body).await;

        match exchange.outcome {
            Outcome::Success(payload) => Ok(payload),
            other => Err(self.outcome_error(other, exchange.status, exchange.failure)),
        }
    }

    /// Run a templated query, paging through the result when the server
    /// reports it as too large.
    ///
    /// A failing page aborts the whole query with
    /// [`AxlError::IncompletePages`]; rows from earlier pages are discarded.
    #[instrument(
        skip(self, query),
        fields(session_id = %self.session.id(), template = query.template().name())
    )]
    pub async fn query<T: AxlRow>(&mut self, query: &SqlQuery) -> AxlResult<Vec<T>> {
        let sql = query.render();
        if sql.is_empty() {
            error!("Not valid request parameters");
            return Err(AxlError::invalid_query(format!(
                "{} query has missing or invalid parameters",
                query.template().name()
            )));
        }
        debug!(sql = %sql, "Running AXL query");

        match self.execute_sql(&sql).await {
            Ok(payload) => decode_rows(&payload),
            Err(AxlError::QueryTooLarge { total, fetch_max }) => {
                self.query_pages(&sql, total, fetch_max).await
            }
            Err(e) => {
                error!(error = %e, error_code = e.error_code(), "AXL query failed");
                Err(e)
            }
        }
    }

    async fn query_pages<T: AxlRow>(
        &mut self,
        sql: &str,
        total: usize,
        fetch_max: usize,
    ) -> AxlResult<Vec<T>> {
        let pages = plan_pages(sql, fetch_max, total)?;
        let count = pages.len();
        info!(
            total_rows = total,
            fetch_max = fetch_max,
            pages = count,
            "Query too large, fetching in pages"
        );

        let mut rows = Vec::new();
        for (index, page) in pages.iter().enumerate() {
            let page_no = index + 1;
            let result = match self.execute_sql(page).await {
                Ok(payload) => decode_rows::<T>(&payload),
                Err(e) => Err(e),
            };

            match result {
                Ok(mut page_rows) => {
                    debug!(page = page_no, pages = count, rows = page_rows.len(), "Page fetched");
                    rows.append(&mut page_rows);
                }
                Err(e) => {
                    error!(
                        page = page_no,
                        pages = count,
                        error = %e,
                        error_code = e.error_code(),
                        "Page failed, result set is incomplete"
                    );
                    return Err(AxlError::IncompletePages {
                        failed_page: page_no,
                        pages: count,
                        message: e.to_string(),
                    });
                }
            }
        }

        if rows.len() < total {
            warn!(
                expected = total,
                received = rows.len(),
                "Paged query returned fewer rows than announced"
            );
        }
        Ok(rows)
    }

    /// Users, devices and lines monitored by the given application users.
    pub async fn fetch_user_device_lines(
        &mut self,
        jtapi_users: &[String],
        coexist_ccx_importer: bool,
    ) -> AxlResult<Vec<UserDeviceLine>> {
        let query = SqlQuery::user_device_line(jtapi_users);
        let mut rows: Vec<UserDeviceLine> = self.query(&query).await?;
        apply_ccx_policy(&mut rows, coexist_ccx_importer);
        debug!(
            rows = rows.len(),
            jtapi_users = %jtapi_users.join(","),
            "Read user/device/line combinations"
        );
        Ok(rows)
    }

    /// Members of the access control group.
    pub async fn fetch_login_users(
        &mut self,
        access_group: &str,
        coexist_ccx_importer: bool,
    ) -> AxlResult<Vec<LoginUser>> {
        let query = SqlQuery::login_users(access_group);
        let mut rows: Vec<LoginUser> = self.query(&query).await?;
        apply_ccx_policy(&mut rows, coexist_ccx_importer);
        debug!(rows = rows.len(), access_group = %access_group, "Read login users");
        Ok(rows)
    }

    fn outcome_error(
        &self,
        outcome: Outcome,
        status: Option<StatusCode>,
        failure: Option<reqwest::Error>,
    ) -> AxlError {
        let server = self.session.server().to_string();
        match outcome {
            Outcome::Success(_) => AxlError::malformed_payload("success treated as error"),
            Outcome::AuthFailure => AxlError::AuthenticationFailed {
                server,
                user: self.session.user().to_string(),
            },
            Outcome::VersionMismatch => AxlError::VersionMismatch {
                server,
                version: self.session.version().to_string(),
            },
            Outcome::Fault(ApplicationFault::QueryTooLarge { limits, .. }) => {
                AxlError::QueryTooLarge {
                    total: limits.total,
                    fetch_max: limits.fetch_max,
                }
            }
            Outcome::Fault(ApplicationFault::Unspecified { detail, message }) => AxlError::Fault {
                code: detail.map(|d| d.code).unwrap_or_default(),
                message,
            },
            Outcome::TransportError(message) => match status {
                Some(_) => AxlError::UnexpectedStatus {
                    server,
                    status: message,
                },
                None => transport_error(&server, message, failure),
            },
        }
    }
}

fn transport_error(server: &str, message: String, failure: Option<reqwest::Error>) -> AxlError {
    match failure {
        Some(source) => AxlError::transport_with_source(server, message, source),
        None => AxlError::transport(server, message),
    }
}

fn decode_version(payload: &str) -> AxlResult<(ComponentVersion, String)> {
    let component = ComponentVersion::decode(payload)?;
    let schema = component.schema_version()?;
    Ok((component, schema))
}

/// `599` has no canonical reason, so only the code is shown for it.
fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}
