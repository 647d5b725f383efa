//! Per-run AXL session state.
//!
//! A [`Session`] is owned by exactly one [`AxlConnector`](crate::AxlConnector)
//! and mutated through `&mut` only, so sequence numbers and the negotiated
//! schema version always have a single writer.

use std::fmt;

use uuid::Uuid;

use crate::config::AxlConfig;

/// Sequence numbers start above this offset; the first request carries 11.
pub const SEQUENCE_OFFSET: u64 = 10;

/// Schema version state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbVersion {
    /// Negotiation has not started.
    Unknown,
    /// A candidate is being tried.
    Candidate(String),
    /// The server accepted this version.
    Negotiated(String),
    /// Every candidate was rejected.
    Unsupported,
}

impl DbVersion {
    /// Version string to put into the request namespace, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DbVersion::Candidate(v) | DbVersion::Negotiated(v) => Some(v),
            DbVersion::Unknown | DbVersion::Unsupported => None,
        }
    }
}

impl fmt::Display for DbVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbVersion::Unknown => f.write_str("unknown"),
            DbVersion::Candidate(v) => write!(f, "{v} (probing)"),
            DbVersion::Negotiated(v) => f.write_str(v),
            DbVersion::Unsupported => f.write_str("unsupported"),
        }
    }
}

/// Version negotiation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Nothing tried yet.
    Idle,
    /// Probing the candidate at this index.
    Probing(usize),
    /// A version was adopted and the credentials were accepted.
    Authenticated,
    /// Negotiation ended without a usable version.
    Failed,
}

impl NegotiationState {
    /// Whether negotiation has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NegotiationState::Authenticated | NegotiationState::Failed
        )
    }
}

/// Mutable state of one AXL synchronization run.
pub struct Session {
    id: Uuid,
    server: String,
    user: String,
    password: String,
    version: DbVersion,
    sequence: u64,
    authenticated: bool,
    state: NegotiationState,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("server", &self.server)
            .field("user", &self.user)
            .field("version", &self.version)
            .field("sequence", &self.sequence)
            .field("authenticated", &self.authenticated)
            .field("state", &self.state)
            .finish()
    }
}

impl Session {
    /// Create a fresh session for one run.
    pub fn new(
        server: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            server: server.into(),
            user: user.into(),
            password: password.into(),
            version: DbVersion::Unknown,
            sequence: SEQUENCE_OFFSET,
            authenticated: false,
            state: NegotiationState::Idle,
        }
    }

    /// Create a session from connection settings.
    pub fn from_config(config: &AxlConfig) -> Self {
        Self::new(&config.server, &config.user, &config.password)
    }

    /// Correlation id used in log records.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    pub fn version(&self) -> &DbVersion {
        &self.version
    }

    /// Last sequence number issued.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Issue the next sequence number. Never returns the same value twice.
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// `server - user`, as shown in status output.
    pub fn describe(&self) -> String {
        format!("{} - {}", self.server, self.user)
    }

    pub(crate) fn begin_candidate(&mut self, index: usize, candidate: &str) {
        self.version = DbVersion::Candidate(candidate.to_string());
        self.state = NegotiationState::Probing(index);
    }

    pub(crate) fn adopt_version(&mut self, version: String) {
        self.version = DbVersion::Negotiated(version);
        self.authenticated = true;
        self.state = NegotiationState::Authenticated;
    }

    pub(crate) fn reject_credentials(&mut self) {
        self.authenticated = false;
        self.version = DbVersion::Unknown;
        self.state = NegotiationState::Failed;
    }

    pub(crate) fn mark_unsupported(&mut self) {
        self.version = DbVersion::Unsupported;
        self.state = NegotiationState::Failed;
    }
}
