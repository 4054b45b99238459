use std::fmt;

use chrono::NaiveDate;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoValidColumns,
    ClassificationArity,
    NoHistory,
    UpstreamRejected,
    UpstreamTransport,
    NotInitialized,
    EmptyFirstSnapshot,
    StoreFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoValidColumns => "E1001",
            Self::ClassificationArity => "E1002",
            Self::NoHistory => "E2001",
            Self::UpstreamRejected => "E3001",
            Self::UpstreamTransport => "E3002",
            Self::NotInitialized => "E4001",
            Self::EmptyFirstSnapshot => "E4002",
            Self::StoreFailure => "E4003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoValidColumns => "No valid column names requested",
            Self::ClassificationArity => "Classification needs identity and status columns",
            Self::NoHistory => "No previous snapshot to compare against",
            Self::UpstreamRejected => "Directory service rejected the request",
            Self::UpstreamTransport => "Directory service unreachable",
            Self::NotInitialized => "Snapshot table not initialized",
            Self::EmptyFirstSnapshot => "First snapshot is empty",
            Self::StoreFailure => "Snapshot store failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NoValidColumns => Some("Run `roster columns` to list the stored attributes."),
            Self::ClassificationArity => {
                Some("Pass the identity column first and the status column second.")
            }
            Self::NoHistory => {
                Some("Take another snapshot on a later day; the first run has nothing to diff.")
            }
            Self::UpstreamRejected => {
                Some("Check the directory token in SLACK_TOKEN or config.toml.")
            }
            Self::UpstreamTransport => Some("Check network access and retry."),
            Self::NotInitialized => Some("Run `roster snapshot` to record the first snapshot."),
            Self::EmptyFirstSnapshot => {
                Some("The column set is frozen at the first run; retry once records are returned.")
            }
            Self::StoreFailure => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Coarse error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The call asked for something the stored schema cannot answer.
    Configuration,
    /// Nothing older than the current run date has been recorded.
    NoHistory,
    /// The directory source failed; nothing was stored.
    UpstreamFetch,
    /// The backing store is unusable or uninitialized.
    Store,
}

/// Errors raised by the snapshot store, diff engine, and pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// None of the requested attribute names exist on the snapshot table.
    #[error("no valid column names among {requested:?} for table {table}")]
    NoValidColumns { table: String, requested: Vec<String> },

    /// A classification was requested over fewer than two attributes.
    #[error("classification needs (identity, status) columns, diff has {arity}")]
    ClassificationArity { arity: usize },

    /// No run date strictly before `today` exists.
    #[error("no snapshot recorded before {today}")]
    NoHistory { today: NaiveDate },

    /// The directory service answered but refused the call.
    #[error("directory request rejected: {reason}")]
    UpstreamRejected { reason: String },

    /// The directory service could not be reached or returned garbage.
    #[error("directory request failed: {0}")]
    UpstreamTransport(String),

    /// The snapshot table has not been created yet.
    #[error("snapshot table {table} is not initialized")]
    NotInitialized { table: String },

    /// The column set would be frozen from a snapshot with no rows.
    #[error("refusing to establish the column set of {table} from an empty snapshot")]
    EmptyFirstSnapshot { table: String },

    /// An existing snapshot table lacks the configured run-date column.
    #[error("snapshot table {table} has no run-date column {column}")]
    MissingRunDateColumn { table: String, column: String },

    /// A stored run date could not be parsed back.
    #[error("invalid run date {raw:?} in snapshot table")]
    InvalidRunDate { raw: String },

    /// The database location could not be prepared.
    #[error("failed to prepare store directory {path}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Underlying `SQLite` failure.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl RosterError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoValidColumns { .. } => ErrorCode::NoValidColumns,
            Self::ClassificationArity { .. } => ErrorCode::ClassificationArity,
            Self::NoHistory { .. } => ErrorCode::NoHistory,
            Self::UpstreamRejected { .. } => ErrorCode::UpstreamRejected,
            Self::UpstreamTransport(_) => ErrorCode::UpstreamTransport,
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::EmptyFirstSnapshot { .. } => ErrorCode::EmptyFirstSnapshot,
            Self::MissingRunDateColumn { .. }
            | Self::InvalidRunDate { .. }
            | Self::Io { .. }
            | Self::Sqlite(_) => ErrorCode::StoreFailure,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoValidColumns { .. } | Self::ClassificationArity { .. } => {
                ErrorKind::Configuration
            }
            Self::NoHistory { .. } => ErrorKind::NoHistory,
            Self::UpstreamRejected { .. } | Self::UpstreamTransport(_) => ErrorKind::UpstreamFetch,
            Self::NotInitialized { .. }
            | Self::EmptyFirstSnapshot { .. }
            | Self::MissingRunDateColumn { .. }
            | Self::InvalidRunDate { .. }
            | Self::Io { .. }
            | Self::Sqlite(_) => ErrorKind::Store,
        }
    }

    /// Returns true for the expected first-run condition.
    #[must_use]
    pub const fn is_no_history(&self) -> bool {
        matches!(self, Self::NoHistory { .. })
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// Result alias for core operations.
pub type Result<T, E = RosterError> = std::result::Result<T, E>;
