use std::fmt;

/// Stable, transport-independent error kinds.
///
/// Adapters translate a kind into whatever status model they speak (HTTP
/// status, process exit code); the core never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidCursor,
    InvalidFilter,
    NotFound,
    QueryError,
    ExportError,
    ConcurrencyError,
    Cancelled,
}

impl ErrorKind {
    /// Every kind, in code order.
    pub const ALL: [Self; 7] = [
        Self::InvalidCursor,
        Self::InvalidFilter,
        Self::NotFound,
        Self::QueryError,
        Self::ExportError,
        Self::ConcurrencyError,
        Self::Cancelled,
    ];

    /// Stable kind identifier for machine parsing.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCursor => "INVALID_CURSOR",
            Self::InvalidFilter => "INVALID_FILTER",
            Self::NotFound => "NOT_FOUND",
            Self::QueryError => "QUERY_ERROR",
            Self::ExportError => "EXPORT_ERROR",
            Self::ConcurrencyError => "CONCURRENCY_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Stable code identifier (`E####`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidCursor => "E1001",
            Self::InvalidFilter => "E1002",
            Self::NotFound => "E2001",
            Self::QueryError => "E3001",
            Self::ExportError => "E4001",
            Self::ConcurrencyError => "E4002",
            Self::Cancelled => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidCursor => "Invalid page token",
            Self::InvalidFilter => "Invalid filter value",
            Self::NotFound => "Ticket not found",
            Self::QueryError => "Ticket query failed",
            Self::ExportError => "Export document could not be produced",
            Self::ConcurrencyError => "Export writer task failed",
            Self::Cancelled => "Operation cancelled",
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidCursor => {
                Some("Drop the page token and restart from the first page.")
            }
            Self::InvalidFilter => {
                Some("Dates must be RFC 3339 or YYYY-MM-DD and after <= before.")
            }
            Self::NotFound => None,
            Self::QueryError => Some("Check database connectivity and retry."),
            Self::ExportError | Self::ConcurrencyError => {
                Some("Retry the export. If persistent, report a bug with logs.")
            }
            Self::Cancelled => Some("Raise the timeout or narrow the date range."),
        }
    }

    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::QueryError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the helpdesk core.
#[derive(Debug, thiserror::Error)]
pub enum HelpdeskError {
    /// The page token is not a token this crate produced.
    #[error("invalid page token: {0}")]
    InvalidCursor(String),

    /// A filter value could not be interpreted.
    #[error("invalid filter '{field}': {reason}")]
    InvalidFilter { field: &'static str, reason: String },

    /// The store explicitly reported that nothing matched.
    #[error("ticket not found")]
    NotFound,

    /// Executing or scanning a store query failed.
    #[error("{context}: {source}")]
    Query {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Assembling or serializing the export document failed.
    #[error("export failed: {0}")]
    Export(String),

    /// A dispatched writer task failed.
    #[error("writer task '{task}' failed: {reason}")]
    Concurrency { task: String, reason: String },

    /// The caller cancelled the operation or its deadline passed.
    #[error("operation cancelled: {0}")]
    Cancelled(&'static str),
}

impl HelpdeskError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCursor(_) => ErrorKind::InvalidCursor,
            Self::InvalidFilter { .. } => ErrorKind::InvalidFilter,
            Self::NotFound => ErrorKind::NotFound,
            Self::Query { .. } => ErrorKind::QueryError,
            Self::Export(_) => ErrorKind::ExportError,
            Self::Concurrency { .. } => ErrorKind::ConcurrencyError,
            Self::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// Wrap a store error, turning an explicit no-rows signal into `NotFound`.
    pub(crate) fn query(context: impl Into<String>, source: rusqlite::Error) -> Self {
        match source {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound,
            source => Self::Query {
                context: context.into(),
                source,
            },
        }
    }

    pub(crate) fn invalid_filter(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = HelpdeskError> = std::result::Result<T, E>;
