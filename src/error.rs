use thiserror::Error;

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Classification of a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, DNS failure, timeout.
    Network,
    /// The server answered with a non-success status.
    Status,
    /// The response body could not be decoded.
    Decode,
    /// The session is missing or expired (401/403).
    Unauthorized,
}

/// A failed remote call. Always treated as transient by the auto-saver:
/// dirty flags stay set and the next edit retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub kind: TransportErrorKind,
    pub status: Option<u16>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: TransportErrorKind::Network,
            status: None,
        }
    }

    pub fn with_kind(message: impl Into<String>, kind: TransportErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            status: None,
        }
    }

    /// Error for a non-success HTTP status. 401 and 403 map to `Unauthorized`.
    pub fn from_status(status: u16, endpoint: &str) -> Self {
        let kind = match status {
            401 | 403 => TransportErrorKind::Unauthorized,
            _ => TransportErrorKind::Status,
        };
        Self {
            message: format!("{endpoint} returned HTTP {status}"),
            kind,
            status: Some(status),
        }
    }
}

// ---------------------------------------------------------------------------
// ProfileError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Account document is missing the \"{0}\" section")]
    MissingSection(&'static str),

    #[error("Account section \"{section}\" must be an object, found {found}")]
    InvalidSection { section: &'static str, found: String },

    #[error("Partition data for \"{0}\" must be a JSON object")]
    NotAnObject(String),

    #[error("Unknown partition \"{0}\"")]
    UnknownPartition(String),
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: \"{value}\" ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// MediTrackError — top-level rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MediTrackError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Crate result; the error defaults to `MediTrackError`.
pub type Result<T, E = MediTrackError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
