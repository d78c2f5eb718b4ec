//! Shared error type across livesync crates.

use thiserror::Error;

/// Stable error codes surfaced to UI layers (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport-level connect failure.
    ConnectFailed,
    /// `connect` called while a connect is already in flight.
    ConnectInProgress,
    /// Reconnection gave up after the configured attempt budget.
    ReconnectExhausted,
    /// No live transport and queueing was refused.
    NotConnected,
    /// Offline queue bound exceeded.
    QueueFull,
    /// Malformed or unparseable envelope.
    Protocol,
    /// Export job failed.
    ExportFailed,
    /// `export_portfolio` called while a job is already running.
    ExportInProgress,
    /// Operation cancelled through its handle.
    Cancelled,
    /// Remote peer reported an application error.
    Remote,
    /// Invalid configuration.
    Config,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// String representation used in state snapshots and UI surfaces.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConnectFailed => "CONNECT_FAILED",
            ErrorKind::ConnectInProgress => "CONNECT_IN_PROGRESS",
            ErrorKind::ReconnectExhausted => "RECONNECT_EXHAUSTED",
            ErrorKind::NotConnected => "NOT_CONNECTED",
            ErrorKind::QueueFull => "QUEUE_FULL",
            ErrorKind::Protocol => "PROTOCOL",
            ErrorKind::ExportFailed => "EXPORT_FAILED",
            ErrorKind::ExportInProgress => "EXPORT_IN_PROGRESS",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Remote => "REMOTE",
            ErrorKind::Config => "CONFIG",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Unified error type used by the core models and the client runtime.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("connection already in progress")]
    ConnectInProgress,
    #[error("reconnect exhausted after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },
    #[error("not connected")]
    NotConnected,
    #[error("offline queue full (capacity {capacity})")]
    QueueFull { capacity: usize },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("export failed: {0}")]
    ExportFailed(String),
    #[error("export already in progress")]
    ExportInProgress,
    #[error("cancelled")]
    Cancelled,
    #[error("remote error: {0}")]
    Remote(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SyncError {
    /// Map the error to its stable UI-facing code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::ConnectFailed(_) => ErrorKind::ConnectFailed,
            SyncError::ConnectInProgress => ErrorKind::ConnectInProgress,
            SyncError::ReconnectExhausted { .. } => ErrorKind::ReconnectExhausted,
            SyncError::NotConnected => ErrorKind::NotConnected,
            SyncError::QueueFull { .. } => ErrorKind::QueueFull,
            SyncError::Protocol(_) => ErrorKind::Protocol,
            SyncError::ExportFailed(_) => ErrorKind::ExportFailed,
            SyncError::ExportInProgress => ErrorKind::ExportInProgress,
            SyncError::Cancelled => ErrorKind::Cancelled,
            SyncError::Remote(_) => ErrorKind::Remote,
            SyncError::Config(_) => ErrorKind::Config,
            SyncError::Internal(_) => ErrorKind::Internal,
        }
    }
}
