//! Unified error types for the cuebot engine.
//!
//! One enum per concern: transport failures, handshake/connect failures,
//! outbound send failures and wire decode failures. Higher layers wrap
//! these rather than invent parallel taxonomies.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur on the raw transport session.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Opening the transport failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The transport session ended.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// A frame could not be written.
    #[error("failed to send frame: {0}")]
    SendFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Connect Errors
// =============================================================================

/// Errors that can occur during the connect handshake.
///
/// Everything here except [`Authentication`](ConnectError::Authentication)
/// is retryable by the reconnect controller. Authentication failures are
/// fatal by policy: retrying bad credentials forever is a hot loop, not a
/// recovery.
#[derive(Debug, Clone, Error)]
pub enum ConnectError {
    /// The channel's socket config metadata was rejected or unusable.
    #[error("socket config error: {reason}")]
    SocketConfig {
        /// Reason for failure.
        reason: String,
    },

    /// The channel refused the join request.
    #[error("channel join refused: {reason}")]
    ChannelJoin {
        /// Reason for refusal.
        reason: String,
    },

    /// The platform rejected the configured credentials.
    #[error("authentication failed: {reason}")]
    Authentication {
        /// Error message from the platform.
        reason: String,
    },

    /// No acknowledgment arrived within the response timeout.
    #[error("no acknowledgment for {request} within the response timeout")]
    AckTimeout {
        /// The request that went unacknowledged.
        request: &'static str,
    },

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ConnectError {
    /// Returns `true` if this failure must not be auto-retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

// =============================================================================
// Send Errors
// =============================================================================

/// Errors that can occur when sending chat traffic.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The connection is not in the `Connected` state.
    #[error("not connected")]
    NotConnected,

    /// No acknowledgment arrived within the response timeout.
    #[error("no acknowledgment within the response timeout")]
    AckTimeout,

    /// The server refused the message.
    #[error("send rejected: {reason}")]
    Rejected {
        /// Error message from the platform.
        reason: String,
    },

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// =============================================================================
// Frame Errors
// =============================================================================

/// A frame received from the platform could not be decoded.
#[derive(Debug, Clone, Error)]
#[error("malformed frame: {0}")]
pub struct FrameError(pub String);

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for connect/handshake operations.
pub type ConnectResult<T> = Result<T, ConnectError>;

/// Result type for outbound sends.
pub type SendResult<T> = Result<T, SendError>;
