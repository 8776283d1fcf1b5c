//! Connection lifecycle state.

/// The connection state machine.
///
/// Exactly one instance exists per connection, mutated only by the
/// protocol connection and the reconnect controller under the run
/// loop's single logical thread of control. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No active session.
    Disconnected,
    /// Resolving the endpoint / opening the transport / joining.
    Connecting,
    /// Credentials submitted, awaiting the login acknowledgment.
    Authenticating,
    /// Handshake complete; outbound sends are permitted.
    Connected,
    /// Between attempts under the reconnect controller.
    Reconnecting,
    /// Shut down for good; never transitions out.
    Closed,
}

impl ConnectionState {
    /// Outbound sends are permitted only while `Connected`.
    pub fn can_send(self) -> bool {
        self == Self::Connected
    }

    /// `Closed` never transitions out.
    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
