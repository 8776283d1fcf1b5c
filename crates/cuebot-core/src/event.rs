//! Normalized events.
//!
//! [`BotEvent`] is the stable vocabulary the dispatcher and handlers
//! consume. Every variant keeps the raw platform payload so nothing is
//! lost across the abstraction boundary; platform events without a
//! mapping surface as [`BotEvent::Unmapped`] rather than being dropped.

use serde_json::Value;

/// Classification of normalized events, used to key the handler registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Public chat message.
    Message,
    /// Private message addressed to the bot.
    PrivateMessage,
    /// A user joined the channel.
    UserJoin,
    /// A user left the channel.
    UserLeave,
    /// Full user list snapshot.
    UserListSnapshot,
    /// The connection reached the `Connected` state.
    ConnectionUp,
    /// The connection was lost.
    ConnectionDown,
    /// The platform reported an error or sent a malformed frame.
    ProtocolError,
    /// A platform event with no dedicated mapping.
    Unmapped,
}

/// A platform-independent event record.
///
/// Produced by the normalizer, consumed once by the dispatcher, then
/// discarded; the engine retains nothing.
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// Public chat message.
    Message {
        /// Sender username.
        actor: String,
        /// Message body.
        content: String,
        /// Whole seconds since the epoch.
        timestamp: i64,
        /// Raw platform payload.
        raw: Value,
    },
    /// Private message.
    PrivateMessage {
        /// Sender username.
        actor: String,
        /// Message body.
        content: String,
        /// Whole seconds since the epoch.
        timestamp: i64,
        /// Raw platform payload.
        raw: Value,
    },
    /// A user joined the channel.
    UserJoin {
        /// Username.
        actor: String,
        /// Raw platform payload.
        raw: Value,
    },
    /// A user left the channel.
    UserLeave {
        /// Username.
        actor: String,
        /// Raw platform payload.
        raw: Value,
    },
    /// Full user list snapshot.
    UserListSnapshot {
        /// Usernames currently in the channel.
        actors: Vec<String>,
        /// Raw platform payload.
        raw: Value,
    },
    /// The connection reached the `Connected` state.
    ConnectionUp,
    /// The connection was lost.
    ConnectionDown {
        /// Why the connection went down.
        reason: String,
    },
    /// The platform reported an error or sent a malformed frame.
    ProtocolError {
        /// Error detail.
        detail: String,
        /// Raw platform payload, `Null` for decode failures.
        raw: Value,
    },
    /// A platform event with no dedicated mapping.
    Unmapped {
        /// The platform event name.
        platform_name: String,
        /// Raw platform payload.
        raw: Value,
    },
}

impl BotEvent {
    /// Returns the registry key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Message { .. } => EventKind::Message,
            Self::PrivateMessage { .. } => EventKind::PrivateMessage,
            Self::UserJoin { .. } => EventKind::UserJoin,
            Self::UserLeave { .. } => EventKind::UserLeave,
            Self::UserListSnapshot { .. } => EventKind::UserListSnapshot,
            Self::ConnectionUp => EventKind::ConnectionUp,
            Self::ConnectionDown { .. } => EventKind::ConnectionDown,
            Self::ProtocolError { .. } => EventKind::ProtocolError,
            Self::Unmapped { .. } => EventKind::Unmapped,
        }
    }

    /// Returns the acting user, where the event has one.
    pub fn actor(&self) -> Option<&str> {
        match self {
            Self::Message { actor, .. }
            | Self::PrivateMessage { actor, .. }
            | Self::UserJoin { actor, .. }
            | Self::UserLeave { actor, .. } => Some(actor),
            _ => None,
        }
    }

    /// Returns the message body, where the event has one.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Message { content, .. } | Self::PrivateMessage { content, .. } => Some(content),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_matches_variant() {
        let event = BotEvent::Message {
            actor: "alice".into(),
            content: "hi".into(),
            timestamp: 1_700_000_000,
            raw: json!({}),
        };
        assert_eq!(event.kind(), EventKind::Message);
        assert_eq!(event.actor(), Some("alice"));
        assert_eq!(event.content(), Some("hi"));
    }

    #[test]
    fn lifecycle_events_have_no_actor() {
        assert!(BotEvent::ConnectionUp.actor().is_none());
        let down = BotEvent::ConnectionDown {
            reason: "eof".into(),
        };
        assert!(down.actor().is_none());
        assert!(down.content().is_none());
    }
}
