//! Wire frames.
//!
//! The platform speaks named events with a JSON payload, carried as a
//! two-element JSON array in a text message: `["chatMsg", {...}]`.
//! [`Frame`] is that unit; the raw payload is kept as a
//! [`serde_json::Value`] so nothing is lost between the socket and the
//! normalizer.

use serde_json::Value;

use crate::error::FrameError;

/// Well-known platform frame names.
pub mod names {
    /// Outbound: join a channel.
    pub const JOIN_CHANNEL: &str = "joinChannel";
    /// Outbound: authenticate. Inbound: login acknowledgment.
    pub const LOGIN: &str = "login";
    /// Chat message, both directions.
    pub const CHAT_MSG: &str = "chatMsg";
    /// Private message, both directions.
    pub const PM: &str = "pm";

    /// Inbound: a user joined the channel.
    pub const ADD_USER: &str = "addUser";
    /// Inbound: a user left the channel.
    pub const USER_LEAVE: &str = "userLeave";
    /// Inbound: full user list snapshot.
    pub const USER_LIST: &str = "userlist";

    /// Inbound: the channel requires a password.
    pub const NEED_PASSWORD: &str = "needPassword";
    /// Inbound: our rank in the channel; arrives right after a join.
    pub const RANK: &str = "rank";
    /// Inbound: channel options; arrives right after a join.
    pub const CHANNEL_OPTS: &str = "channelOpts";
    /// Inbound: channel permission table; arrives right after a join.
    pub const SET_PERMISSIONS: &str = "setPermissions";

    /// Inbound: generic server-side error.
    pub const ERROR_MSG: &str = "errorMsg";
    /// Inbound: flood control rejection.
    pub const NO_FLOOD: &str = "noflood";
    /// Inbound: playlist operation rejection.
    pub const QUEUE_FAIL: &str = "queueFail";
    /// Inbound: we were kicked from the channel.
    pub const KICK: &str = "kick";
}

/// One named event on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Platform event name.
    pub name: String,
    /// Raw JSON payload; `Null` when the event carries no data.
    pub payload: Value,
}

impl Frame {
    /// Creates a frame.
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Encodes this frame as the wire text representation.
    pub fn encode(&self) -> String {
        Value::Array(vec![Value::String(self.name.clone()), self.payload.clone()]).to_string()
    }

    /// Decodes a frame from wire text.
    ///
    /// Accepts `["name"]` (payload defaults to `Null`) and
    /// `["name", payload]`; anything else is a [`FrameError`].
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FrameError(format!("invalid JSON: {e}")))?;
        let Value::Array(mut items) = value else {
            return Err(FrameError("expected a JSON array".into()));
        };
        if items.is_empty() || items.len() > 2 {
            return Err(FrameError(format!(
                "expected 1 or 2 elements, got {}",
                items.len()
            )));
        }
        let payload = if items.len() == 2 {
            items.pop().unwrap_or(Value::Null)
        } else {
            Value::Null
        };
        let Value::String(name) = items.swap_remove(0) else {
            return Err(FrameError("event name is not a string".into()));
        };
        Ok(Self { name, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_decode_round_trip() {
        let frame = Frame::new(names::CHAT_MSG, json!({"msg": "hi", "username": "alice"}));
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn decode_without_payload() {
        let frame = Frame::decode(r#"["usercount"]"#).unwrap();
        assert_eq!(frame.name, "usercount");
        assert_eq!(frame.payload, Value::Null);
    }

    #[test]
    fn decode_rejects_non_array() {
        assert!(Frame::decode(r#"{"name": "chatMsg"}"#).is_err());
        assert!(Frame::decode("not json").is_err());
        assert!(Frame::decode(r#"[1, {}]"#).is_err());
        assert!(Frame::decode(r#"["a", {}, {}]"#).is_err());
    }
}
