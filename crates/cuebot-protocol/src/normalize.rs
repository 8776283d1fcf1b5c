//! Platform frame → [`BotEvent`] translation.
//!
//! [`normalize`] is pure and total: every frame maps to exactly one
//! event, with [`BotEvent::Unmapped`] as the catch-all. Nothing the
//! platform sends is ever dropped on this path.

use serde_json::Value;

use cuebot_core::frame::names;
use cuebot_core::{BotEvent, Frame};

/// Translates one platform frame into its normalized event.
pub fn normalize(frame: &Frame) -> BotEvent {
    let payload = &frame.payload;
    match frame.name.as_str() {
        names::CHAT_MSG => BotEvent::Message {
            actor: str_field(payload, "username"),
            content: str_field(payload, "msg"),
            timestamp: timestamp_field(payload),
            raw: payload.clone(),
        },
        names::PM => BotEvent::PrivateMessage {
            actor: str_field(payload, "username"),
            content: str_field(payload, "msg"),
            timestamp: timestamp_field(payload),
            raw: payload.clone(),
        },
        names::ADD_USER => BotEvent::UserJoin {
            actor: str_field(payload, "name"),
            raw: payload.clone(),
        },
        names::USER_LEAVE => BotEvent::UserLeave {
            actor: str_field(payload, "name"),
            raw: payload.clone(),
        },
        names::USER_LIST => BotEvent::UserListSnapshot {
            actors: payload
                .as_array()
                .map(|users| {
                    users
                        .iter()
                        .filter_map(|u| u.get("name").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            raw: payload.clone(),
        },
        names::ERROR_MSG | names::NO_FLOOD | names::QUEUE_FAIL | names::KICK => {
            BotEvent::ProtocolError {
                detail: error_detail(&frame.name, payload),
                raw: payload.clone(),
            }
        }
        _ => BotEvent::Unmapped {
            platform_name: frame.name.clone(),
            raw: payload.clone(),
        },
    }
}

fn str_field(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Platform timestamps are epoch milliseconds; events carry whole seconds.
fn timestamp_field(payload: &Value) -> i64 {
    payload
        .get("time")
        .and_then(Value::as_i64)
        .map(|ms| ms / 1000)
        .unwrap_or_default()
}

fn error_detail(name: &str, payload: &Value) -> String {
    payload
        .get("msg")
        .and_then(Value::as_str)
        .or_else(|| payload.as_str())
        .unwrap_or(name)
        .to_string()
}
