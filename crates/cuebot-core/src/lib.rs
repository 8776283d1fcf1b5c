//! # cuebot-core
//!
//! Core types shared by every layer of the cuebot engine:
//!
//! - **Configuration**: [`ConnectionConfig`] describes one channel session.
//! - **Connection state**: [`ConnectionState`] is the single state machine
//!   driven by the protocol connection and the reconnect controller.
//! - **Wire frames**: [`Frame`] is the platform's named-event-plus-payload
//!   unit, with the JSON array text encoding used on the socket.
//! - **Normalized events**: [`BotEvent`] is the stable, platform-independent
//!   vocabulary consumed by application logic; [`EventKind`] keys the
//!   handler registry.
//! - **Errors**: one `thiserror` enum per concern, with `Result` aliases.
//!
//! Higher layers live in `cuebot-protocol` (connection engine),
//! `cuebot-framework` (dispatch) and `cuebot-runtime` (config/logging).

pub mod config;
pub mod error;
pub mod event;
pub mod frame;
pub mod state;

pub use config::ConnectionConfig;
pub use error::{
    ConnectError, ConnectResult, FrameError, SendError, SendResult, TransportError,
    TransportResult,
};
pub use event::{BotEvent, EventKind};
pub use frame::{Frame, names};
pub use state::ConnectionState;
