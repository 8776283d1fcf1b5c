//! # cuebot-protocol
//!
//! The connection engine: everything between the raw socket and the
//! normalized event stream.
//!
//! - [`locator`] resolves the channel's transport endpoint from the
//!   platform's socket-config metadata.
//! - [`transport`] defines the [`Session`](transport::Session) primitive
//!   (frame channels + shutdown signal) and the [`Connector`](transport::Connector)
//!   seam, with a WebSocket implementation behind the `ws-client` feature.
//! - [`connection`] owns one logical session: handshake, authentication
//!   (including the guest-rate-limit retry), serialized outbound sends,
//!   pending-acknowledgment tracking and the inbound event loop.
//! - [`normalize`] is the pure platform-event → [`BotEvent`](cuebot_core::BotEvent)
//!   translation.
//! - [`reconnect`] keeps a connection alive across transient failures
//!   with capped exponential backoff.

pub mod connection;
pub mod locator;
pub mod normalize;
pub mod reconnect;
pub mod transport;

pub use connection::{ChatHandle, Connection};
pub use locator::{HttpFetch, resolve_endpoint};
pub use normalize::normalize;
pub use reconnect::{Backoff, ControllerError, ControllerResult, ReconnectController};
pub use transport::{Connector, Session};

#[cfg(feature = "ws-client")]
pub use locator::ReqwestFetch;
#[cfg(feature = "ws-client")]
pub use transport::WsConnector;
