//! Handler types.
//!
//! Handlers are async closures, type-erased into `Arc`'d functions so
//! the registry can store, clone and compare them by identity. The
//! [`event_handler`] / [`command_handler`] helpers do the erasure;
//! [`Bot`](crate::bot::Bot) registration methods call them for you.

use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use cuebot_core::BotEvent;
use cuebot_protocol::ChatHandle;

/// An error surfaced by a handler.
///
/// Handler failures are logged by the dispatcher and isolated; they
/// never terminate the run loop or suppress other handlers.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Creates a handler error from any displayable value.
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}

impl From<cuebot_core::SendError> for HandlerError {
    fn from(err: cuebot_core::SendError) -> Self {
        Self(err.to_string())
    }
}

/// Result type handlers return.
pub type HandlerResult = Result<(), HandlerError>;

/// What an event handler receives: the event plus an outbound handle.
#[derive(Clone)]
pub struct EventContext {
    /// The normalized event being dispatched.
    pub event: BotEvent,
    /// Outbound chat surface; valid across reconnects.
    pub chat: ChatHandle,
}

/// What a command handler receives.
#[derive(Clone)]
pub struct CommandContext {
    /// Username that issued the command.
    pub actor: String,
    /// The actor's rank as reported by the rank provider.
    pub rank: f64,
    /// Whitespace-split arguments after the command name.
    pub args: Vec<String>,
    /// Outbound chat surface; valid across reconnects.
    pub chat: ChatHandle,
    /// The message event that carried the command.
    pub event: BotEvent,
}

/// Type-erased event handler.
pub type EventHandlerFn =
    Arc<dyn Fn(EventContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Type-erased command handler.
pub type CommandHandlerFn =
    Arc<dyn Fn(CommandContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Erases an async closure into an [`EventHandlerFn`].
pub fn event_handler<F, Fut>(f: F) -> EventHandlerFn
where
    F: Fn(EventContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Erases an async closure into a [`CommandHandlerFn`].
pub fn command_handler<F, Fut>(f: F) -> CommandHandlerFn
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}
