//! # cuebot-framework
//!
//! The dispatch layer: a [`Bot`] run loop that consumes the normalized
//! event stream from a reconnecting connection and fans events out to
//! registered handlers, plus prefix-addressed commands with a minimum
//! rank gate.
//!
//! Handlers are plain async closures stored type-erased in the
//! [`HandlerRegistry`]; dispatch reads cloned snapshots, so
//! registration and unregistration are safe while the loop is running.
//! A failing handler is logged and isolated, never taking the loop or
//! its peers down with it.

pub mod bot;
pub mod handler;
pub mod rank;
pub mod registry;

pub use bot::Bot;
pub use handler::{
    CommandContext, CommandHandlerFn, EventContext, EventHandlerFn, HandlerError, HandlerResult,
    command_handler, event_handler,
};
pub use rank::{GuestRanks, RankProvider, StaticRanks};
pub use registry::{CommandSpec, HandlerRegistry};
