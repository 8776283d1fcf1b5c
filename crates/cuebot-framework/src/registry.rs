//! Handler registry.
//!
//! Event handlers are keyed by [`EventKind`], commands by name. Reads
//! take cloned snapshots under a short read lock, so the dispatch loop
//! never iterates a collection that a registration call is mutating:
//! mutations made mid-dispatch apply from the next event onward.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use cuebot_core::EventKind;

use crate::handler::{CommandHandlerFn, EventHandlerFn};

/// A named command with its rank gate.
pub struct CommandSpec {
    /// Command name, addressed as `prefix + name`.
    pub name: String,
    /// Minimum actor rank; lower-ranked calls are refused without
    /// invoking the handler.
    pub min_rank: f64,
    /// The handler.
    pub handler: CommandHandlerFn,
}

/// Registry of event handlers and commands.
#[derive(Default)]
pub struct HandlerRegistry {
    events: RwLock<HashMap<EventKind, Vec<EventHandlerFn>>>,
    commands: RwLock<HashMap<String, Arc<CommandSpec>>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler for an event kind.
    pub fn register_event(&self, kind: EventKind, handler: EventHandlerFn) {
        self.events.write().entry(kind).or_default().push(handler);
    }

    /// Removes a previously registered handler, compared by identity.
    ///
    /// Returns `false` when the handler was not registered for `kind`.
    pub fn unregister_event(&self, kind: EventKind, handler: &EventHandlerFn) -> bool {
        let mut events = self.events.write();
        let Some(handlers) = events.get_mut(&kind) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        let removed = handlers.len() < before;
        if handlers.is_empty() {
            events.remove(&kind);
        }
        removed
    }

    /// Snapshot of the handlers for an event kind, in registration order.
    pub fn handlers_for(&self, kind: EventKind) -> Vec<EventHandlerFn> {
        self.events.read().get(&kind).cloned().unwrap_or_default()
    }

    /// Registers a command, replacing any previous one with the same name.
    pub fn register_command(&self, spec: CommandSpec) {
        self.commands
            .write()
            .insert(spec.name.clone(), Arc::new(spec));
    }

    /// Removes a command by name. Returns `false` when absent.
    pub fn unregister_command(&self, name: &str) -> bool {
        self.commands.write().remove(name).is_some()
    }

    /// Looks up a command by name.
    pub fn command(&self, name: &str) -> Option<Arc<CommandSpec>> {
        self.commands.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{command_handler, event_handler};

    #[test]
    fn snapshots_are_isolated_from_later_mutation() {
        let registry = HandlerRegistry::new();
        let first = event_handler(|_ctx| async { Ok(()) });
        registry.register_event(EventKind::Message, first.clone());

        let snapshot = registry.handlers_for(EventKind::Message);
        registry.register_event(EventKind::Message, event_handler(|_ctx| async { Ok(()) }));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.handlers_for(EventKind::Message).len(), 2);
    }

    #[test]
    fn unregister_compares_by_identity() {
        let registry = HandlerRegistry::new();
        let keep = event_handler(|_ctx| async { Ok(()) });
        let gone = event_handler(|_ctx| async { Ok(()) });
        registry.register_event(EventKind::Message, keep.clone());
        registry.register_event(EventKind::Message, gone.clone());

        assert!(registry.unregister_event(EventKind::Message, &gone));
        assert!(!registry.unregister_event(EventKind::Message, &gone));
        let left = registry.handlers_for(EventKind::Message);
        assert_eq!(left.len(), 1);
        assert!(Arc::ptr_eq(&left[0], &keep));
    }

    #[test]
    fn commands_replace_by_name() {
        let registry = HandlerRegistry::new();
        registry.register_command(CommandSpec {
            name: "ping".into(),
            min_rank: 0.0,
            handler: command_handler(|_ctx| async { Ok(()) }),
        });
        registry.register_command(CommandSpec {
            name: "ping".into(),
            min_rank: 3.0,
            handler: command_handler(|_ctx| async { Ok(()) }),
        });

        assert_eq!(registry.command("ping").unwrap().min_rank, 3.0);
        assert!(registry.command("pong").is_none());
        assert!(registry.unregister_command("ping"));
        assert!(registry.command("ping").is_none());
    }
}
