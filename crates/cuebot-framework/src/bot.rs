//! The bot run loop.
//!
//! [`Bot`] is the single consumer of the normalized event stream: it
//! connects through the reconnect controller, then loops pulling events
//! and routing them. Independent handlers for one event run
//! concurrently; the loop waits for all of them before pulling the next
//! event, so ordering across events is preserved.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use cuebot_core::{BotEvent, EventKind};
use cuebot_protocol::{ChatHandle, ControllerError, ControllerResult, ReconnectController};

use crate::handler::{
    CommandContext, EventContext, HandlerResult, command_handler, event_handler,
};
use crate::rank::{GuestRanks, RankProvider};
use crate::registry::{CommandSpec, HandlerRegistry};

/// Default command prefix.
const DEFAULT_PREFIX: &str = "!";

/// A channel bot: reconnecting connection + handler dispatch.
pub struct Bot {
    controller: ReconnectController,
    registry: Arc<HandlerRegistry>,
    ranks: Arc<dyn RankProvider>,
    prefix: String,
    cancel: CancellationToken,
}

impl Bot {
    /// Builds a bot over a reconnecting connection.
    pub fn new(controller: ReconnectController) -> Self {
        let cancel = controller.cancellation_token();
        Self {
            controller,
            registry: Arc::new(HandlerRegistry::new()),
            ranks: Arc::new(GuestRanks),
            prefix: DEFAULT_PREFIX.to_string(),
            cancel,
        }
    }

    /// Sets the rank provider consulted by the command gate.
    pub fn with_rank_provider(mut self, ranks: Arc<dyn RankProvider>) -> Self {
        self.ranks = ranks;
        self
    }

    /// Sets the command prefix (default `!`).
    ///
    /// An empty prefix is ignored: it would make every chat line parse
    /// as a command.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if prefix.is_empty() {
            warn!("ignoring empty command prefix");
        } else {
            self.prefix = prefix;
        }
        self
    }

    /// The registry, for registration from outside the run loop.
    pub fn registry(&self) -> Arc<HandlerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Cloneable outbound chat handle.
    pub fn handle(&self) -> ChatHandle {
        self.controller.handle()
    }

    /// Token that stops the run loop; safe to trigger from anywhere.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Registers an async event handler.
    pub fn on<F, Fut>(&self, kind: EventKind, f: F)
    where
        F: Fn(EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register_event(kind, event_handler(f));
    }

    /// Registers a named command with a minimum rank gate.
    pub fn command<F, Fut>(&self, name: impl Into<String>, min_rank: f64, f: F)
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register_command(CommandSpec {
            name: name.into(),
            min_rank,
            handler: command_handler(f),
        });
    }

    /// Requests the run loop to exit at its next suspension point.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Connects and runs until stopped or a fatal error.
    ///
    /// Returns `Ok(())` on a cooperative stop; fatal connect failures
    /// and an exhausted attempt cap surface as errors. Either way the
    /// connection ends `Closed`.
    pub async fn run(mut self) -> ControllerResult<()> {
        if let Err(e) = self.controller.connect().await {
            self.controller.shutdown();
            return match e {
                ControllerError::Stopped => Ok(()),
                e => Err(e),
            };
        }
        info!("bot running");

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = self.controller.next_event() => event,
            };
            match event {
                Ok(event) => self.route(event).await,
                Err(ControllerError::Stopped) => break,
                Err(e) => {
                    self.controller.shutdown();
                    return Err(e);
                }
            }
        }

        info!("bot stopping");
        self.controller.shutdown();
        Ok(())
    }

    /// Fans one event out to its handlers and waits for them.
    async fn route(&self, event: BotEvent) {
        let kind = event.kind();
        let chat = self.controller.handle();
        let mut tasks = Vec::new();

        for handler in self.registry.handlers_for(kind) {
            let ctx = EventContext {
                event: event.clone(),
                chat: chat.clone(),
            };
            let actor = event.actor().unwrap_or_default().to_string();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = handler(ctx).await {
                    error!(?kind, actor = %actor, error = %e, "event handler failed");
                }
            }));
        }

        if let BotEvent::Message { actor, content, .. } = &event
            && let Some((name, args)) = self.parse_command(content)
            && let Some(spec) = self.registry.command(&name)
        {
            let rank = self.ranks.rank_of(actor).await;
            if rank < spec.min_rank {
                warn!(
                    command = %name,
                    actor = %actor,
                    rank,
                    min_rank = spec.min_rank,
                    "command refused, rank too low"
                );
            } else {
                debug!(command = %name, actor = %actor, "dispatching command");
                let handler = Arc::clone(&spec.handler);
                let ctx = CommandContext {
                    actor: actor.clone(),
                    rank,
                    args,
                    chat: chat.clone(),
                    event: event.clone(),
                };
                let actor = actor.clone();
                tasks.push(tokio::spawn(async move {
                    if let Err(e) = handler(ctx).await {
                        error!(command = %name, actor = %actor, error = %e, "command handler failed");
                    }
                }));
            }
        }

        for task in tasks {
            if let Err(e) = task.await {
                error!(?kind, error = %e, "handler task aborted");
            }
        }
    }

    /// Splits `prefix + name + args` out of message content.
    fn parse_command(&self, content: &str) -> Option<(String, Vec<String>)> {
        let rest = content.strip_prefix(&self.prefix)?;
        let mut words = rest.split_whitespace();
        let name = words.next()?.to_string();
        Some((name, words.map(str::to_string).collect()))
    }
}
