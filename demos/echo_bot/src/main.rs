//! Echo Bot Demo
//!
//! A minimal bot wired through the whole stack: configuration and
//! logging from `cuebot-runtime`, the reconnecting WebSocket connection
//! from `cuebot-protocol`, and dispatch from `cuebot-framework`.
//!
//! # Commands
//!
//! - `!echo <text>` — repeats the text back to the channel
//! - `!say <text>` — like `!echo`, but only for moderators (rank ≥ 2)
//!
//! # Usage
//!
//! ```bash
//! CUEBOT_CONNECTION__DOMAIN=cytu.be \
//! CUEBOT_CONNECTION__CHANNEL=lobby \
//! cargo run --package echo-bot
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use cuebot_core::EventKind;
use cuebot_framework::Bot;
use cuebot_protocol::{Connection, ReconnectController, ReqwestFetch, WsConnector};
use cuebot_runtime::{load_config, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    logging::init_from_config(&config.logging);

    let connection_config = config.connection.to_connection_config();
    info!(
        domain = %connection_config.domain,
        channel = %connection_config.channel,
        "starting echo bot"
    );

    let connection = Connection::new(
        connection_config,
        Arc::new(ReqwestFetch::new(Duration::from_secs(10))?),
        Arc::new(WsConnector),
    );
    let bot = Bot::new(ReconnectController::new(connection))
        .with_prefix(config.bot.command_prefix.clone());

    // Log every chat line that goes by.
    bot.on(EventKind::Message, |ctx| async move {
        info!(
            actor = ctx.event.actor().unwrap_or(""),
            content = ctx.event.content().unwrap_or(""),
            "chat"
        );
        Ok(())
    });

    // Surface server-side complaints.
    bot.on(EventKind::ProtocolError, |ctx| async move {
        if let cuebot_core::BotEvent::ProtocolError { detail, .. } = &ctx.event {
            warn!(detail = %detail, "server reported an error");
        }
        Ok(())
    });

    bot.command("echo", 0.0, |ctx| async move {
        ctx.chat.send_message(&ctx.args.join(" ")).await?;
        Ok(())
    });

    // Moderators only.
    bot.command("say", 2.0, |ctx| async move {
        ctx.chat.send_message(&ctx.args.join(" ")).await?;
        Ok(())
    });

    let stop = bot.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            stop.cancel();
        }
    });

    bot.run().await?;
    Ok(())
}
