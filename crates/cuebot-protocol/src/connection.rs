//! One logical channel session.
//!
//! [`Connection`] owns the handshake (endpoint resolution, transport
//! open, channel join, login with the guest-rate-limit retry), the
//! inbound event loop and session teardown. [`ChatHandle`] is the
//! cloneable outbound surface handlers hold; it refuses to send unless
//! the connection is in the `Connected` state.
//!
//! Acknowledgment tracking follows the register-before-send rule: a
//! response waiter is installed before the request frame is written, so
//! a fast reply can never slip past its matcher.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, timeout, timeout_at};
use tracing::{debug, info, warn};

use cuebot_core::frame::names;
use cuebot_core::{
    BotEvent, ConnectError, ConnectResult, ConnectionConfig, ConnectionState, Frame, SendError,
    SendResult, TransportError,
};

use crate::locator::{HttpFetch, resolve_endpoint, transport_url};
use crate::normalize::normalize;
use crate::transport::{Connector, InboundItem, Session};

// =============================================================================
// Shared state
// =============================================================================

type Matcher = Box<dyn Fn(&Frame) -> bool + Send>;

struct Waiter {
    matcher: Matcher,
    tx: oneshot::Sender<Frame>,
}

/// State shared between the connection and its [`ChatHandle`]s.
struct Shared {
    state: RwLock<ConnectionState>,
    outbound: RwLock<Option<mpsc::Sender<Frame>>>,
    waiters: Mutex<Vec<Waiter>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: RwLock::new(ConnectionState::Disconnected),
            outbound: RwLock::new(None),
            waiters: Mutex::new(Vec::new()),
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Transitions the state machine. `Closed` is never left.
    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.write();
        if !state.is_terminal() {
            *state = next;
        }
    }

    /// Offers an inbound frame to every registered response waiter.
    ///
    /// Matching waiters are fulfilled and removed; waiters whose
    /// receiver went away are pruned.
    fn offer(&self, frame: &Frame) {
        let mut waiters = self.waiters.lock();
        let mut i = 0;
        while i < waiters.len() {
            if waiters[i].tx.is_closed() {
                waiters.swap_remove(i);
            } else if (waiters[i].matcher)(frame) {
                let waiter = waiters.swap_remove(i);
                let _ = waiter.tx.send(frame.clone());
            } else {
                i += 1;
            }
        }
    }

    fn register_waiter(&self, matcher: Matcher) -> oneshot::Receiver<Frame> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().push(Waiter { matcher, tx });
        rx
    }

    /// Returns the outbound sender, or [`SendError::NotConnected`].
    fn ready_sender(&self) -> SendResult<mpsc::Sender<Frame>> {
        if !self.state().can_send() {
            return Err(SendError::NotConnected);
        }
        self.outbound.read().clone().ok_or(SendError::NotConnected)
    }

    fn clear_session(&self) {
        *self.outbound.write() = None;
        self.waiters.lock().clear();
    }
}

// =============================================================================
// Connection
// =============================================================================

/// One logical session with a channel.
///
/// Single-owner: `connect`, `next_event` and `disconnect` take `&mut
/// self` and are driven from one task, normally the reconnect
/// controller's run loop. Outbound traffic goes through [`ChatHandle`]s
/// instead, which stay valid across reconnects.
pub struct Connection {
    config: ConnectionConfig,
    fetch: Arc<dyn HttpFetch>,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    inbound: Option<mpsc::Receiver<InboundItem>>,
    session_shutdown: Option<watch::Sender<bool>>,
    /// Events produced out-of-band (handshake backlog, lifecycle).
    pending_events: VecDeque<BotEvent>,
}

impl Connection {
    /// Creates a connection over the given metadata fetch and transport.
    pub fn new(
        config: ConnectionConfig,
        fetch: Arc<dyn HttpFetch>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            config,
            fetch,
            connector,
            shared: Arc::new(Shared::new()),
            inbound: None,
            session_shutdown: None,
            pending_events: VecDeque::new(),
        }
    }

    /// The configuration this connection was built with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Returns a cloneable outbound handle.
    pub fn handle(&self) -> ChatHandle {
        ChatHandle {
            shared: Arc::clone(&self.shared),
            response_timeout: self.config.response_timeout,
            username: self.config.username.clone(),
        }
    }

    /// Runs the full connect handshake.
    ///
    /// On success the state is `Connected` and [`next_event`](Self::next_event)
    /// will yield [`BotEvent::ConnectionUp`] first, followed by any
    /// events the platform sent during the handshake. On failure the
    /// session is torn down and the state returns to `Disconnected`.
    pub async fn connect(&mut self) -> ConnectResult<()> {
        if self.shared.state().is_terminal() {
            return Err(ConnectError::Transport(TransportError::ConnectionClosed {
                reason: "connection closed for good".into(),
            }));
        }
        self.teardown_session();
        self.pending_events.clear();
        self.shared.set_state(ConnectionState::Connecting);

        match self.establish().await {
            Ok(()) => {
                self.shared.set_state(ConnectionState::Connected);
                info!(
                    domain = %self.config.domain,
                    channel = %self.config.channel,
                    "connected"
                );
                Ok(())
            }
            Err(e) => {
                self.teardown_session();
                self.shared.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> ConnectResult<()> {
        let server =
            resolve_endpoint(self.fetch.as_ref(), &self.config.domain, &self.config.channel)
                .await?;
        let url = transport_url(&server);
        let session = self.connector.open(&url).await?;
        let Session {
            outbound,
            mut inbound,
            shutdown,
        } = session;

        let mut backlog = Vec::new();
        match self.handshake(&outbound, &mut inbound, &mut backlog).await {
            Ok(()) => {
                *self.shared.outbound.write() = Some(outbound);
                self.inbound = Some(inbound);
                self.session_shutdown = Some(shutdown);
                self.pending_events.push_back(BotEvent::ConnectionUp);
                self.pending_events.extend(backlog);
                Ok(())
            }
            Err(e) => {
                let _ = shutdown.send(true);
                Err(e)
            }
        }
    }

    /// Channel join, then login when credentials are configured.
    async fn handshake(
        &self,
        outbound: &mpsc::Sender<Frame>,
        inbound: &mut mpsc::Receiver<InboundItem>,
        backlog: &mut Vec<BotEvent>,
    ) -> ConnectResult<()> {
        let join = json!({
            "name": self.config.channel,
            "pw": self.config.channel_password.clone().unwrap_or_default(),
        });
        send_frame(outbound, Frame::new(names::JOIN_CHANNEL, join)).await?;
        let ack = self
            .await_frame(inbound, backlog, "joinChannel", |f| {
                matches!(
                    f.name.as_str(),
                    names::NEED_PASSWORD
                        | names::RANK
                        | names::CHANNEL_OPTS
                        | names::SET_PERMISSIONS
                )
            })
            .await?;
        if ack.name == names::NEED_PASSWORD {
            return Err(ConnectError::ChannelJoin {
                reason: "invalid channel password".into(),
            });
        }
        debug!(channel = %self.config.channel, "joined channel");

        let Some(username) = self.config.username.clone() else {
            return Ok(());
        };
        self.shared.set_state(ConnectionState::Authenticating);
        let mut retried = false;
        loop {
            let login = json!({
                "name": username,
                "pw": self.config.password.clone().unwrap_or_default(),
            });
            send_frame(outbound, Frame::new(names::LOGIN, login)).await?;
            let ack = self
                .await_frame(inbound, backlog, "login", |f| f.name == names::LOGIN)
                .await?;
            if ack
                .payload
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                debug!(username = %username, "logged in");
                return Ok(());
            }
            let error = ack
                .payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("login rejected")
                .to_string();
            // The platform throttles guest logins; one deferred retry,
            // then the failure is treated like any other rejection.
            if let Some(delay) = guest_login_delay(&error)
                && !retried
            {
                retried = true;
                debug!(seconds = delay, "guest login throttled, retrying once");
                sleep(Duration::from_secs(delay)).await;
                continue;
            }
            return Err(ConnectError::Authentication { reason: error });
        }
    }

    /// Waits for a frame matching `matches`, normalizing everything else
    /// into `backlog` so no event is lost during the handshake.
    async fn await_frame(
        &self,
        inbound: &mut mpsc::Receiver<InboundItem>,
        backlog: &mut Vec<BotEvent>,
        request: &'static str,
        matches: impl Fn(&Frame) -> bool,
    ) -> ConnectResult<Frame> {
        let deadline = tokio::time::Instant::now() + self.config.response_timeout;
        loop {
            let item = timeout_at(deadline, inbound.recv())
                .await
                .map_err(|_| ConnectError::AckTimeout { request })?;
            match item {
                Some(Ok(frame)) => {
                    if matches(&frame) {
                        return Ok(frame);
                    }
                    backlog.push(normalize(&frame));
                }
                Some(Err(e)) => backlog.push(BotEvent::ProtocolError {
                    detail: e.to_string(),
                    raw: Value::Null,
                }),
                None => {
                    return Err(ConnectError::Transport(TransportError::ConnectionClosed {
                        reason: "transport closed during handshake".into(),
                    }));
                }
            }
        }
    }

    /// Yields the next normalized event.
    ///
    /// A lost transport surfaces exactly once as
    /// [`BotEvent::ConnectionDown`]; the following call returns an
    /// error, which is the reconnect controller's cue.
    pub async fn next_event(&mut self) -> ConnectResult<BotEvent> {
        if let Some(event) = self.pending_events.pop_front() {
            return Ok(event);
        }
        let Some(inbound) = self.inbound.as_mut() else {
            return Err(ConnectError::Transport(TransportError::ConnectionClosed {
                reason: "no active session".into(),
            }));
        };
        match inbound.recv().await {
            Some(Ok(frame)) => {
                self.shared.offer(&frame);
                Ok(normalize(&frame))
            }
            Some(Err(e)) => {
                warn!(error = %e, "discarding malformed frame");
                Ok(BotEvent::ProtocolError {
                    detail: e.to_string(),
                    raw: Value::Null,
                })
            }
            None => {
                self.teardown_session();
                self.shared.set_state(ConnectionState::Disconnected);
                Ok(BotEvent::ConnectionDown {
                    reason: "transport closed".into(),
                })
            }
        }
    }

    /// Tears down the active session, if any. Idempotent, never errors.
    pub fn disconnect(&mut self) {
        self.teardown_session();
        self.pending_events.clear();
        self.shared.set_state(ConnectionState::Disconnected);
    }

    /// Disconnects and makes the terminal transition to `Closed`.
    pub fn close(&mut self) {
        self.disconnect();
        self.shared.set_state(ConnectionState::Closed);
        info!("connection closed");
    }

    pub(crate) fn mark_reconnecting(&self) {
        self.shared.set_state(ConnectionState::Reconnecting);
    }

    fn teardown_session(&mut self) {
        if let Some(shutdown) = self.session_shutdown.take() {
            let _ = shutdown.send(true);
        }
        self.inbound = None;
        self.shared.clear_session();
    }
}

async fn send_frame(outbound: &mpsc::Sender<Frame>, frame: Frame) -> ConnectResult<()> {
    outbound.send(frame).await.map_err(|_| {
        ConnectError::Transport(TransportError::ConnectionClosed {
            reason: "transport closed during handshake".into(),
        })
    })
}

/// Parses the retry delay out of a guest-login throttle message.
///
/// The platform phrases it as "guest logins are restricted to one per N
/// seconds"; any other wording means the login itself was rejected.
fn guest_login_delay(error: &str) -> Option<u64> {
    let lower = error.to_lowercase();
    if !lower.contains("guest logins") {
        return None;
    }
    let words: Vec<&str> = lower.split_whitespace().collect();
    words.windows(2).find_map(|pair| {
        (pair[1].trim_end_matches('.') == "seconds")
            .then(|| pair[0].parse::<u64>().ok().map(|n| n.max(1)))
            .flatten()
    })
}

// =============================================================================
// ChatHandle
// =============================================================================

/// Cloneable outbound surface over a connection.
///
/// Handles stay valid across reconnects; while the connection is not
/// `Connected` every send returns [`SendError::NotConnected`].
#[derive(Clone)]
pub struct ChatHandle {
    shared: Arc<Shared>,
    response_timeout: Duration,
    username: Option<String>,
}

impl ChatHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Sends a public chat message. Fire-and-forget: the platform does
    /// not acknowledge chat traffic, rejections arrive as events.
    pub async fn send_message(&self, message: &str) -> SendResult<()> {
        self.send_message_with_meta(message, json!({})).await
    }

    /// Sends a public chat message with platform metadata attached,
    /// such as `modflair`.
    pub async fn send_message_with_meta(&self, message: &str, meta: Value) -> SendResult<()> {
        let sender = self.shared.ready_sender()?;
        let frame = Frame::new(names::CHAT_MSG, json!({"msg": message, "meta": meta}));
        sender.send(frame).await.map_err(|_| {
            SendError::Transport(TransportError::SendFailed("session task ended".into()))
        })
    }

    /// Sends a private message and waits for the platform's echo.
    ///
    /// Delivery is confirmed by the echoed `pm` frame addressed to the
    /// target; an `errorMsg` in the window is a rejection and no echo
    /// within the response timeout is [`SendError::AckTimeout`].
    pub async fn send_private_message(&self, to: &str, message: &str) -> SendResult<()> {
        let sender = self.shared.ready_sender()?;
        let username = self.username.clone();
        let target = to.to_string();
        let rx = self.shared.register_waiter(Box::new(move |frame| {
            match frame.name.as_str() {
                names::ERROR_MSG => true,
                names::PM => {
                    let from_self = username.as_deref().is_none_or(|name| {
                        frame.payload.get("username").and_then(Value::as_str) == Some(name)
                    });
                    let to_target =
                        frame.payload.get("to").and_then(Value::as_str) == Some(target.as_str());
                    from_self && to_target
                }
                _ => false,
            }
        }));

        let frame = Frame::new(names::PM, json!({"to": to, "msg": message, "meta": {}}));
        sender.send(frame).await.map_err(|_| {
            SendError::Transport(TransportError::SendFailed("session task ended".into()))
        })?;

        match timeout(self.response_timeout, rx).await {
            Ok(Ok(frame)) if frame.name == names::ERROR_MSG => {
                let reason = frame
                    .payload
                    .get("msg")
                    .and_then(Value::as_str)
                    .unwrap_or("private message rejected")
                    .to_string();
                Err(SendError::Rejected { reason })
            }
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(SendError::NotConnected),
            Err(_) => Err(SendError::AckTimeout),
        }
    }
}
