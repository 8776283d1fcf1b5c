//! Reconnection controller.
//!
//! Keeps a [`Connection`] alive across transient failures without
//! caller involvement: exponential backoff with a doubling factor of 2
//! and a hard delay cap, an optional attempt cap, and a stabilization
//! window after which a healthy session clears the failure streak.
//! Authentication failures are surfaced instead of retried.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use cuebot_core::{BotEvent, ConnectError, ConnectionState};

use crate::connection::{ChatHandle, Connection};

// =============================================================================
// Backoff
// =============================================================================

/// Capped exponential backoff: `min(base · 2^(n-1), max)` for the n-th
/// consecutive failure.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempts: u32,
}

impl Backoff {
    /// Creates a backoff over the given delay range.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempts: 0,
        }
    }

    /// Consecutive failures since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Records a failure and returns the delay to sleep before retrying.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.attempts.min(31);
        self.attempts = self.attempts.saturating_add(1);
        self.base
            .checked_mul(1u32 << exp)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Clears the failure streak.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

// =============================================================================
// Controller errors
// =============================================================================

/// Terminal outcomes of the reconnect loop.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// `stop()` was requested.
    #[error("reconnect controller stopped")]
    Stopped,

    /// The configured attempt cap was reached.
    #[error("gave up after {attempts} reconnect attempts")]
    AttemptsExhausted {
        /// Consecutive failed attempts.
        attempts: u32,
        /// The last connect failure.
        #[source]
        source: ConnectError,
    },

    /// A failure that must not be auto-retried, such as rejected
    /// credentials.
    #[error(transparent)]
    Fatal(#[from] ConnectError),
}

/// Result type for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

// =============================================================================
// ReconnectController
// =============================================================================

/// Drives a [`Connection`] with automatic reconnection.
///
/// Owns the connection and the retry state; consumers read events
/// through [`next_event`](Self::next_event), which reconnects
/// transparently when the session is lost.
pub struct ReconnectController {
    connection: Connection,
    backoff: Backoff,
    max_attempts: Option<u32>,
    stabilization: Duration,
    connected_at: Option<Instant>,
    cancel: CancellationToken,
}

impl ReconnectController {
    /// Wraps a connection, taking the retry policy from its config.
    pub fn new(connection: Connection) -> Self {
        let config = connection.config();
        Self {
            backoff: Backoff::new(config.base_reconnect_delay, config.max_reconnect_delay),
            max_attempts: config.max_reconnect_attempts,
            stabilization: config.response_timeout,
            connected_at: None,
            cancel: CancellationToken::new(),
            connection,
        }
    }

    /// Token observed by every suspension point in the retry loop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cloneable outbound handle of the underlying connection.
    pub fn handle(&self) -> ChatHandle {
        self.connection.handle()
    }

    /// Current lifecycle state of the underlying connection.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Consecutive failed attempts in the current streak.
    pub fn reconnect_attempts(&self) -> u32 {
        self.backoff.attempts()
    }

    /// Connects, retrying transient failures with capped backoff.
    pub async fn connect(&mut self) -> ControllerResult<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(ControllerError::Stopped);
            }
            match self.connection.connect().await {
                Ok(()) => {
                    self.connected_at = Some(Instant::now());
                    return Ok(());
                }
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "fatal connect failure, not retrying");
                    return Err(ControllerError::Fatal(e));
                }
                Err(e) => self.back_off(e).await?,
            }
        }
    }

    /// Records one failure and sleeps the backoff delay, honoring the
    /// attempt cap and cancellation.
    async fn back_off(&mut self, source: ConnectError) -> ControllerResult<()> {
        let delay = self.backoff.next_delay();
        let attempts = self.backoff.attempts();
        if let Some(max) = self.max_attempts
            && attempts >= max
        {
            error!(attempts, "reconnect attempts exhausted");
            return Err(ControllerError::AttemptsExhausted { attempts, source });
        }
        warn!(
            error = %source,
            attempt = attempts,
            delay_secs = delay.as_secs_f64(),
            "connection failed, backing off"
        );
        self.connection.mark_reconnecting();
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ControllerError::Stopped),
            _ = sleep(delay) => Ok(()),
        }
    }

    /// Yields the next event, reconnecting transparently when the
    /// session is lost.
    ///
    /// The consumer still observes the lifecycle: a lost session
    /// surfaces as [`BotEvent::ConnectionDown`], the successful
    /// reconnect as the following [`BotEvent::ConnectionUp`].
    pub async fn next_event(&mut self) -> ControllerResult<BotEvent> {
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ControllerError::Stopped),
                event = self.connection.next_event() => event,
            };
            match event {
                Ok(event) => {
                    self.maybe_stabilize();
                    return Ok(event);
                }
                Err(e) => {
                    debug!(error = %e, "session lost, reconnecting");
                    self.maybe_stabilize();
                    self.connected_at = None;
                    // Losing an established session is a failure too;
                    // without the delay an accept-then-drop server
                    // would reconnect in a hot loop.
                    self.back_off(e).await?;
                    self.connect().await?;
                }
            }
        }
    }

    /// Requests the retry loop to exit at its next suspension point.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stops and makes the terminal transition to `Closed`.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        self.connection.close();
    }

    /// A session that outlived the stabilization window clears the
    /// failure streak.
    fn maybe_stabilize(&mut self) {
        if let Some(at) = self.connected_at
            && self.backoff.attempts() > 0
            && at.elapsed() >= self.stabilization
        {
            debug!("connection stabilized, backoff reset");
            self.backoff.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::future::BoxFuture;
    use serde_json::{Value, json};
    use tokio::sync::{mpsc, watch};

    use cuebot_core::frame::names;
    use cuebot_core::{ConnectResult, ConnectionConfig, Frame, TransportError, TransportResult};

    use crate::locator::HttpFetch;
    use crate::transport::{Connector, InboundItem, Session};

    #[test]
    fn backoff_doubles_until_capped() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(4));
        let delays: Vec<u64> = (0..4).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 4]);
        assert_eq!(backoff.attempts(), 4);

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn backoff_defaults_walk_to_sixty_seconds() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(60));
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 60]);
    }

    // ------------------------------------------------------------------

    struct StaticFetch;

    #[async_trait]
    impl HttpFetch for StaticFetch {
        async fn get(&self, _url: &str) -> ConnectResult<String> {
            Ok(r#"{"servers": [{"url": "https://s.example", "secure": true}]}"#.into())
        }
    }

    struct Peer {
        from_client: mpsc::Receiver<Frame>,
        to_client: mpsc::Sender<InboundItem>,
    }

    impl Peer {
        async fn expect(&mut self, name: &str) -> Frame {
            let frame = self.from_client.recv().await.unwrap();
            assert_eq!(frame.name, name);
            frame
        }

        async fn send(&self, name: &str, payload: Value) {
            let _ = self.to_client.send(Ok(Frame::new(name, payload))).await;
        }
    }

    /// Fails the first `fail_first` opens, then runs `script` with the
    /// zero-based index of the successful open.
    struct FlakyConnector {
        opens: AtomicUsize,
        fail_first: usize,
        script: Arc<dyn Fn(usize, Peer) -> BoxFuture<'static, ()> + Send + Sync>,
    }

    impl FlakyConnector {
        fn new<F, Fut>(fail_first: usize, script: F) -> Arc<Self>
        where
            F: Fn(usize, Peer) -> Fut + Send + Sync + 'static,
            Fut: std::future::Future<Output = ()> + Send + 'static,
        {
            Arc::new(Self {
                opens: AtomicUsize::new(0),
                fail_first,
                script: Arc::new(move |n, peer| Box::pin(script(n, peer))),
            })
        }

        fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        async fn open(&self, url: &str) -> TransportResult<Session> {
            let n = self.opens.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(TransportError::ConnectionFailed {
                    url: url.to_string(),
                    reason: "connection refused".into(),
                });
            }
            let (out_tx, out_rx) = mpsc::channel(16);
            let (in_tx, in_rx) = mpsc::channel(16);
            let (shutdown_tx, _shutdown_rx) = watch::channel(false);
            tokio::spawn((self.script)(
                n - self.fail_first,
                Peer {
                    from_client: out_rx,
                    to_client: in_tx,
                },
            ));
            Ok(Session::from_parts(out_tx, in_rx, shutdown_tx))
        }
    }

    async fn joining_peer(mut peer: Peer) -> Peer {
        peer.expect(names::JOIN_CHANNEL).await;
        peer.send(names::RANK, json!(0)).await;
        peer
    }

    fn controller(config: ConnectionConfig, connector: Arc<FlakyConnector>) -> ReconnectController {
        ReconnectController::new(Connection::new(config, Arc::new(StaticFetch), connector))
    }

    fn fast_config() -> ConnectionConfig {
        ConnectionConfig::new("cytu.be", "lobby")
            .with_reconnect_delays(Duration::from_secs(1), Duration::from_secs(4))
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_doubling_delays_until_success() {
        let connector = FlakyConnector::new(2, |_, peer| async {
            let _peer = joining_peer(peer).await;
            std::future::pending::<()>().await;
        });
        let mut ctrl = controller(fast_config(), Arc::clone(&connector));

        let started = Instant::now();
        ctrl.connect().await.unwrap();

        // Two failures: 1s + 2s of backoff.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(connector.opens(), 3);
        assert_eq!(ctrl.reconnect_attempts(), 2);
        assert_eq!(ctrl.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_cap_surfaces_exhaustion() {
        let connector = FlakyConnector::new(usize::MAX, |_, _| async {});
        let config = fast_config().with_max_reconnect_attempts(3);
        let mut ctrl = controller(config, Arc::clone(&connector));

        let err = ctrl.connect().await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::AttemptsExhausted { attempts: 3, .. }
        ));
        assert_eq!(connector.opens(), 3);
    }

    #[tokio::test]
    async fn rejected_credentials_are_not_retried() {
        let connector = FlakyConnector::new(0, |_, peer| async {
            let mut peer = joining_peer(peer).await;
            peer.expect(names::LOGIN).await;
            peer.send(
                names::LOGIN,
                json!({"success": false, "error": "Invalid username/password combination"}),
            )
            .await;
            std::future::pending::<()>().await;
        });
        let config = fast_config().with_account("rosey", Some("wrong".into()));
        let mut ctrl = controller(config, Arc::clone(&connector));

        let err = ctrl.connect().await.unwrap_err();
        assert!(matches!(err, ControllerError::Fatal(_)));
        assert_eq!(connector.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_backoff_sleep() {
        let connector = FlakyConnector::new(usize::MAX, |_, _| async {});
        let mut ctrl = controller(fast_config(), connector);
        let token = ctrl.cancellation_token();

        let task = tokio::spawn(async move { ctrl.connect().await });
        tokio::task::yield_now().await;
        token.cancel();

        assert!(matches!(
            task.await.unwrap(),
            Err(ControllerError::Stopped)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn session_loss_reconnects_transparently() {
        let connector = FlakyConnector::new(0, |n, peer| async move {
            let peer = joining_peer(peer).await;
            if n == 0 {
                // First session dies right after the handshake.
                return;
            }
            sleep(Duration::from_secs(5)).await;
            peer.send(names::CHAT_MSG, json!({"username": "alice", "msg": "hi"}))
                .await;
            std::future::pending::<()>().await;
        });
        let mut ctrl = controller(fast_config(), Arc::clone(&connector));

        ctrl.connect().await.unwrap();
        assert!(matches!(
            ctrl.next_event().await.unwrap(),
            BotEvent::ConnectionUp
        ));
        assert!(matches!(
            ctrl.next_event().await.unwrap(),
            BotEvent::ConnectionDown { .. }
        ));
        // The error behind the scenes triggers a reconnect.
        assert!(matches!(
            ctrl.next_event().await.unwrap(),
            BotEvent::ConnectionUp
        ));
        assert_eq!(connector.opens(), 2);
        assert_eq!(ctrl.reconnect_attempts(), 1);

        // The delayed message proves the new session is live; by then
        // the stabilization window has passed and the streak is clear.
        assert!(matches!(
            ctrl.next_event().await.unwrap(),
            BotEvent::Message { .. }
        ));
        assert_eq!(ctrl.reconnect_attempts(), 0);
    }
}
