//! Transport session primitive and the WebSocket connector.
//!
//! A [`Session`] is a pair of frame channels plus a shutdown signal; the
//! I/O pump behind it is an implementation detail of the [`Connector`]
//! that produced it. Tests hand-build sessions with
//! [`Session::from_parts`] and drive both ends directly.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use cuebot_core::{Frame, FrameError, TransportResult};

/// One decoded inbound frame, or the decode failure it produced.
pub type InboundItem = Result<Frame, FrameError>;

/// A live transport session.
///
/// Frames written to `outbound` are encoded and sent; everything the
/// peer sends arrives on `inbound`. When the peer goes away the pump
/// drops its `inbound` sender, so `inbound.recv()` returning `None`
/// means the session ended. Sending `true` on `shutdown` closes the
/// session from our side.
pub struct Session {
    /// Frames to write to the peer.
    pub outbound: mpsc::Sender<Frame>,
    /// Frames (or decode failures) read from the peer.
    pub inbound: mpsc::Receiver<InboundItem>,
    /// Set to `true` to tear the session down.
    pub shutdown: watch::Sender<bool>,
}

impl Session {
    /// Assembles a session from raw channel halves.
    ///
    /// This is the seam test doubles use: the counterpart halves stay
    /// with the caller, which then plays the peer.
    pub fn from_parts(
        outbound: mpsc::Sender<Frame>,
        inbound: mpsc::Receiver<InboundItem>,
        shutdown: watch::Sender<bool>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            shutdown,
        }
    }

    /// Signals the pump to close the session.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Opens transport sessions to an endpoint URL.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a session to `url`.
    async fn open(&self, url: &str) -> TransportResult<Session>;
}

// =============================================================================
// WsConnector
// =============================================================================

#[cfg(feature = "ws-client")]
pub use ws::WsConnector;

#[cfg(feature = "ws-client")]
mod ws {
    use super::*;

    use futures::{SinkExt, StreamExt};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;
    use tracing::{debug, trace, warn};

    use cuebot_core::TransportError;

    /// Depth of the outbound and inbound frame channels.
    const CHANNEL_CAPACITY: usize = 64;

    /// [`Connector`] over a WebSocket.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct WsConnector;

    #[async_trait]
    impl Connector for WsConnector {
        async fn open(&self, url: &str) -> TransportResult<Session> {
            let (stream, _) =
                connect_async(url)
                    .await
                    .map_err(|e| TransportError::ConnectionFailed {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })?;
            debug!(url = %url, "transport open");

            let (mut ws_tx, mut ws_rx) = stream.split();
            let (out_tx, mut out_rx) = mpsc::channel::<Frame>(CHANNEL_CAPACITY);
            let (in_tx, in_rx) = mpsc::channel::<InboundItem>(CHANNEL_CAPACITY);
            let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        result = shutdown_rx.changed() => {
                            if result.is_err() || *shutdown_rx.borrow() {
                                let _ = ws_tx.send(Message::Close(None)).await;
                                break;
                            }
                        }
                        frame = out_rx.recv() => {
                            let Some(frame) = frame else { break };
                            trace!(name = %frame.name, "send frame");
                            if let Err(e) = ws_tx.send(Message::text(frame.encode())).await {
                                warn!(error = %e, "transport write failed");
                                break;
                            }
                        }
                        message = ws_rx.next() => {
                            match message {
                                Some(Ok(Message::Text(text))) => {
                                    let item = Frame::decode(&text);
                                    if in_tx.send(item).await.is_err() {
                                        break;
                                    }
                                }
                                Some(Ok(Message::Ping(data))) => {
                                    let _ = ws_tx.send(Message::Pong(data)).await;
                                }
                                Some(Ok(Message::Close(_))) | None => {
                                    debug!("transport closed by peer");
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    warn!(error = %e, "transport read failed");
                                    break;
                                }
                            }
                        }
                    }
                }
                // Dropping in_tx is the end-of-session signal upstream.
            });

            Ok(Session::from_parts(out_tx, in_rx, shutdown_tx))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn from_parts_wires_both_directions() {
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let (in_tx, in_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let session = Session::from_parts(out_tx, in_rx, shutdown_tx);

        session
            .outbound
            .send(Frame::new("chatMsg", json!({"msg": "hi"})))
            .await
            .unwrap();
        assert_eq!(out_rx.recv().await.unwrap().name, "chatMsg");

        in_tx
            .send(Ok(Frame::new("rank", json!(3))))
            .await
            .unwrap();
        let mut session = session;
        assert_eq!(session.inbound.recv().await.unwrap().unwrap().name, "rank");

        session.close();
        assert!(*shutdown_rx.borrow());
    }

    #[tokio::test]
    async fn dropped_peer_ends_the_inbound_stream() {
        let (out_tx, _out_rx) = mpsc::channel(4);
        let (in_tx, in_rx) = mpsc::channel::<InboundItem>(4);
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        let mut session = Session::from_parts(out_tx, in_rx, shutdown_tx);

        drop(in_tx);
        assert!(session.inbound.recv().await.is_none());
    }
}
