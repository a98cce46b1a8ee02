//! Per-connection WebSocket handling
//!
//! Each connection gets a fresh [`PeerId`], an outbound channel registered
//! with the server state, and a writer task draining that channel into the
//! socket. Incoming text frames are parsed and dispatched until the client
//! goes away, at which point the peer is evicted.

use crate::error::{ClientRequestError, SignalingError};
use crate::registry::PEER_CHANNEL_BUFFER;
use crate::state::ServerState;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use voicematch_protocol::{PeerEvent, PeerId, PeerRequest};

/// How long the writer may take to flush queued events and send a close frame.
const WRITER_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// WebSocket limits applied to every connection
pub fn websocket_config(max_message_bytes: usize) -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(max_message_bytes))
        .max_frame_size(Some(max_message_bytes))
}

/// Parse one incoming frame.
///
/// Control frames yield `Ok(None)`.
fn parse_request(
    frame: Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Result<Option<PeerRequest>, ClientRequestError> {
    match frame? {
        Message::Text(text) => Ok(Some(text.as_str().parse()?)),
        Message::Close(_) => Err(ClientRequestError::Close),
        Message::Binary(_) => Err(ClientRequestError::UnsupportedType),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Ok(None),
    }
}

/// Dispatch a parsed request from `peer_id`
fn handle_request(state: &ServerState, peer_id: PeerId, request: PeerRequest) {
    match request {
        PeerRequest::Start => {
            state.start(peer_id);
        }
        PeerRequest::KeepAlive => {}
        request => {
            let Some(signal) = request.into_signal() else {
                return;
            };
            match state.relay(peer_id, signal) {
                Ok(()) => {}
                Err(SignalingError::UnknownPeer(receiver)) => {
                    debug!(%peer_id, %receiver, "dropping signal for unknown peer");
                }
                Err(e) => {
                    warn!(%peer_id, error = %e, "dropping signal");
                }
            }
        }
    }
}

/// Serve one client connection until it closes or `shutdown` fires
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: ServerState,
    config: WebSocketConfig,
    shutdown: CancellationToken,
) -> Result<(), SignalingError> {
    let ws = tokio_tungstenite::accept_async_with_config(stream, Some(config)).await?;
    let (mut sink, mut incoming) = ws.split();

    let peer_id: PeerId = uuid::Uuid::new_v4().into();
    let (sender, mut outbound) = mpsc::channel::<PeerEvent>(PEER_CHANNEL_BUFFER);
    state.connect(peer_id, sender);
    debug!(%peer_id, %addr, "websocket established");

    // Ends once the registry drops the sender on disconnect
    let mut writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            if let Err(e) = sink.send(Message::text(event.to_string())).await {
                debug!(%peer_id, error = %e, "failed to write to socket");
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = incoming.next() => frame,
        };
        let Some(frame) = frame else {
            break;
        };

        match parse_request(frame) {
            Ok(Some(request)) => handle_request(&state, peer_id, request),
            Ok(None) => {}
            Err(ClientRequestError::Close) => break,
            Err(ClientRequestError::WebSocket(e)) => {
                debug!(%peer_id, error = %e, "websocket read failed");
                break;
            }
            Err(e) => {
                warn!(%peer_id, error = %e, "dropping malformed message");
            }
        }
    }

    state.disconnect(&peer_id);
    if timeout(WRITER_CLOSE_TIMEOUT, &mut writer).await.is_err() {
        debug!(%peer_id, "writer did not finish, aborting");
        writer.abort();
    }
    Ok(())
}
