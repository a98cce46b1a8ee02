//! Error types for the signaling server

use thiserror::Error;
use voicematch_protocol::PeerId;

/// Errors that can occur while routing messages between peers
#[derive(Error, Debug)]
pub enum SignalingError {
    /// The destination is not a live connection
    #[error("Unknown peer {0}")]
    UnknownPeer(PeerId),

    /// Sender and destination are not currently paired with each other
    #[error("Peers {from} and {to} are not paired")]
    NotPaired { from: PeerId, to: PeerId },

    /// The destination's outbound queue is full; the event was dropped
    #[error("Peer {0} is not keeping up, event dropped")]
    PeerBacklogged(PeerId),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Socket error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons an incoming frame did not yield a request
#[derive(Error, Debug)]
pub enum ClientRequestError {
    /// The client sent a close frame
    #[error("Client closed the connection")]
    Close,

    /// Text frame was not a valid request (bad JSON, unknown event or bad `peerId`)
    #[error("Invalid request: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary frames carry no requests
    #[error("Binary frames are not accepted")]
    UnsupportedType,

    /// Reading from the socket failed
    #[error("Socket read failed: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
