//! Wire types shared by the voicematch server and its clients
//!
//! Every message is a single JSON object of the form
//! `{"event": "<name>", "data": {...}}`. Events without a payload omit `data`.
//!
//! Negotiation payloads (`offer`, `answer`, `candidate`) are carried as
//! arbitrary JSON and are never inspected by the server.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, server-assigned identity of one live client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(pub Uuid);

impl From<Uuid> for PeerId {
    fn from(id: Uuid) -> Self {
        PeerId(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PeerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(PeerId)
    }
}

/// Kind of negotiation message being relayed between two peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

impl SignalKind {
    /// Event name used on the wire for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::Candidate => "candidate",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A negotiation message addressed to a peer.
///
/// Inbound, `peer_id` names the destination. The payload is opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub kind: SignalKind,
    pub peer_id: PeerId,
    pub payload: Value,
}

/// Waiting state reported in a `status` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitingState {
    Waiting,
}

/// Requests sent from a client to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum PeerRequest {
    /// Ask to be paired with another waiting client
    Start,
    /// Does nothing; keeps idle connections from being reaped by proxies
    KeepAlive,
    Offer {
        #[serde(rename = "peerId")]
        peer_id: PeerId,
        offer: Value,
    },
    Answer {
        #[serde(rename = "peerId")]
        peer_id: PeerId,
        answer: Value,
    },
    Candidate {
        #[serde(rename = "peerId")]
        peer_id: PeerId,
        candidate: Value,
    },
}

impl PeerRequest {
    /// Convert a relay request into its signal envelope.
    ///
    /// Returns `None` for requests that are not relayed.
    pub fn into_signal(self) -> Option<Signal> {
        let (kind, peer_id, payload) = match self {
            PeerRequest::Offer { peer_id, offer } => (SignalKind::Offer, peer_id, offer),
            PeerRequest::Answer { peer_id, answer } => (SignalKind::Answer, peer_id, answer),
            PeerRequest::Candidate { peer_id, candidate } => {
                (SignalKind::Candidate, peer_id, candidate)
            }
            PeerRequest::Start | PeerRequest::KeepAlive => return None,
        };
        Some(Signal {
            kind,
            peer_id,
            payload,
        })
    }
}

impl FromStr for PeerRequest {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for PeerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Events sent from the server to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum PeerEvent {
    /// The client is holding the waiting slot
    Status { state: WaitingState },
    /// The client has been paired; `peer_id` is the other side
    Matched {
        #[serde(rename = "peerId")]
        peer_id: PeerId,
    },
    Offer {
        #[serde(rename = "peerId")]
        peer_id: PeerId,
        offer: Value,
    },
    Answer {
        #[serde(rename = "peerId")]
        peer_id: PeerId,
        answer: Value,
    },
    Candidate {
        #[serde(rename = "peerId")]
        peer_id: PeerId,
        candidate: Value,
    },
}

impl PeerEvent {
    /// The `status` event sent to a client that is now waiting
    pub fn waiting() -> Self {
        PeerEvent::Status {
            state: WaitingState::Waiting,
        }
    }

    /// Build the outbound event for a relayed signal.
    ///
    /// `sender` replaces the destination id so the receiver sees who the
    /// message came from.
    pub fn relayed(kind: SignalKind, sender: PeerId, payload: Value) -> Self {
        match kind {
            SignalKind::Offer => PeerEvent::Offer {
                peer_id: sender,
                offer: payload,
            },
            SignalKind::Answer => PeerEvent::Answer {
                peer_id: sender,
                answer: payload,
            },
            SignalKind::Candidate => PeerEvent::Candidate {
                peer_id: sender,
                candidate: payload,
            },
        }
    }
}

impl FromStr for PeerEvent {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for PeerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
