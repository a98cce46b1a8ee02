//! Live connection registry
//!
//! Maps each connected peer's id to the channel feeding its WebSocket writer.
//! Other components only ever hold a [`PeerId`] and resolve it here at send
//! time, so sending to a peer that already left is a lookup miss.

use crate::error::SignalingError;
use std::collections::HashMap;
use tokio::sync::mpsc::{Sender, error::TrySendError};
use voicematch_protocol::{PeerEvent, PeerId};

/// Events that may be queued for one connection before further ones are dropped.
pub const PEER_CHANNEL_BUFFER: usize = 128;

/// Outbound handle for one connection
pub type PeerSender = Sender<PeerEvent>;

#[derive(Debug, Default)]
pub struct Registry {
    peers: HashMap<PeerId, PeerSender>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new live connection
    pub fn register(&mut self, peer_id: PeerId, sender: PeerSender) {
        self.peers.insert(peer_id, sender);
    }

    /// Forget a connection. Returns false if it was not registered.
    pub fn unregister(&mut self, peer_id: &PeerId) -> bool {
        self.peers.remove(peer_id).is_some()
    }

    /// Look up the outbound handle for a peer
    pub fn resolve(&self, peer_id: &PeerId) -> Result<&PeerSender, SignalingError> {
        self.peers
            .get(peer_id)
            .ok_or(SignalingError::UnknownPeer(*peer_id))
    }

    /// Deliver an event to a registered peer without waiting.
    ///
    /// A peer whose writer has already shut down is reported as unknown; its
    /// disconnect is about to be processed. A peer that is not draining its
    /// queue gets [`SignalingError::PeerBacklogged`] and the event is dropped.
    pub fn send(&self, peer_id: &PeerId, event: PeerEvent) -> Result<(), SignalingError> {
        self.resolve(peer_id)?
            .try_send(event)
            .map_err(|e| match e {
                TrySendError::Full(_) => SignalingError::PeerBacklogged(*peer_id),
                TrySendError::Closed(_) => SignalingError::UnknownPeer(*peer_id),
            })
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
