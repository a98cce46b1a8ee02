//! Server state: connection registry, matchmaking queue and paired sessions
//!
//! All mutations go through a single mutex so that two `start` requests can
//! never both observe an empty queue. Every handler runs to completion without
//! waiting on any client; delivery is a non-blocking channel send.

use crate::error::SignalingError;
use crate::queue::{MatchQueue, QueueOutcome};
use crate::registry::{PeerSender, Registry};
use crate::router;
use crate::sessions::{PairedSessions, RelayPolicy};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use voicematch_protocol::{PeerEvent, PeerId, Signal};

#[derive(Debug, Default)]
struct InnerState {
    registry: Registry,
    queue: MatchQueue,
    sessions: PairedSessions,
}

/// Shared handle to the server state
#[derive(Debug, Default, Clone)]
pub struct ServerState {
    inner: Arc<Mutex<InnerState>>,
    policy: RelayPolicy,
}

impl ServerState {
    /// Create a new server state handle
    pub fn new(policy: RelayPolicy) -> Self {
        Self {
            inner: Arc::default(),
            policy,
        }
    }

    pub fn policy(&self) -> RelayPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, InnerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a newly connected peer
    pub fn connect(&self, peer_id: PeerId, sender: PeerSender) {
        let mut state = self.lock();
        state.registry.register(peer_id, sender);
        info!(%peer_id, connected = state.registry.len(), "peer connected");
    }

    /// Handle a `start` request: wait for a partner or pair with the waiting peer
    pub fn start(&self, peer_id: PeerId) -> QueueOutcome {
        let mut state = self.lock();
        let state = &mut *state;

        if !state.registry.contains(&peer_id) {
            debug!(%peer_id, "ignoring start from unregistered peer");
            return QueueOutcome::Waiting;
        }

        match state.queue.request(peer_id) {
            QueueOutcome::Waiting => {
                debug!(%peer_id, "peer waiting for a match");
                notify(&state.registry, &peer_id, PeerEvent::waiting());
                QueueOutcome::Waiting
            }
            QueueOutcome::Paired(other) => {
                let matched = PeerEvent::Matched { peer_id };
                if let Err(e) = state.registry.send(&other, matched) {
                    // The waiting peer cannot be told it was matched; take its place
                    if let SignalingError::UnknownPeer(_) = e {
                        debug!(%peer_id, waiting = %other, "waiting peer is gone, requeueing");
                        state.registry.unregister(&other);
                        state.sessions.remove(&other);
                    } else {
                        warn!(%peer_id, waiting = %other, error = %e, "waiting peer unreachable, requeueing");
                    }
                    let outcome = state.queue.request(peer_id);
                    notify(&state.registry, &peer_id, PeerEvent::waiting());
                    return outcome;
                }
                notify(&state.registry, &peer_id, PeerEvent::Matched { peer_id: other });
                state.sessions.pair(peer_id, other);
                info!(%peer_id, peer = %other, "peers matched");
                QueueOutcome::Paired(other)
            }
        }
    }

    /// Relay a negotiation message from `sender` to the peer it names.
    ///
    /// Unknown destinations and, under [`RelayPolicy::PairedOnly`], unpaired
    /// destinations are reported to the caller and nothing is sent.
    pub fn relay(&self, sender: PeerId, signal: Signal) -> Result<(), SignalingError> {
        let state = self.lock();

        if self.policy == RelayPolicy::PairedOnly
            && !state.sessions.are_paired(&sender, &signal.peer_id)
        {
            return Err(SignalingError::NotPaired {
                from: sender,
                to: signal.peer_id,
            });
        }

        router::relay(&state.registry, sender, signal)
    }

    /// Remove a peer that disconnected. The partner is not notified.
    pub fn disconnect(&self, peer_id: &PeerId) {
        let mut state = self.lock();
        let was_waiting = state.queue.evict(peer_id);
        let partner = state.sessions.remove(peer_id);
        state.registry.unregister(peer_id);
        info!(
            %peer_id,
            was_waiting,
            partner = ?partner,
            connected = state.registry.len(),
            "peer disconnected"
        );
    }

    /// Number of live connections
    pub fn connected_peers(&self) -> usize {
        self.lock().registry.len()
    }

    /// The peer currently waiting for a match, if any
    pub fn waiting_peer(&self) -> Option<PeerId> {
        self.lock().queue.waiting()
    }

    /// The peer `peer_id` was last matched with, if both are still connected
    pub fn partner_of(&self, peer_id: &PeerId) -> Option<PeerId> {
        self.lock().sessions.partner_of(peer_id)
    }
}

fn notify(registry: &Registry, peer_id: &PeerId, event: PeerEvent) {
    if let Err(e) = registry.send(peer_id, event) {
        debug!(%peer_id, error = %e, "dropping notification");
    }
}
