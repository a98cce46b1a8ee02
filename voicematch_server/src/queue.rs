//! Single-slot matchmaking queue
//!
//! At most one peer waits at a time. The next distinct peer to ask is paired
//! with it and the slot is cleared.

use voicematch_protocol::PeerId;

/// Result of asking the queue for a partner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// The caller now holds the waiting slot
    Waiting,
    /// The caller was paired with the peer that was waiting
    Paired(PeerId),
}

#[derive(Debug, Default)]
pub struct MatchQueue {
    waiting: Option<PeerId>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `peer_id`, or pair it with whoever is waiting.
    ///
    /// Asking again while already waiting keeps the slot and reports
    /// `Waiting`; a peer is never paired with itself.
    pub fn request(&mut self, peer_id: PeerId) -> QueueOutcome {
        match self.waiting {
            None => {
                self.waiting = Some(peer_id);
                QueueOutcome::Waiting
            }
            Some(waiting) if waiting == peer_id => QueueOutcome::Waiting,
            Some(waiting) => {
                self.waiting = None;
                QueueOutcome::Paired(waiting)
            }
        }
    }

    /// Clear the slot if `peer_id` holds it. Returns true if it did.
    pub fn evict(&mut self, peer_id: &PeerId) -> bool {
        if self.waiting.as_ref() == Some(peer_id) {
            self.waiting = None;
            true
        } else {
            false
        }
    }

    /// The peer currently holding the slot, if any
    pub fn waiting(&self) -> Option<PeerId> {
        self.waiting
    }
}
