//! Paired session bookkeeping and relay policy

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use voicematch_protocol::PeerId;

/// Which relays the server accepts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RelayPolicy {
    /// Relay to any live peer the sender names
    #[default]
    Open,
    /// Relay only between peers the server paired with each other
    PairedOnly,
}

impl FromStr for RelayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(RelayPolicy::Open),
            "paired" | "paired-only" => Ok(RelayPolicy::PairedOnly),
            other => Err(format!("unknown relay policy '{other}'")),
        }
    }
}

impl fmt::Display for RelayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayPolicy::Open => f.write_str("open"),
            RelayPolicy::PairedOnly => f.write_str("paired"),
        }
    }
}

/// Symmetric map of peer -> current partner
#[derive(Debug, Default)]
pub struct PairedSessions {
    partners: HashMap<PeerId, PeerId>,
}

impl PairedSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `a` and `b` as partners, dropping any session either was in
    pub fn pair(&mut self, a: PeerId, b: PeerId) {
        self.remove(&a);
        self.remove(&b);
        self.partners.insert(a, b);
        self.partners.insert(b, a);
    }

    /// Drop the session `peer_id` is part of, on both sides
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<PeerId> {
        let partner = self.partners.remove(peer_id)?;
        if self.partners.get(&partner) == Some(peer_id) {
            self.partners.remove(&partner);
        }
        Some(partner)
    }

    pub fn partner_of(&self, peer_id: &PeerId) -> Option<PeerId> {
        self.partners.get(peer_id).copied()
    }

    pub fn are_paired(&self, a: &PeerId, b: &PeerId) -> bool {
        self.partners.get(a) == Some(b)
    }
}
