//! Signal relay between peers

use crate::error::SignalingError;
use crate::registry::Registry;
use tracing::debug;
use voicematch_protocol::{PeerEvent, PeerId, Signal};

/// Forward `signal` from `sender` to the peer it names.
///
/// The outbound event carries `sender` in place of the destination so the
/// receiver knows who it came from. The payload is passed through untouched.
/// Returns [`SignalingError::UnknownPeer`] if the destination is gone.
pub fn relay(registry: &Registry, sender: PeerId, signal: Signal) -> Result<(), SignalingError> {
    let Signal {
        kind,
        peer_id: receiver,
        payload,
    } = signal;

    registry.send(&receiver, PeerEvent::relayed(kind, sender, payload))?;
    debug!(%sender, %receiver, %kind, "relayed signal");
    Ok(())
}
