//! Anonymous voice-chat matchmaking and WebRTC signaling server
//!
//! Clients connect over WebSocket, ask to be paired, and then exchange the
//! offers, answers and ICE candidates needed to set up a direct media path.
//! The server never looks inside those payloads; it only forwards them to the
//! peer they are addressed to.
//!
//! # Protocol
//!
//! Every frame is a JSON text message `{"event": "<name>", "data": {...}}`.
//!
//! ## Requests (client → server)
//!
//! - `{"event":"start"}` - Ask for a partner
//! - `{"event":"keepalive"}` - No-op
//! - `{"event":"offer","data":{"peerId":"<uuid>","offer":...}}`
//! - `{"event":"answer","data":{"peerId":"<uuid>","answer":...}}`
//! - `{"event":"candidate","data":{"peerId":"<uuid>","candidate":...}}`
//!
//! On requests, `peerId` is the destination.
//!
//! ## Events (server → client)
//!
//! - `{"event":"status","data":{"state":"waiting"}}` - Waiting for a partner
//! - `{"event":"matched","data":{"peerId":"<uuid>"}}` - Paired with `peerId`
//! - `offer`, `answer`, `candidate` - As above, with `peerId` set to the sender
//!
//! Only one client waits at a time; the next client to send `start` is paired
//! with it. When a client disconnects its partner is not told.
//!
//! # Example
//!
//! ```bash
//! VOICEMATCH_BIND_ADDRESS=127.0.0.1:3000 RUST_LOG=voicematch_server=debug voicematch-server
//! websocat ws://127.0.0.1:3000
//! {"event":"start"}
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handler;
pub mod queue;
pub mod registry;
pub mod router;
pub mod server;
pub mod sessions;
pub mod state;

pub use config::Config;
pub use error::SignalingError;
pub use queue::QueueOutcome;
pub use server::SignalingServer;
pub use sessions::RelayPolicy;
pub use state::ServerState;
