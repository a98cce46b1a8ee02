//! TCP accept loop

use crate::config::Config;
use crate::error::SignalingError;
use crate::handler::{handle_connection, websocket_config};
use crate::state::ServerState;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// A bound signaling server, ready to accept connections
pub struct SignalingServer {
    listener: TcpListener,
    state: ServerState,
    max_message_bytes: usize,
}

impl SignalingServer {
    /// Bind the listener described by `config`
    pub async fn bind(config: &Config) -> Result<Self, SignalingError> {
        let listener = TcpListener::bind(config.bind_address).await?;
        Ok(Self {
            listener,
            state: ServerState::new(config.relay_policy),
            max_message_bytes: config.max_message_bytes,
        })
    }

    /// Address actually bound, useful when binding port 0
    pub fn local_addr(&self) -> Result<SocketAddr, SignalingError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Accept connections until `shutdown` is cancelled.
    ///
    /// Returns once every open connection has been closed.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), SignalingError> {
        let addr = self.local_addr()?;
        info!(%addr, policy = %self.state.policy(), "signaling server listening");
        let connections = TaskTracker::new();

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, remote) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let state = self.state.clone();
            let config = websocket_config(self.max_message_bytes);
            let conn_shutdown = shutdown.child_token();
            connections.spawn(async move {
                if let Err(e) =
                    handle_connection(stream, remote, state, config, conn_shutdown).await
                {
                    debug!(%remote, error = %e, "connection ended with error");
                }
            });
        }

        connections.close();
        debug!(open = connections.len(), "waiting for connections to close");
        connections.wait().await;
        info!("signaling server stopped");
        Ok(())
    }
}
