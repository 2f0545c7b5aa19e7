//! WebSocket server implementation
//!
//! Binds a TCP listener and runs the greeting exchange on every accepted
//! connection. Each connection gets its own task; connections share nothing
//! beyond the greeting string and the shutdown channel.

use std::net::SocketAddr;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::handler::{greet, HandlerError};
use crate::config::DEFAULT_GREETING;

/// Configuration for the WebSocket server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind: String,
    /// Port to listen on (0 picks an ephemeral port)
    pub port: u16,
    /// Greeting sent to each client on connect
    pub greeting: String,
}

impl ServerConfig {
    /// Create a new server configuration with the default greeting
    pub fn new(bind: String, port: u16) -> Self {
        Self {
            bind,
            port,
            greeting: DEFAULT_GREETING.to_string(),
        }
    }

    /// Set the greeting
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// WebSocket server running the greeting exchange per client
pub struct WebSocketServer {
    listener: TcpListener,
    greeting: String,
    shutdown_tx: broadcast::Sender<()>,
}

impl WebSocketServer {
    /// Bind the listener for the configured address
    ///
    /// Binding happens here rather than in [`run`](Self::run) so that bind
    /// failures surface at startup and callers can read an ephemeral port
    /// back through [`local_addr`](Self::local_addr).
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            listener,
            greeting: config.greeting,
            shutdown_tx,
        })
    }

    /// Get the address the server is listening on
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Trigger server shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the WebSocket server
    ///
    /// This will listen for incoming connections and handle them concurrently.
    /// The server will shut down gracefully when a shutdown signal is received.
    pub async fn run(&self) -> anyhow::Result<()> {
        let addr = self.local_addr()?;
        info!("WebSocket server listening on ws://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                // Accept new connections
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let greeting = self.greeting.clone();
                            let shutdown_rx = self.shutdown_tx.subscribe();

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, peer_addr, greeting, shutdown_rx).await {
                                    error!("Connection error from {}: {}", peer_addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                // Handle shutdown signal
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Handle a single WebSocket connection
///
/// Performs the handshake, runs the greeting exchange, then initiates the
/// close handshake so the client observes a clean end of stream. A peer
/// that disappears mid-exchange ends only this connection's task.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    greeting: String,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let conn_id = Uuid::new_v4();
    info!("New connection {} from {}", conn_id, peer_addr);

    // Upgrade to WebSocket
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let outcome = tokio::select! {
        result = greet(&mut ws_sender, &mut ws_receiver, &greeting) => Some(result),
        _ = shutdown_rx.recv() => None,
    };

    match outcome {
        Some(Ok(())) => {
            debug!("Exchange on connection {} complete", conn_id);
        }
        Some(Err(HandlerError::ConnectionClosed)) => {
            info!(
                "Connection {} closed by {} before the exchange completed",
                conn_id, peer_addr
            );
            return Ok(());
        }
        Some(Err(e)) => {
            return Err(e.into());
        }
        None => {
            info!("Shutdown signal received, closing connection {}", conn_id);
        }
    }

    let _ = ws_sender.send(Message::Close(None)).await;

    info!("Connection {} from {} closed", conn_id, peer_addr);
    Ok(())
}
