//! IPC server implementation.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use tokio_util::codec::{Framed, LinesCodec};

use crate::error::IpcResult;
use crate::events::Event;
use crate::messages::{Request, Response};

/// A request forwarded to the daemon, with the channel its response goes
/// back through.
pub type IncomingRequest = (u64, Request, mpsc::Sender<Response>);

/// IPC server that listens for client connections.
///
/// Requests from all clients are funneled into a single mpsc channel so the
/// daemon can process them serially alongside device packets; events are
/// fanned out to every connected client.
pub struct IpcServer {
    listener: UnixListener,
    next_client_id: AtomicU64,
    event_tx: broadcast::Sender<Event>,
    request_tx: mpsc::Sender<IncomingRequest>,
}

impl IpcServer {
    /// Create a new IPC server bound to the given socket path.
    ///
    /// # Errors
    /// Returns an error if the socket cannot be created.
    pub async fn bind(socket_path: &Path) -> IpcResult<(Self, mpsc::Receiver<IncomingRequest>)> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Remove stale socket file if it exists
        if socket_path.exists() {
            tokio::fs::remove_file(socket_path).await?;
        }

        let listener = UnixListener::bind(socket_path)?;
        info!(?socket_path, "IPC server listening");

        let (event_tx, _) = broadcast::channel(256);
        let (request_tx, request_rx) = mpsc::channel(64);

        Ok((Self { listener, next_client_id: AtomicU64::new(1), event_tx, request_tx }, request_rx))
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
                    info!(client_id, "Client connected");

                    let event_rx = self.event_tx.subscribe();
                    let request_tx = self.request_tx.clone();

                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_client(client_id, stream, event_rx, request_tx).await
                        {
                            error!(client_id, error = %e, "Client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Accept error");
                }
            }
        }
    }

    /// Broadcast an event to all connected clients.
    pub fn broadcast(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    /// Get a clone of the event sender for broadcasting from other tasks.
    #[must_use]
    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.event_tx.clone()
    }

    async fn handle_client(
        client_id: u64,
        stream: UnixStream,
        mut event_rx: broadcast::Receiver<Event>,
        request_tx: mpsc::Sender<IncomingRequest>,
    ) -> IpcResult<()> {
        let framed = Framed::new(stream, LinesCodec::new());
        let (mut sink, mut lines) = framed.split();

        let (response_tx, mut response_rx) = mpsc::channel::<Response>(16);

        loop {
            tokio::select! {
                // Read request from client
                line = lines.next() => {
                    match line {
                        None => {
                            debug!(client_id, "Client disconnected");
                            break;
                        }
                        Some(Ok(line)) => {
                            if let Ok(request) = serde_json::from_str::<Request>(&line) {
                                debug!(client_id, request_id = request.id, "Received request");
                                let _ = request_tx.send((client_id, request, response_tx.clone())).await;
                            } else {
                                warn!(client_id, "Invalid request format");
                            }
                        }
                        Some(Err(e)) => {
                            error!(client_id, error = %e, "Read error");
                            break;
                        }
                    }
                }

                // Send response to client
                Some(response) = response_rx.recv() => {
                    let json = serde_json::to_string(&response)?;
                    if let Err(e) = sink.send(json).await {
                        error!(client_id, error = %e, "Write error");
                        break;
                    }
                }

                // Forward events to client
                Ok(event) = event_rx.recv() => {
                    let json = serde_json::to_string(&event)?;
                    if let Err(e) = sink.send(json).await {
                        error!(client_id, error = %e, "Event write error");
                        break;
                    }
                }
            }
        }

        info!(client_id, "Client handler exiting");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::IpcClient;
    use crate::events::{EventType, LayerChangedData};
    use crate::messages::Method;
    use serde_json::Value;

    #[tokio::test]
    async fn test_request_response_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");

        let (server, mut request_rx) = IpcServer::bind(&path).await.unwrap();
        tokio::spawn(async move { server.run().await });

        // Minimal daemon stand-in: answer every request with null.
        tokio::spawn(async move {
            while let Some((_, request, response_tx)) = request_rx.recv().await {
                let _ = response_tx.send(Response { id: request.id, result: Ok(Value::Null) }).await;
            }
        });

        let client = IpcClient::connect(&path).await.unwrap();
        let response = client.request(Method::GetState).await.unwrap();
        assert_eq!(response.result.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_events_reach_connected_clients() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");

        let (server, _request_rx) = IpcServer::bind(&path).await.unwrap();
        let event_tx = server.event_sender();
        tokio::spawn(async move { server.run().await });

        let mut client = IpcClient::connect(&path).await.unwrap();
        // Give the accept loop a chance to register the connection.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        event_tx
            .send(Event::new(EventType::LayerChanged, LayerChangedData { layer: 2 }))
            .unwrap();

        let event = client.events().recv().await.unwrap();
        assert_eq!(event.event, EventType::LayerChanged);
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        std::fs::write(&path, b"stale").unwrap();

        let result = IpcServer::bind(&path).await;
        assert!(result.is_ok());
    }
}
