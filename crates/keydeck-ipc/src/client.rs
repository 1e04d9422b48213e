//! IPC client implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::net::UnixStream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, error, warn};

use crate::error::{IpcError, IpcResult};
use crate::events::Event;
use crate::messages::{Method, Request, Response};

type LineSink = SplitSink<Framed<UnixStream, LinesCodec>, String>;

/// IPC client for connecting to the Keydeck daemon.
pub struct IpcClient {
    sink: Arc<Mutex<LineSink>>,
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>,
    event_rx: mpsc::Receiver<Event>,
}

impl IpcClient {
    /// Connect to the daemon at the given socket path.
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect(socket_path: &Path) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let framed = Framed::new(stream, LinesCodec::new());
        let (sink, mut lines) = framed.split();

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, event_rx) = mpsc::channel(64);

        // Spawn reader task
        let pending_clone = Arc::clone(&pending);
        tokio::spawn(async move {
            loop {
                match lines.next().await {
                    None => {
                        debug!("Connection closed");
                        break;
                    }
                    Some(Ok(line)) => {
                        // Responses carry an id; everything else is an event
                        if let Ok(response) = serde_json::from_str::<Response>(&line) {
                            let mut pending = pending_clone.lock().await;
                            if let Some(tx) = pending.remove(&response.id) {
                                let _ = tx.send(response);
                            }
                        } else if let Ok(event) = serde_json::from_str::<Event>(&line) {
                            let _ = event_tx.send(event).await;
                        } else {
                            warn!("Unknown message format");
                        }
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Read error");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            sink: Arc::new(Mutex::new(sink)),
            next_id: AtomicU64::new(1),
            pending,
            event_rx,
        })
    }

    /// Connect to the daemon at the default socket path.
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect_default() -> IpcResult<Self> {
        Self::connect(&crate::socket_path()).await
    }

    /// Send a request and wait for a response.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn request(&self, method: Method) -> IpcResult<Response> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = Request { id, method };

        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        let json = serde_json::to_string(&request)?;

        {
            let mut sink = self.sink.lock().await;
            sink.send(json).await?;
        }

        rx.await.map_err(|_| IpcError::ChannelClosed)
    }

    /// Get the event receiver for incoming events.
    pub fn events(&mut self) -> &mut mpsc::Receiver<Event> {
        &mut self.event_rx
    }
}
