//! Keydeck Daemon - macro keypad dispatch service.
//!
//! This is the main entry point for the Keydeck daemon, which reads raw
//! reports from the keypad, runs them through the dispatch engine, and
//! serves control clients over a Unix socket.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod actions;
mod config;
mod server;
mod signals;

use keydeck_core::{Collaborators, Engine, PacketOutcome, Signature};
use keydeck_db::Database;
use keydeck_hid::device::{KEYPAD_PID, KEYPAD_VID, is_keypad_connected};
use keydeck_hid::{DeviceEvent, SystemAudio, spawn_reader};
use keydeck_ipc::{
    DeviceConnectedData, Event, EventType, IpcServer, Response, UnknownSignalData, socket_path,
};

/// How often the engine's single-shot timers are driven.
const TICK_INTERVAL: Duration = Duration::from_millis(100);
/// Buffered packets between the blocking reader and the event loop.
const PACKET_CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("keydeck=info".parse()?)
                .add_directive("keydeck_daemon=debug".parse()?),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Keydeck daemon");

    // Load configuration
    let config = config::load_config()?;
    info!("Configuration loaded");

    // Open database and load persisted state
    let db = match &config.database.path {
        Some(path) => Database::open_at(path.clone()),
        None => Database::open(),
    }
    .context("Failed to open database")?;

    let table = db.load_table().context("Failed to load binding table")?;
    let active_layer = db.load_active_layer().context("Failed to load active layer")?;
    info!(%active_layer, "Binding table loaded");

    // Start IPC server
    let socket = socket_path();
    info!(?socket, "Starting IPC server");
    let (ipc_server, mut request_rx) =
        IpcServer::bind(&socket).await.context("Failed to start IPC server")?;
    let event_tx = ipc_server.event_sender();
    let ipc_handle = tokio::spawn(async move {
        ipc_server.run().await;
    });

    // Build the engine around live collaborators
    let collab = Collaborators {
        audio: Box::new(SystemAudio::new()),
        injector: Box::new(actions::XdotoolInjector),
        process: Box::new(actions::ProgramLauncher),
        overlay: Box::new(actions::IpcOverlay::new(event_tx.clone())),
        store: Box::new(actions::DbStore::new(db)),
    };
    let mut engine = Engine::new(config.engine.to_engine_config(), table, active_layer, collab);

    // Start the device reader
    let mut device_rx = spawn_reader(PACKET_CHANNEL_CAPACITY);
    let mut device_connected = is_keypad_connected();
    if !device_connected {
        warn!("Keypad not connected; waiting for it to appear");
    }

    // Set up signal handling
    let mut shutdown_rx = signals::setup_signal_handlers()?;
    let mut tick = tokio::time::interval(TICK_INTERVAL);

    info!("Daemon running");

    // Main event loop: device packets, IPC requests, and timers are
    // serialized here, so the engine needs no internal locking.
    loop {
        tokio::select! {
            Some(event) = device_rx.recv() => {
                match event {
                    DeviceEvent::Connected => {
                        info!("Keypad connected");
                        device_connected = true;
                        let _ = event_tx.send(Event::new(
                            EventType::DeviceConnected,
                            DeviceConnectedData { vendor_id: KEYPAD_VID, product_id: KEYPAD_PID },
                        ));
                    }

                    DeviceEvent::Disconnected => {
                        warn!("Keypad disconnected");
                        device_connected = false;
                        let _ = event_tx.send(Event::new(
                            EventType::DeviceDisconnected,
                            serde_json::json!({}),
                        ));
                    }

                    DeviceEvent::Packet(bytes) => {
                        // Dispatch may shell out to amixer/pactl; keep the
                        // worker threads free while it does.
                        let outcome =
                            tokio::task::block_in_place(|| engine.on_packet(&bytes));
                        if let PacketOutcome::UnknownSignal { hint } = outcome {
                            let _ = event_tx.send(Event::new(
                                EventType::UnknownSignal,
                                UnknownSignalData {
                                    signature: Signature::from_packet(&bytes).as_str().to_string(),
                                    hint: hint.map(str::to_string),
                                },
                            ));
                        }
                    }
                }
            }

            // Handle IPC requests
            Some((client_id, request, response_tx)) = request_rx.recv() => {
                server::trace_request(client_id, &request.method);
                let outcome = tokio::task::block_in_place(|| {
                    server::handle_request(&mut engine, device_connected, &request.method)
                });
                let response = Response { id: request.id, result: outcome.response };
                let _ = response_tx.send(response).await;

                if outcome.shutdown {
                    break;
                }
            }

            // Drive the OSD auto-clear timer
            _ = tick.tick() => {
                engine.tick(Instant::now());
            }

            // Handle shutdown signal
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down...");
    ipc_handle.abort();
    info!("Keydeck daemon stopped");
    Ok(())
}
