//! Keydeck IPC - Unix socket protocol and client library.
//!
//! This crate defines the communication protocol between the daemon and
//! control clients, as well as providing a client library for connecting
//! to the daemon.

pub mod client;
pub mod error;
pub mod events;
pub mod messages;
pub mod server;

pub use client::IpcClient;
pub use error::{IpcError, IpcResult};
pub use events::{
    CandidateAddedData, DeviceConnectedData, Event, EventType, FeedbackData, LayerChangedData,
    MappingConfirmedData, SlotHighlightedData, UnknownSignalData,
};
pub use messages::{ErrorInfo, Method, Request, Response};
pub use server::{IncomingRequest, IpcServer};

use std::path::PathBuf;

/// Get the default socket path.
///
/// Uses `$XDG_RUNTIME_DIR/keydeck/daemon.sock` or falls back to
/// `/run/user/$UID/keydeck/daemon.sock`.
#[must_use]
#[allow(unsafe_code)] // libc::getuid() is safe to call
pub fn socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir).join("keydeck/daemon.sock")
    } else {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/run/user/{uid}/keydeck/daemon.sock"))
    }
}
