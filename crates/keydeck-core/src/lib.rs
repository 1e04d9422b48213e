//! Keydeck Core - Signature extraction, binding table, and dispatch engine.
//!
//! This crate contains the hardware-independent domain logic shared between
//! the daemon and other components. It never touches a device or a socket;
//! side effects go through the collaborator traits in [`collab`].

pub mod action;
pub mod collab;
pub mod config;
pub mod debounce;
pub mod detect;
pub mod engine;
pub mod error;
pub mod history;
pub mod protocol;
pub mod signature;
pub mod table;

pub use action::{Action, MediaKeyKind, VolumeDirection};
pub use collab::{AudioControl, Collaborators, KeyInjector, Overlay, Persistence, ProcessControl};
pub use config::EngineConfig;
pub use detect::{Candidate, DetectOutcome, DetectState};
pub use engine::{Engine, PacketOutcome};
pub use error::{Error, Result};
pub use signature::Signature;
pub use table::{Binding, BindingTable, Layer, Slot, LAYER_COUNT, SLOT_COUNT};
