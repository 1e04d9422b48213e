//! Keydeck HID - macro keypad transport and system audio control.
//!
//! This crate owns everything that touches hardware: finding and reading
//! the keypad's vendor HID interface, and the subprocess-backed audio
//! control used by the dispatch engine.

pub mod audio;
pub mod device;
pub mod error;
pub mod reader;

pub use audio::SystemAudio;
pub use error::{HidError, HidResult};
pub use reader::{DeviceEvent, spawn_reader};
