//! Collaborator contracts for side effects outside the core.
//!
//! The engine owns matching and state; everything it asks the host system
//! to do goes through these traits. Implementations live in the daemon and
//! hid crates; tests substitute mocks.

use crate::action::{MediaKeyKind, VolumeDirection};
use crate::error::Result;
use crate::signature::Signature;
use crate::table::{BindingTable, Layer, Slot};

/// Audio control: mic mute, output device cycling, per-app volume.
#[cfg_attr(test, mockall::automock)]
pub trait AudioControl {
    /// Toggle microphone mute, returning the new muted state.
    fn toggle_mic_mute(&mut self) -> Result<bool>;

    /// Switch to the next audio output device.
    ///
    /// Returns the new device's name, used to rename the bound slot.
    fn cycle_output_device(&mut self) -> Result<Option<String>>;

    /// Adjust the focused application's stream volume by `step` percent.
    fn adjust_active_window_volume(&mut self, direction: VolumeDirection, step: u8) -> Result<()>;
}

/// Keystroke and macro injection.
#[cfg_attr(test, mockall::automock)]
pub trait KeyInjector {
    /// Type a text macro, optionally via the clipboard.
    fn send_text(&mut self, text: &str, use_clipboard: bool) -> Result<()>;

    /// Inject a media key press.
    fn send_media_key(&mut self, key: MediaKeyKind) -> Result<()>;
}

/// Process launching.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessControl {
    /// Launch a program, or focus it if the desktop already runs it.
    fn run_or_focus<'a>(&mut self, path: &str, icon: Option<&'a str>) -> Result<()>;
}

/// Overlay/UI notifications. Fire-and-forget; rendering failures are the
/// overlay's problem, never the engine's.
#[cfg_attr(test, mockall::automock)]
pub trait Overlay {
    /// Highlight a slot on the OSD, with the mic-mute state if one was
    /// produced by this dispatch.
    fn highlight_slot(&mut self, slot: Slot, mic_muted: Option<bool>);

    /// Clear the current slot highlight.
    fn clear_highlight(&mut self);

    /// The active layer changed.
    fn update_layer_display(&mut self, layer: Layer);

    /// Free-form feedback line for the visible log.
    fn show_feedback<'a>(&mut self, text: &str, icon: Option<&'a str>, slot: Option<Slot>);

    /// Reset the visible feedback log; a new capture run starts clean.
    fn reset_feedback_log(&mut self);

    /// A detection run assigned this signature.
    fn confirm_mapping(&mut self, signature: &Signature);

    /// The binding table changed; re-read it.
    fn refresh_bindings(&mut self);

    /// Cycle the on-screen display mode.
    fn cycle_osd_mode(&mut self);
}

/// Persistence of the binding table and last-used layer.
#[cfg_attr(test, mockall::automock)]
pub trait Persistence {
    /// Save the whole table after a mutating operation.
    fn save_table(&mut self, table: &BindingTable) -> Result<()>;

    /// Save the active layer as "last used".
    fn save_active_layer(&mut self, layer: Layer) -> Result<()>;
}

/// The full set of collaborators handed to the engine.
pub struct Collaborators {
    pub audio: Box<dyn AudioControl + Send>,
    pub injector: Box<dyn KeyInjector + Send>,
    pub process: Box<dyn ProcessControl + Send>,
    pub overlay: Box<dyn Overlay + Send>,
    pub store: Box<dyn Persistence + Send>,
}
