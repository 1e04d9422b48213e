//! Bound actions and their payload types.

use serde::{Deserialize, Serialize};

use crate::table::Layer;

/// Media key kinds forwarded to the keystroke injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKeyKind {
    PlayPause,
    NextTrack,
    PreviousTrack,
    Stop,
    VolumeUp,
    VolumeDown,
    Mute,
}

/// Direction for active-window volume adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeDirection {
    Up,
    Down,
}

/// The action executed when a binding's trigger matches.
///
/// Every variant carries its payload explicitly; there are no
/// magic integer codes anywhere in the engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "params")]
pub enum Action {
    /// No action bound; the slot is still a valid match target.
    #[default]
    None,
    /// Switch the active layer.
    LayerJump { target: Layer },
    /// Toggle microphone mute; the resulting state feeds the OSD highlight.
    MicMuteToggle,
    /// Inject a media key press.
    MediaKey { key: MediaKeyKind },
    /// Adjust the volume of the focused application's audio stream.
    ActiveWindowVolume { direction: VolumeDirection },
    /// Launch (or focus) a program.
    RunProgram { path: String, icon: Option<String> },
    /// Type a text macro, optionally via the clipboard.
    TextMacro { text: String, use_clipboard: bool },
    /// Cycle to the next audio output device.
    AudioDeviceCycle,
    /// Cycle the on-screen display mode.
    OsdModeCycle,
}

impl Action {
    /// Whether dispatching this action has a side effect beyond state.
    #[must_use]
    pub fn has_side_effect(&self) -> bool {
        !matches!(self, Self::None | Self::LayerJump { .. })
    }
}
