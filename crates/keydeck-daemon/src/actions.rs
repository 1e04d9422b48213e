//! Collaborator implementations backing the engine's side effects.
//!
//! Key injection and program launching shell out to desktop tools; the
//! overlay forwards everything to IPC clients; persistence wraps the
//! SQLite database.

use std::process::Command;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use keydeck_core::action::MediaKeyKind;
use keydeck_core::collab::{KeyInjector, Overlay, Persistence, ProcessControl};
use keydeck_core::error::{Error, Result};
use keydeck_core::signature::Signature;
use keydeck_core::table::{BindingTable, Layer, Slot};
use keydeck_db::Database;
use keydeck_ipc::{
    Event, EventType, FeedbackData, LayerChangedData, MappingConfirmedData, SlotHighlightedData,
};

/// Keystroke injection via xdotool.
///
/// Typing a long macro takes seconds, far too long to run inline with
/// packet processing, so the subprocess work happens on a short-lived
/// background thread and failures surface in its log.
pub struct XdotoolInjector;

fn run_xdotool(args: &[&str]) -> Result<()> {
    let output = Command::new("xdotool")
        .args(args)
        .output()
        .map_err(|e| Error::Injection(format!("xdotool failed to start: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Injection(format!("xdotool failed: {stderr}")));
    }
    Ok(())
}

fn inject_text(text: &str, use_clipboard: bool) -> Result<()> {
    if use_clipboard {
        // Long macros paste much faster than they type
        let mut child = Command::new("xclip")
            .args(["-selection", "clipboard"])
            .stdin(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| Error::Injection(format!("xclip failed to start: {e}")))?;

        if let Some(stdin) = child.stdin.take() {
            use std::io::Write;
            let mut stdin = stdin;
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| Error::Injection(format!("xclip write failed: {e}")))?;
        }
        child.wait().map_err(|e| Error::Injection(format!("xclip failed: {e}")))?;

        run_xdotool(&["key", "--clearmodifiers", "ctrl+v"])
    } else {
        run_xdotool(&["type", "--delay", "12", "--", text])
    }
}

fn spawn_injection(task: impl FnOnce() -> Result<()> + Send + 'static) {
    std::thread::spawn(move || {
        if let Err(e) = task() {
            warn!(error = %e, "Key injection failed");
        }
    });
}

impl KeyInjector for XdotoolInjector {
    fn send_text(&mut self, text: &str, use_clipboard: bool) -> Result<()> {
        let text = text.to_string();
        spawn_injection(move || inject_text(&text, use_clipboard));
        Ok(())
    }

    fn send_media_key(&mut self, key: MediaKeyKind) -> Result<()> {
        spawn_injection(move || run_xdotool(&["key", media_key_name(key)]));
        Ok(())
    }
}

/// The X11 keysym for a media key.
#[must_use]
pub fn media_key_name(key: MediaKeyKind) -> &'static str {
    match key {
        MediaKeyKind::PlayPause => "XF86AudioPlay",
        MediaKeyKind::NextTrack => "XF86AudioNext",
        MediaKeyKind::PreviousTrack => "XF86AudioPrev",
        MediaKeyKind::Stop => "XF86AudioStop",
        MediaKeyKind::VolumeUp => "XF86AudioRaiseVolume",
        MediaKeyKind::VolumeDown => "XF86AudioLowerVolume",
        MediaKeyKind::Mute => "XF86AudioMute",
    }
}

/// Fire-and-forget program launching.
pub struct ProgramLauncher;

impl ProcessControl for ProgramLauncher {
    fn run_or_focus<'a>(&mut self, path: &str, _icon: Option<&'a str>) -> Result<()> {
        // The spawned program outlives the dispatch; its exit status is not
        // our concern.
        Command::new(path)
            .spawn()
            .map_err(|e| Error::Process(format!("failed to launch {path}: {e}")))?;
        debug!(path, "Program launched");
        Ok(())
    }
}

/// Overlay that forwards engine notifications to IPC clients.
///
/// Broadcasting never fails from the engine's point of view; with no
/// clients connected the events simply go nowhere.
pub struct IpcOverlay {
    event_tx: broadcast::Sender<Event>,
}

impl IpcOverlay {
    #[must_use]
    pub fn new(event_tx: broadcast::Sender<Event>) -> Self {
        Self { event_tx }
    }

    fn emit(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }
}

impl Overlay for IpcOverlay {
    fn highlight_slot(&mut self, slot: Slot, mic_muted: Option<bool>) {
        self.emit(Event::new(
            EventType::SlotHighlighted,
            SlotHighlightedData { slot: slot.value(), mic_muted },
        ));
    }

    fn clear_highlight(&mut self) {
        self.emit(Event::new(EventType::HighlightCleared, serde_json::json!({})));
    }

    fn update_layer_display(&mut self, layer: Layer) {
        self.emit(Event::new(EventType::LayerChanged, LayerChangedData { layer: layer.value() }));
    }

    fn show_feedback<'a>(&mut self, text: &str, icon: Option<&'a str>, slot: Option<Slot>) {
        self.emit(Event::new(
            EventType::Feedback,
            FeedbackData {
                text: text.to_string(),
                icon: icon.map(str::to_string),
                slot: slot.map(Slot::value),
            },
        ));
    }

    fn reset_feedback_log(&mut self) {
        self.emit(Event::new(EventType::FeedbackLogCleared, serde_json::json!({})));
    }

    fn confirm_mapping(&mut self, signature: &Signature) {
        self.emit(Event::new(
            EventType::MappingConfirmed,
            MappingConfirmedData { signature: signature.as_str().to_string() },
        ));
    }

    fn refresh_bindings(&mut self) {
        self.emit(Event::new(EventType::BindingsChanged, serde_json::json!({})));
    }

    fn cycle_osd_mode(&mut self) {
        self.emit(Event::new(EventType::OsdModeCycled, serde_json::json!({})));
    }
}

/// Persistence backed by the SQLite database.
pub struct DbStore {
    db: Database,
}

impl DbStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl Persistence for DbStore {
    fn save_table(&mut self, table: &BindingTable) -> Result<()> {
        self.db.save_table(table).map_err(|e| Error::Persistence(e.to_string()))
    }

    fn save_active_layer(&mut self, layer: Layer) -> Result<()> {
        if let Err(e) = self.db.log_event("info", "engine", "layer_changed", None) {
            warn!(error = %e, "Event log write failed");
        }
        self.db.save_active_layer(layer).map_err(|e| Error::Persistence(e.to_string()))
    }
}
