//! System audio control via amixer and pactl.
//!
//! Mic mute goes through the ALSA mixer; output-device cycling and
//! per-application volume go through PulseAudio/PipeWire's pactl. Plain
//! subprocess calls keep the daemon free of native audio bindings.

use std::process::Command;

use tracing::{debug, warn};

use keydeck_core::action::VolumeDirection;
use keydeck_core::collab::AudioControl;
use keydeck_core::error::{Error, Result};

/// Subprocess-backed implementation of [`AudioControl`].
pub struct SystemAudio;

impl SystemAudio {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn run(program: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::Audio(format!("{program} failed to start: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Audio(format!("{program} failed: {stderr}")));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// PID of the currently focused window, via xdotool.
    fn active_window_pid() -> Result<u32> {
        let stdout = Self::run("xdotool", &["getactivewindow", "getwindowpid"])?;
        stdout
            .trim()
            .parse()
            .map_err(|_| Error::Audio(format!("unexpected xdotool output: {stdout}")))
    }
}

impl Default for SystemAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioControl for SystemAudio {
    fn toggle_mic_mute(&mut self) -> Result<bool> {
        let stdout = Self::run("amixer", &["set", "Capture", "toggle"])?;
        let muted = parse_mute_state(&stdout)
            .ok_or_else(|| Error::Audio("could not parse amixer mute state".into()))?;
        debug!(muted, "Mic mute toggled");
        Ok(muted)
    }

    fn cycle_output_device(&mut self) -> Result<Option<String>> {
        let current = Self::run("pactl", &["get-default-sink"])?.trim().to_string();
        let listing = Self::run("pactl", &["list", "short", "sinks"])?;
        let sinks = parse_sink_names(&listing);

        let Some(next) = next_sink(&current, &sinks) else {
            debug!("Only one output sink; nothing to cycle to");
            return Ok(None);
        };

        Self::run("pactl", &["set-default-sink", &next])?;
        debug!(sink = %next, "Default output switched");
        Ok(Some(next))
    }

    /// Needs three subprocess round trips, so the work runs on a
    /// short-lived background thread; failures surface in its log.
    fn adjust_active_window_volume(&mut self, direction: VolumeDirection, step: u8) -> Result<()> {
        std::thread::spawn(move || {
            if let Err(e) = adjust_stream_volume(direction, step) {
                warn!(error = %e, "Active-window volume adjustment failed");
            }
        });
        Ok(())
    }
}

fn adjust_stream_volume(direction: VolumeDirection, step: u8) -> Result<()> {
    let pid = SystemAudio::active_window_pid()?;
    let listing = SystemAudio::run("pactl", &["list", "sink-inputs"])?;

    let Some(index) = find_sink_input_for_pid(&listing, pid) else {
        warn!(pid, "Focused window has no audio stream");
        return Ok(());
    };

    let delta = match direction {
        VolumeDirection::Up => format!("+{step}%"),
        VolumeDirection::Down => format!("-{step}%"),
    };
    SystemAudio::run("pactl", &["set-sink-input-volume", &index.to_string(), &delta])?;
    debug!(pid, index, %delta, "Stream volume adjusted");
    Ok(())
}

/// Mute state from amixer output: `[off]` means muted.
fn parse_mute_state(stdout: &str) -> Option<bool> {
    if stdout.contains("[off]") {
        Some(true)
    } else if stdout.contains("[on]") {
        Some(false)
    } else {
        None
    }
}

/// Sink names from `pactl list short sinks` (index, name, driver, ...).
fn parse_sink_names(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

/// The sink after `current`, wrapping around. `None` when there is nothing
/// to switch to.
fn next_sink(current: &str, sinks: &[String]) -> Option<String> {
    if sinks.len() < 2 {
        return None;
    }
    let position = sinks.iter().position(|name| name == current)?;
    Some(sinks[(position + 1) % sinks.len()].clone())
}

/// Sink-input index owned by `pid`, from `pactl list sink-inputs` output.
fn find_sink_input_for_pid(listing: &str, pid: u32) -> Option<u32> {
    let mut current_index = None;

    for line in listing.lines() {
        let line = line.trim();
        if let Some(index) = line.strip_prefix("Sink Input #") {
            current_index = index.parse().ok();
        } else if line.starts_with("application.process.id")
            && line.contains(&format!("\"{pid}\""))
        {
            return current_index;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mute_state() {
        assert_eq!(parse_mute_state("Front Left: Capture 65536 [100%] [on]"), Some(false));
        assert_eq!(parse_mute_state("Front Left: Capture 65536 [100%] [off]"), Some(true));
        assert_eq!(parse_mute_state("garbage"), None);
    }

    #[test]
    fn test_parse_sink_names() {
        let listing = "0\talsa_output.usb-0.analog-stereo\tPipeWire\ts32le 2ch 48000Hz\tRUNNING\n\
                       1\talsa_output.pci-0000_00_1f.3.analog-stereo\tPipeWire\ts32le 2ch 48000Hz\tIDLE\n";
        assert_eq!(
            parse_sink_names(listing),
            vec![
                "alsa_output.usb-0.analog-stereo",
                "alsa_output.pci-0000_00_1f.3.analog-stereo"
            ]
        );
    }

    #[test]
    fn test_next_sink_wraps() {
        let sinks = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(next_sink("a", &sinks), Some("b".into()));
        assert_eq!(next_sink("c", &sinks), Some("a".into()));
    }

    #[test]
    fn test_next_sink_single_device() {
        let sinks = vec!["only".to_string()];
        assert_eq!(next_sink("only", &sinks), None);
    }

    #[test]
    fn test_next_sink_unknown_current() {
        let sinks = vec!["a".to_string(), "b".to_string()];
        assert_eq!(next_sink("gone", &sinks), None);
    }

    #[test]
    fn test_find_sink_input_for_pid() {
        let listing = r#"
Sink Input #42
        Driver: PipeWire
        Properties:
                application.name = "Firefox"
                application.process.id = "1234"

Sink Input #57
        Driver: PipeWire
        Properties:
                application.name = "mpv"
                application.process.id = "5678"
"#;
        assert_eq!(find_sink_input_for_pid(listing, 5678), Some(57));
        assert_eq!(find_sink_input_for_pid(listing, 1234), Some(42));
        assert_eq!(find_sink_input_for_pid(listing, 9999), None);
    }
}
