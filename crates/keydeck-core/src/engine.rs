//! The dispatch engine: decode, match, execute, layer-sync.
//!
//! Packets arrive one at a time through [`Engine::on_packet`] and are
//! processed to completion before the next is delivered. The engine owns
//! the binding table, the active layer, the detection state machine, and
//! the rolling packet history; everything with a side effect outside this
//! state goes through the collaborator traits.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::action::Action;
use crate::collab::Collaborators;
use crate::config::EngineConfig;
use crate::debounce::Debounce;
use crate::detect::{Candidate, DetectOutcome, DetectState};
use crate::error::{Error, Result};
use crate::history::PacketHistory;
use crate::protocol;
use crate::signature::{self, Signature};
use crate::table::{BindingTable, Layer, Slot};

/// What the engine did with one raw packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Zero-length frame; dropped silently.
    Dropped,
    /// Device noise; never logged, never matched.
    Noise,
    /// Keep-alive/background frame, logged distinctly from unknowns.
    KeepAlive,
    /// Hardware layer-sync notification. `applied` is false when the
    /// notification fell inside the debounce quiet window.
    LayerSync { layer: Layer, applied: bool },
    /// An active capture mode consumed the packet.
    Detection(DetectOutcome),
    /// Dispatch matched the binding at (layer, slot).
    Matched { layer: Layer, slot: Slot },
    /// No binding matched anywhere.
    UnknownSignal { hint: Option<&'static str> },
}

/// The decode → match → dispatch → layer-sync engine.
pub struct Engine {
    config: EngineConfig,
    table: BindingTable,
    active_layer: Layer,
    detect: DetectState,
    history: PacketHistory,
    sync_guard: Debounce,
    osd_clear_at: Option<Instant>,
    collab: Collaborators,
}

impl Engine {
    /// Build an engine around a loaded table and last-used layer.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        table: BindingTable,
        active_layer: Layer,
        collab: Collaborators,
    ) -> Self {
        let history = PacketHistory::new(config.history_capacity);
        let sync_guard = Debounce::new(config.sync_debounce);
        Self {
            config,
            table,
            active_layer,
            detect: DetectState::Idle,
            history,
            sync_guard,
            osd_clear_at: None,
            collab,
        }
    }

    /// The binding table.
    #[must_use]
    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    /// The layer currently in effect.
    #[must_use]
    pub fn active_layer(&self) -> Layer {
        self.active_layer
    }

    /// Whether a capture mode is active.
    #[must_use]
    pub fn is_detecting(&self) -> bool {
        self.detect.is_active()
    }

    /// ManualDetect candidates collected so far.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        self.detect.candidates()
    }

    /// Process one raw packet from the transport.
    pub fn on_packet(&mut self, packet: &[u8]) -> PacketOutcome {
        self.process_at(packet, Instant::now())
    }

    /// Process one raw packet at an explicit instant.
    pub fn process_at(&mut self, packet: &[u8], now: Instant) -> PacketOutcome {
        if packet.is_empty() {
            return PacketOutcome::Dropped;
        }
        if signature::is_noise(packet) {
            return PacketOutcome::Noise;
        }

        self.history.record(now, signature::marker(packet));

        if let Some(layer) = protocol::parse_layer_notification(packet) {
            return self.request_layer_change(layer, now);
        }

        if signature::is_keepalive(packet) {
            debug!(hex = %signature::hex_string(packet), "background keep-alive frame");
            return PacketOutcome::KeepAlive;
        }

        if self.detect.is_active() {
            return self.feed_detection(packet);
        }

        self.dispatch(packet, now)
    }

    /// Drive the single-shot timers (OSD highlight auto-clear).
    pub fn tick(&mut self, now: Instant) {
        if self.osd_clear_at.is_some_and(|at| now >= at) {
            self.osd_clear_at = None;
            self.collab.overlay.clear_highlight();
        }
    }

    /// Begin instant capture for a pre-selected target slot.
    pub fn start_auto_detect(&mut self, layer: Layer, slot: Slot) {
        self.start_auto_detect_at(layer, slot, Instant::now());
    }

    /// Begin instant capture, snapshotting the ignore set as of `now`.
    pub fn start_auto_detect_at(&mut self, layer: Layer, slot: Slot, now: Instant) {
        let ignored = self.history.markers_within(now, self.config.detect_ignore_window);
        info!(%layer, %slot, ignored = ignored.len(), "auto-detect started");
        self.detect.start_auto(layer, slot, ignored);
    }

    /// Begin list-mode capture. The overlay's feedback log starts clean.
    pub fn start_manual_detect(&mut self) {
        info!("manual detect started");
        self.detect.start_manual(self.config.candidate_cap);
        self.collab.overlay.reset_feedback_log();
        self.collab.overlay.show_feedback("Listening for key signals", None, None);
    }

    /// Leave any capture mode.
    pub fn stop_detect(&mut self) {
        if self.detect.is_active() {
            info!("detection stopped");
        }
        self.detect.stop();
    }

    /// Assign a ManualDetect candidate to a slot and leave the mode.
    pub fn pick_candidate(&mut self, index: usize, layer: Layer, slot: Slot) -> Result<()> {
        let candidate =
            self.detect.candidates().get(index).ok_or(Error::NoSuchCandidate(index))?;
        let signature = candidate.signature.clone();
        self.detect.stop();
        self.apply_assignment(layer, slot, signature.clone());
        self.collab.overlay.confirm_mapping(&signature);
        Ok(())
    }

    /// Assign a trigger to (layer, slot), persisting and refreshing the UI.
    pub fn assign(&mut self, layer: Layer, slot: Slot, signature: Signature) {
        self.apply_assignment(layer, slot, signature);
    }

    /// Reset (layer, slot) to its default unbound state.
    pub fn unmap(&mut self, layer: Layer, slot: Slot) {
        self.table.unmap(layer, slot);
        self.persist_table();
        self.collab.overlay.refresh_bindings();
    }

    /// Change the action bound at (layer, slot).
    pub fn set_action(&mut self, layer: Layer, slot: Slot, action: Action) {
        self.table.get_mut(layer, slot).action = action;
        self.persist_table();
        self.collab.overlay.refresh_bindings();
    }

    /// Explicit user-driven layer switch.
    pub fn set_active_layer(&mut self, layer: Layer) {
        if layer != self.active_layer {
            self.switch_layer(layer);
        }
    }

    fn feed_detection(&mut self, packet: &[u8]) -> PacketOutcome {
        let Some(outcome) = self.detect.handle_packet(packet) else {
            return PacketOutcome::Dropped;
        };
        match &outcome {
            DetectOutcome::Captured { layer, slot, signature } => {
                let (layer, slot, signature) = (*layer, *slot, signature.clone());
                info!(%layer, %slot, signature = %signature, "signal captured");
                self.apply_assignment(layer, slot, signature.clone());
                self.collab.overlay.confirm_mapping(&signature);
            }
            DetectOutcome::CandidateAdded(n) => {
                let text = format!("Candidate {n}: {}", Signature::from_packet(packet));
                self.collab.overlay.show_feedback(&text, None, None);
            }
            DetectOutcome::Background => {
                debug!(hex = %signature::hex_string(packet), "background frame during detection");
            }
            DetectOutcome::CandidatesFull => {
                debug!("candidate list full; packet not collected");
            }
        }
        PacketOutcome::Detection(outcome)
    }

    fn dispatch(&mut self, packet: &[u8], now: Instant) -> PacketOutcome {
        let sig = Signature::from_packet(packet);

        // Current layer first, then all layers. The fallback recovers from
        // a layer desync between host and device; it assumes physically
        // identical signatures never coexist across layers for different
        // purposes.
        let matched = self
            .table
            .find_in_layer(self.active_layer, &sig)
            .map(|slot| (self.active_layer, slot))
            .or_else(|| self.table.find_any(&sig));

        let Some((layer, slot)) = matched else {
            let hint = signature::is_key_up(packet).then_some("(Key Up?)");
            info!(
                layer = %self.active_layer,
                signature = %sig,
                hex = %signature::hex_string(packet),
                hint = hint.unwrap_or_default(),
                "unknown signal"
            );
            return PacketOutcome::UnknownSignal { hint };
        };

        let action = self.table.get(layer, slot).action.clone();

        // Explicit jump wins; otherwise a match from a non-active layer
        // means the device is physically on that layer already.
        let next_layer = match action {
            Action::LayerJump { target } => target,
            _ if layer != self.active_layer => layer,
            _ => self.active_layer,
        };

        let mic_state = self.execute(&action, layer, slot);

        if next_layer != self.active_layer {
            self.switch_layer(next_layer);
        }

        self.collab.overlay.highlight_slot(slot, mic_state);
        self.osd_clear_at = Some(now + self.config.osd_highlight);

        info!(%layer, %slot, signature = %sig, hex = %signature::hex_string(packet), "dispatched");
        PacketOutcome::Matched { layer, slot }
    }

    /// Execute an action's side effect. Collaborator failures are logged
    /// and leave the table and active layer untouched.
    fn execute(&mut self, action: &Action, layer: Layer, slot: Slot) -> Option<bool> {
        let mut mic_state = None;
        match action {
            Action::None | Action::LayerJump { .. } => {}

            Action::MicMuteToggle => match self.collab.audio.toggle_mic_mute() {
                Ok(muted) => mic_state = Some(muted),
                Err(e) => warn!(error = %e, "mic mute toggle failed"),
            },

            Action::MediaKey { key } => {
                if let Err(e) = self.collab.injector.send_media_key(*key) {
                    warn!(error = %e, "media key injection failed");
                }
            }

            Action::ActiveWindowVolume { direction } => {
                let step = self.config.volume_step;
                if let Err(e) = self.collab.audio.adjust_active_window_volume(*direction, step) {
                    warn!(error = %e, "active-window volume adjustment failed");
                }
            }

            Action::RunProgram { path, icon } => {
                if let Err(e) = self.collab.process.run_or_focus(path, icon.as_deref()) {
                    warn!(error = %e, path = %path, "program launch failed");
                }
            }

            Action::TextMacro { text, use_clipboard } => {
                if let Err(e) = self.collab.injector.send_text(text, *use_clipboard) {
                    warn!(error = %e, "text macro injection failed");
                }
            }

            Action::AudioDeviceCycle => match self.collab.audio.cycle_output_device() {
                Ok(Some(name)) => {
                    info!(device = %name, "audio output switched");
                    self.table.get_mut(layer, slot).display_name = name;
                    self.persist_table();
                    self.collab.overlay.refresh_bindings();
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "audio device cycle failed"),
            },

            Action::OsdModeCycle => self.collab.overlay.cycle_osd_mode(),
        }
        mic_state
    }

    fn request_layer_change(&mut self, layer: Layer, now: Instant) -> PacketOutcome {
        if !self.sync_guard.try_apply(now) {
            debug!(%layer, "layer notification dropped inside quiet window");
            return PacketOutcome::LayerSync { layer, applied: false };
        }
        if layer != self.active_layer {
            self.switch_layer(layer);
        }
        PacketOutcome::LayerSync { layer, applied: true }
    }

    fn switch_layer(&mut self, layer: Layer) {
        self.active_layer = layer;
        if let Err(e) = self.collab.store.save_active_layer(layer) {
            warn!(error = %e, "failed to persist active layer");
        }
        self.collab.overlay.update_layer_display(layer);
        info!(%layer, "active layer changed");
    }

    fn apply_assignment(&mut self, layer: Layer, slot: Slot, signature: Signature) {
        self.table.assign(layer, slot, signature);
        self.persist_table();
        self.collab.overlay.refresh_bindings();
    }

    fn persist_table(&mut self) {
        if let Err(e) = self.collab.store.save_table(&self.table) {
            warn!(error = %e, "failed to persist binding table");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{
        MockAudioControl, MockKeyInjector, MockOverlay, MockPersistence, MockProcessControl,
    };
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn layer(v: u8) -> Layer {
        Layer::new(v).unwrap()
    }

    fn slot(v: u8) -> Slot {
        Slot::new(v).unwrap()
    }

    /// A 16-byte press frame whose signature is determined by `key`.
    fn key_packet(key: u8) -> Vec<u8> {
        let mut p = vec![0u8; 16];
        p[0] = 0x03;
        p[8] = key;
        p[10] = 0x01;
        p
    }

    fn sync_frame(target: u8) -> Vec<u8> {
        let mut frame = vec![0u8; protocol::SYNC_FRAME_LEN];
        frame[0] = protocol::SYNC_FRAME_HEADER;
        frame[protocol::SYNC_KIND_INDEX] = protocol::SYNC_KIND_NOTIFY;
        frame[protocol::SYNC_LAYER_INDEX] = target;
        frame
    }

    fn permissive_audio() -> MockAudioControl {
        let mut audio = MockAudioControl::new();
        audio.expect_toggle_mic_mute().returning(|| Ok(false));
        audio.expect_cycle_output_device().returning(|| Ok(None));
        audio.expect_adjust_active_window_volume().returning(|_, _| Ok(()));
        audio
    }

    fn permissive_injector() -> MockKeyInjector {
        let mut injector = MockKeyInjector::new();
        injector.expect_send_text().returning(|_, _| Ok(()));
        injector.expect_send_media_key().returning(|_| Ok(()));
        injector
    }

    fn permissive_process() -> MockProcessControl {
        let mut process = MockProcessControl::new();
        process.expect_run_or_focus().returning(|_, _| Ok(()));
        process
    }

    fn permissive_overlay() -> MockOverlay {
        let mut overlay = MockOverlay::new();
        overlay.expect_highlight_slot().returning(|_, _| ());
        overlay.expect_clear_highlight().returning(|| ());
        overlay.expect_update_layer_display().returning(|_| ());
        overlay.expect_show_feedback().returning(|_, _, _| ());
        overlay.expect_reset_feedback_log().returning(|| ());
        overlay.expect_confirm_mapping().returning(|_| ());
        overlay.expect_refresh_bindings().returning(|| ());
        overlay.expect_cycle_osd_mode().returning(|| ());
        overlay
    }

    fn permissive_store() -> MockPersistence {
        let mut store = MockPersistence::new();
        store.expect_save_table().returning(|_| Ok(()));
        store.expect_save_active_layer().returning(|_| Ok(()));
        store
    }

    fn collaborators() -> Collaborators {
        Collaborators {
            audio: Box::new(permissive_audio()),
            injector: Box::new(permissive_injector()),
            process: Box::new(permissive_process()),
            overlay: Box::new(permissive_overlay()),
            store: Box::new(permissive_store()),
        }
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig::default(), BindingTable::new(), Layer::default(), collaborators())
    }

    #[test]
    fn test_empty_packet_dropped_silently() {
        assert_eq!(engine().on_packet(&[]), PacketOutcome::Dropped);
    }

    #[test]
    fn test_noise_is_never_dispatched() {
        let mut engine = engine();
        let mut noise = key_packet(0x42);
        noise[0] = 0xC6;
        assert_eq!(engine.on_packet(&noise), PacketOutcome::Noise);
    }

    #[test]
    fn test_noise_never_becomes_candidate() {
        let mut engine = engine();
        engine.start_manual_detect();
        let mut noise = key_packet(0x42);
        noise[0] = 0xC6;
        assert_eq!(engine.on_packet(&noise), PacketOutcome::Noise);
        assert!(engine.candidates().is_empty());
    }

    #[test]
    fn test_payload_window_noise_never_becomes_candidate() {
        // A long report leading with the noise byte at the payload offset
        // would render a "C6 ..." signature; it must be filtered too.
        let mut engine = engine();
        engine.start_manual_detect();
        let noise = key_packet(0xC6);
        assert_eq!(engine.on_packet(&noise), PacketOutcome::Noise);
        assert!(engine.candidates().is_empty());
    }

    #[test]
    fn test_manual_detect_resets_feedback_log() {
        let mut overlay = MockOverlay::new();
        overlay.expect_reset_feedback_log().times(1).returning(|| ());
        overlay.expect_show_feedback().returning(|_, _, _| ());

        let mut engine = Engine::new(
            EngineConfig::default(),
            BindingTable::new(),
            Layer::default(),
            Collaborators {
                audio: Box::new(permissive_audio()),
                injector: Box::new(permissive_injector()),
                process: Box::new(permissive_process()),
                overlay: Box::new(overlay),
                store: Box::new(permissive_store()),
            },
        );

        engine.start_manual_detect();
        assert!(engine.is_detecting());
    }

    #[test]
    fn test_keepalive_logged_not_unknown() {
        let mut engine = engine();
        let mut packet = key_packet(0x42);
        packet[10] = 0xC3;
        assert_eq!(engine.on_packet(&packet), PacketOutcome::KeepAlive);
    }

    #[test]
    fn test_unknown_signal_with_key_up_hint() {
        let mut engine = engine();
        let packet = key_packet(0x81);
        assert_eq!(
            engine.on_packet(&packet),
            PacketOutcome::UnknownSignal { hint: Some("(Key Up?)") }
        );
        let packet = key_packet(0x42);
        assert_eq!(engine.on_packet(&packet), PacketOutcome::UnknownSignal { hint: None });
    }

    #[test]
    fn test_dispatch_tie_break_prefers_active_layer() {
        let mut engine = engine();
        let packet = key_packet(0x11);
        let sig = Signature::from_packet(&packet);

        // Same signature on a non-active layer (inert) and on the active
        // layer (jumps to layer 2). Current-layer-first must win, then the
        // jump switches layers; slot 5 must not also fire.
        engine.table.assign(layer(2), slot(5), sig.clone());
        engine.table.assign(layer(0), slot(9), sig);
        engine.table.get_mut(layer(0), slot(9)).action = Action::LayerJump { target: layer(2) };

        let outcome = engine.on_packet(&packet);
        assert_eq!(outcome, PacketOutcome::Matched { layer: layer(0), slot: slot(9) });
        assert_eq!(engine.active_layer(), layer(2));
    }

    #[test]
    fn test_cross_layer_fallback_syncs_active_layer() {
        let mut engine = engine();
        let packet = key_packet(0x23);
        engine.table.assign(layer(3), slot(2), Signature::from_packet(&packet));

        let outcome = engine.on_packet(&packet);
        assert_eq!(outcome, PacketOutcome::Matched { layer: layer(3), slot: slot(2) });
        assert_eq!(engine.active_layer(), layer(3));
    }

    /// Known limitation: the all-layer fallback cannot tell a desynced
    /// device apart from a same-signature binding that was created for a
    /// different purpose on another layer. The engine assumes identical
    /// signatures never coexist across layers and matches the first one.
    #[test]
    fn test_cross_layer_fallback_is_ambiguous_by_design() {
        let mut engine = engine();
        let packet = key_packet(0x55);
        let sig = Signature::from_packet(&packet);
        engine.table.assign(layer(1), slot(1), sig.clone());
        engine.table.assign(layer(4), slot(8), sig);

        // Layer order decides; the layer-1 binding wins even though the
        // device might actually be on layer 4.
        let outcome = engine.on_packet(&packet);
        assert_eq!(outcome, PacketOutcome::Matched { layer: layer(1), slot: slot(1) });
    }

    #[test]
    fn test_mic_mute_state_feeds_highlight() {
        let mut audio = MockAudioControl::new();
        audio.expect_toggle_mic_mute().times(1).returning(|| Ok(true));
        let mut overlay = MockOverlay::new();
        overlay
            .expect_highlight_slot()
            .withf(|s, mic| s.value() == 3 && *mic == Some(true))
            .times(1)
            .returning(|_, _| ());

        let mut engine = Engine::new(
            EngineConfig::default(),
            BindingTable::new(),
            Layer::default(),
            Collaborators {
                audio: Box::new(audio),
                injector: Box::new(permissive_injector()),
                process: Box::new(permissive_process()),
                overlay: Box::new(overlay),
                store: Box::new(permissive_store()),
            },
        );

        let packet = key_packet(0x31);
        engine.table.assign(layer(0), slot(3), Signature::from_packet(&packet));
        engine.table.get_mut(layer(0), slot(3)).action = Action::MicMuteToggle;

        assert_matches!(engine.on_packet(&packet), PacketOutcome::Matched { .. });
    }

    #[test]
    fn test_collaborator_failure_leaves_state_untouched() {
        let mut audio = MockAudioControl::new();
        audio
            .expect_toggle_mic_mute()
            .returning(|| Err(Error::Audio("device unavailable".into())));

        let mut engine = Engine::new(
            EngineConfig::default(),
            BindingTable::new(),
            Layer::default(),
            Collaborators {
                audio: Box::new(audio),
                injector: Box::new(permissive_injector()),
                process: Box::new(permissive_process()),
                overlay: Box::new(permissive_overlay()),
                store: Box::new(permissive_store()),
            },
        );

        let packet = key_packet(0x31);
        engine.table.assign(layer(0), slot(3), Signature::from_packet(&packet));
        engine.table.get_mut(layer(0), slot(3)).action = Action::MicMuteToggle;
        let before = engine.table.clone();

        assert_matches!(engine.on_packet(&packet), PacketOutcome::Matched { .. });
        assert_eq!(engine.table, before);
        assert_eq!(engine.active_layer(), layer(0));
    }

    #[test]
    fn test_audio_device_cycle_renames_slot() {
        let mut audio = MockAudioControl::new();
        audio.expect_cycle_output_device().times(1).returning(|| Ok(Some("USB Speakers".into())));
        let mut store = MockPersistence::new();
        store.expect_save_table().times(1).returning(|_| Ok(()));
        store.expect_save_active_layer().returning(|_| Ok(()));

        let mut engine = Engine::new(
            EngineConfig::default(),
            BindingTable::new(),
            Layer::default(),
            Collaborators {
                audio: Box::new(audio),
                injector: Box::new(permissive_injector()),
                process: Box::new(permissive_process()),
                overlay: Box::new(permissive_overlay()),
                store: Box::new(store),
            },
        );

        let packet = key_packet(0x44);
        engine.table.assign(layer(0), slot(7), Signature::from_packet(&packet));
        engine.table.get_mut(layer(0), slot(7)).action = Action::AudioDeviceCycle;

        engine.on_packet(&packet);
        assert_eq!(engine.table.get(layer(0), slot(7)).display_name, "USB Speakers");
    }

    #[test]
    fn test_layer_sync_debounce_timeline() {
        let mut engine = engine();
        let t0 = Instant::now();

        let outcome = engine.process_at(&sync_frame(1), t0);
        assert_eq!(outcome, PacketOutcome::LayerSync { layer: layer(1), applied: true });
        assert_eq!(engine.active_layer(), layer(1));

        let outcome = engine.process_at(&sync_frame(2), t0 + Duration::from_millis(100));
        assert_eq!(outcome, PacketOutcome::LayerSync { layer: layer(2), applied: false });
        assert_eq!(engine.active_layer(), layer(1));

        let outcome = engine.process_at(&sync_frame(3), t0 + Duration::from_millis(600));
        assert_eq!(outcome, PacketOutcome::LayerSync { layer: layer(3), applied: true });
        assert_eq!(engine.active_layer(), layer(3));
    }

    #[test]
    fn test_malformed_sync_frame_falls_through() {
        let mut engine = engine();
        let frame = sync_frame(9); // out-of-range layer
        assert_matches!(engine.on_packet(&frame), PacketOutcome::UnknownSignal { .. });
        assert_eq!(engine.active_layer(), layer(0));
    }

    #[test]
    fn test_auto_detect_ignore_set_scenario() {
        let mut engine = engine();
        let t0 = Instant::now();

        // A key with marker 0x05 was seen 300 ms before detection starts.
        let mut stale = key_packet(0x10);
        stale[10] = 0x05;
        engine.process_at(&stale, t0);

        let start = t0 + Duration::from_millis(300);
        engine.start_auto_detect_at(layer(1), slot(4), start);

        // The same marker must be background, not captured.
        let outcome = engine.process_at(&stale, start + Duration::from_millis(50));
        assert_eq!(outcome, PacketOutcome::Detection(DetectOutcome::Background));
        assert!(engine.is_detecting());

        // A fresh marker is captured and assigned.
        let mut fresh = key_packet(0x20);
        fresh[10] = 0x09;
        let outcome = engine.process_at(&fresh, start + Duration::from_millis(100));
        assert_matches!(outcome, PacketOutcome::Detection(DetectOutcome::Captured { .. }));
        assert!(!engine.is_detecting());
        assert_eq!(
            engine.table.get(layer(1), slot(4)).trigger,
            Some(Signature::from_packet(&fresh))
        );
    }

    #[test]
    fn test_pick_candidate_assigns_and_exits_mode() {
        let mut engine = engine();
        engine.start_manual_detect();
        engine.on_packet(&key_packet(0x61));
        engine.on_packet(&key_packet(0x62));

        let expected = engine.candidates()[1].signature.clone();
        engine.pick_candidate(1, layer(2), slot(6)).unwrap();

        assert!(!engine.is_detecting());
        assert_eq!(engine.table.get(layer(2), slot(6)).trigger, Some(expected));
    }

    #[test]
    fn test_pick_candidate_out_of_range() {
        let mut engine = engine();
        engine.start_manual_detect();
        assert_matches!(
            engine.pick_candidate(0, layer(0), slot(1)),
            Err(Error::NoSuchCandidate(0))
        );
    }

    #[test]
    fn test_osd_highlight_auto_clears() {
        // Only the expectations this scenario exercises; a permissive
        // clear_highlight expectation would absorb the counted call.
        let mut overlay = MockOverlay::new();
        overlay.expect_highlight_slot().returning(|_, _| ());
        overlay.expect_clear_highlight().times(1).returning(|| ());

        let mut engine = Engine::new(
            EngineConfig::default(),
            BindingTable::new(),
            Layer::default(),
            Collaborators {
                audio: Box::new(permissive_audio()),
                injector: Box::new(permissive_injector()),
                process: Box::new(permissive_process()),
                overlay: Box::new(overlay),
                store: Box::new(permissive_store()),
            },
        );

        let packet = key_packet(0x71);
        engine.table.assign(layer(0), slot(1), Signature::from_packet(&packet));

        let t0 = Instant::now();
        engine.process_at(&packet, t0);
        // Before the deadline nothing clears; after it, exactly once.
        engine.tick(t0 + Duration::from_millis(100));
        engine.tick(t0 + Duration::from_millis(900));
        engine.tick(t0 + Duration::from_millis(1000));
    }

    #[test]
    fn test_release_echo_passes_through_dispatch() {
        // The 0x37 echo filter applies only while AutoDetect is active;
        // during dispatch such frames still match normally.
        let mut engine = engine();
        let mut packet = key_packet(0x52);
        packet[2] = 0x37;
        engine.table.assign(layer(0), slot(2), Signature::from_packet(&packet));

        assert_matches!(engine.on_packet(&packet), PacketOutcome::Matched { .. });
    }
}
