//! Engine tuning parameters.

use std::time::Duration;

/// Configuration injected into the engine at construction.
///
/// Cross-component settings live here rather than in globals so tests and
/// the daemon can tune them independently.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Percentage step for active-window volume adjustments.
    pub volume_step: u8,
    /// Quiet window for hardware layer-sync notifications.
    pub sync_debounce: Duration,
    /// How long an OSD slot highlight stays up before auto-clearing.
    pub osd_highlight: Duration,
    /// Bound on the rolling packet-history buffer.
    pub history_capacity: usize,
    /// How far back AutoDetect looks when snapshotting its ignore set.
    pub detect_ignore_window: Duration,
    /// Maximum candidates collected by ManualDetect.
    pub candidate_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volume_step: 2,
            sync_debounce: Duration::from_millis(500),
            osd_highlight: Duration::from_millis(800),
            history_capacity: 20,
            detect_ignore_window: Duration::from_secs(1),
            candidate_cap: 10,
        }
    }
}
