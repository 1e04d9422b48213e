//! Bounded rolling history of recent packet marker bytes.
//!
//! AutoDetect snapshots the marker bytes seen shortly before it starts, so
//! a key that is still mechanically active at that moment cannot be
//! captured by its own trailing frames.

use std::collections::HashSet;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rolling buffer of timestamped packet markers.
#[derive(Debug)]
pub struct PacketHistory {
    entries: VecDeque<(Instant, Option<u8>)>,
    capacity: usize,
}

impl PacketHistory {
    /// Create a history bounded to `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Record a packet's marker byte (if any) at `now`.
    pub fn record(&mut self, now: Instant, marker: Option<u8>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((now, marker));
    }

    /// Marker bytes seen within `window` before `now`.
    #[must_use]
    pub fn markers_within(&self, now: Instant, window: Duration) -> HashSet<u8> {
        self.entries
            .iter()
            .filter(|(at, _)| now.duration_since(*at) <= window)
            .filter_map(|(_, marker)| *marker)
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
