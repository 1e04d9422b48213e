//! Detection state machine used to create bindings.
//!
//! Two capture modes exist: AutoDetect binds the next clean press frame to
//! a pre-selected slot, ManualDetect collects a list of candidate frames
//! for the user to pick from. The modes are mutually exclusive; starting
//! one stops the other.

use std::collections::HashSet;

use crate::signature::{self, Signature};
use crate::table::{Layer, Slot};

/// A frame collected by ManualDetect.
///
/// Carries the raw bytes so the UI can let the user inspect and pick one
/// later, independent of sequence timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub signature: Signature,
    pub raw: Vec<u8>,
}

/// Current detection mode.
#[derive(Debug)]
pub enum DetectState {
    /// No capture in progress; packets flow to dispatch.
    Idle,
    /// Instant capture bound to a pre-selected target slot.
    Auto { target: (Layer, Slot), ignored: HashSet<u8> },
    /// List mode: collect candidates for later selection.
    Manual { candidates: Vec<Candidate>, cap: usize },
}

/// What the state machine did with a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectOutcome {
    /// AutoDetect captured this packet; the machine is Idle again.
    Captured { layer: Layer, slot: Slot, signature: Signature },
    /// ManualDetect stored a new candidate (1-based position).
    CandidateAdded(usize),
    /// Filtered: ignored marker, release echo, or duplicate candidate.
    Background,
    /// ManualDetect already holds its maximum number of candidates.
    CandidatesFull,
}

impl DetectState {
    /// Whether a capture mode is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Enter AutoDetect for a target slot, replacing any active mode.
    ///
    /// `ignored` is the snapshot of marker bytes seen just before the mode
    /// started; packets carrying one of them are still mechanically-active
    /// leftovers of a previous key and must not be captured.
    pub fn start_auto(&mut self, layer: Layer, slot: Slot, ignored: HashSet<u8>) {
        *self = Self::Auto { target: (layer, slot), ignored };
    }

    /// Enter ManualDetect, replacing any active mode.
    pub fn start_manual(&mut self, cap: usize) {
        *self = Self::Manual { candidates: Vec::new(), cap };
    }

    /// Leave any capture mode.
    pub fn stop(&mut self) {
        *self = Self::Idle;
    }

    /// Candidates collected so far (empty outside ManualDetect).
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Self::Manual { candidates, .. } => candidates,
            _ => &[],
        }
    }

    /// Feed one packet to the active mode.
    ///
    /// The caller has already discarded noise and keep-alive frames (those
    /// filters are shared with dispatch). Returns `None` when Idle.
    pub fn handle_packet(&mut self, packet: &[u8]) -> Option<DetectOutcome> {
        match self {
            Self::Idle => None,

            Self::Auto { target, ignored } => {
                if signature::is_release_echo(packet) {
                    return Some(DetectOutcome::Background);
                }
                if signature::marker(packet).is_some_and(|m| ignored.contains(&m)) {
                    return Some(DetectOutcome::Background);
                }
                let (layer, slot) = *target;
                let captured = DetectOutcome::Captured {
                    layer,
                    slot,
                    signature: Signature::from_packet(packet),
                };
                *self = Self::Idle;
                Some(captured)
            }

            Self::Manual { candidates, cap } => {
                if candidates.len() >= *cap {
                    return Some(DetectOutcome::CandidatesFull);
                }
                let signature = Signature::from_packet(packet);
                if candidates.iter().any(|c| c.signature == signature) {
                    return Some(DetectOutcome::Background);
                }
                candidates.push(Candidate { signature, raw: packet.to_vec() });
                Some(DetectOutcome::CandidateAdded(candidates.len()))
            }
        }
    }
}
