//! Canonical signatures derived from raw device packets.
//!
//! A signature is the matching key for bindings: two packets representing
//! the same physical key must always render to the same signature, while
//! cosmetic framing differences (report IDs, keep-alive counters) must not
//! change it.

use serde::{Deserialize, Serialize};

/// Packets longer than this carry their semantic payload at a fixed offset.
pub const SHORT_REPORT_MAX: usize = 10;
/// Offset of the semantic payload (type/key/value) in long reports.
pub const PAYLOAD_OFFSET: usize = 8;
/// Maximum number of payload bytes included in a signature.
pub const PAYLOAD_LEN: usize = 12;
/// Leading byte of device noise frames; these are never matched or logged.
pub const NOISE_LEAD: u8 = 0xC6;
/// Marker bytes at or above this value denote keep-alive/background frames.
pub const KEEPALIVE_MIN: u8 = 0xC0;
/// Index of the marker byte used for keep-alive and ignore-set filtering.
pub const MARKER_INDEX: usize = 10;

/// Canonical string key derived from a raw packet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Derive the signature for a raw packet.
    ///
    /// Long reports (`len > 10`) use the payload window at bytes
    /// `[8, 8 + min(len - 8, 12))`, which excludes the leading report-ID
    /// and keep-alive bytes. Short multimedia-class reports have no stable
    /// payload offset, so the whole frame is used.
    #[must_use]
    pub fn from_packet(packet: &[u8]) -> Self {
        let window = if packet.len() > SHORT_REPORT_MAX {
            let len = (packet.len() - PAYLOAD_OFFSET).min(PAYLOAD_LEN);
            &packet[PAYLOAD_OFFSET..PAYLOAD_OFFSET + len]
        } else {
            packet
        };
        Self(hex_string(window))
    }

    /// Wrap an already-rendered signature string (e.g. loaded from the db).
    #[must_use]
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// The signature as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render bytes as space-separated uppercase hex ("21 00 52").
#[must_use]
pub fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02X}"));
    }
    out
}

/// Device noise frame: never logged, never matched, never a candidate.
///
/// Noise is defined by the rendered signature, so for long reports the
/// payload window's lead byte counts as well as the frame's first byte.
#[must_use]
pub fn is_noise(packet: &[u8]) -> bool {
    if packet.first() == Some(&NOISE_LEAD) {
        return true;
    }
    packet.len() > SHORT_REPORT_MAX && packet.get(PAYLOAD_OFFSET) == Some(&NOISE_LEAD)
}

/// Keep-alive/background frame, identified by its marker byte.
#[must_use]
pub fn is_keepalive(packet: &[u8]) -> bool {
    marker(packet).is_some_and(|m| m >= KEEPALIVE_MIN)
}

/// The marker byte of a long report, if present.
#[must_use]
pub fn marker(packet: &[u8]) -> Option<u8> {
    if packet.len() > SHORT_REPORT_MAX { Some(packet[MARKER_INDEX]) } else { None }
}

/// Key-release echo frame; only press frames may be captured by detection.
#[must_use]
pub fn is_release_echo(packet: &[u8]) -> bool {
    packet.len() > SHORT_REPORT_MAX && packet[2] == 0x37
}

/// Byte pattern that typically denotes a release duplicate of a key.
#[must_use]
pub fn is_key_up(packet: &[u8]) -> bool {
    packet.get(PAYLOAD_OFFSET) == Some(&0x81)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn long_packet(payload: &[u8]) -> Vec<u8> {
        let mut p = vec![0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
        p.extend_from_slice(payload);
        p
    }

    #[test]
    fn test_long_report_uses_payload_window() {
        let packet = long_packet(&[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(packet.len(), 12);
        assert_eq!(Signature::from_packet(&packet).as_str(), "01 02 03 04");
    }

    #[test]
    fn test_payload_window_capped_at_twelve_bytes() {
        let mut payload = Vec::new();
        for i in 0..20u8 {
            payload.push(i);
        }
        let packet = long_packet(&payload);
        let sig = Signature::from_packet(&packet);
        // 12 payload bytes, two hex digits plus separator each
        assert_eq!(sig.as_str().split(' ').count(), 12);
        assert!(sig.as_str().starts_with("00 01 02"));
        assert!(sig.as_str().ends_with("0B"));
    }

    #[test]
    fn test_short_report_uses_whole_frame() {
        let packet = [0x02, 0xE9, 0x00];
        assert_eq!(Signature::from_packet(&packet).as_str(), "02 E9 00");
    }

    #[test]
    fn test_boundary_length_ten_is_short() {
        let packet = [0xAA; 10];
        assert_eq!(Signature::from_packet(&packet).as_str().split(' ').count(), 10);
    }

    #[test]
    fn test_empty_packet_yields_empty_signature() {
        assert_eq!(Signature::from_packet(&[]).as_str(), "");
    }

    #[test]
    fn test_noise_detection() {
        assert!(is_noise(&[0xC6, 0x00, 0x01]));
        assert!(!is_noise(&[0x21, 0xC6]));
        assert!(!is_noise(&[]));
    }

    #[test]
    fn test_noise_in_payload_window_of_long_report() {
        // A long report whose signature would render "C6 ..." is noise even
        // though its frame does not start with the noise lead.
        let packet = long_packet(&[0xC6, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert!(is_noise(&packet));
        assert!(Signature::from_packet(&packet).as_str().starts_with("C6"));
        // Short reports are judged by their first byte only.
        assert!(!is_noise(&[0x03, 0x00, 0xC6]));
    }

    #[test]
    fn test_keepalive_marker() {
        let mut packet = long_packet(&[0x00, 0x00, 0xC0]);
        assert!(is_keepalive(&packet));
        packet[MARKER_INDEX] = 0xBF;
        assert!(!is_keepalive(&packet));
        // Short reports have no marker byte
        assert!(!is_keepalive(&[0xC0; 9]));
    }

    #[test]
    fn test_release_echo_only_for_long_packets() {
        let mut packet = long_packet(&[0x05, 0x00, 0x00]);
        packet[2] = 0x37;
        assert!(is_release_echo(&packet));
        assert!(!is_release_echo(&[0x03, 0x00, 0x37]));
    }

    proptest! {
        /// Bytes outside the payload window must not affect the signature.
        #[test]
        fn prop_signature_stable_outside_window(
            payload in proptest::collection::vec(any::<u8>(), 3..12),
            head_a in proptest::collection::vec(any::<u8>(), 8),
            head_b in proptest::collection::vec(any::<u8>(), 8),
        ) {
            let mut a = head_a;
            a.extend_from_slice(&payload);
            let mut b = head_b;
            b.extend_from_slice(&payload);
            let sig_a = Signature::from_packet(&a);
            let sig_b = Signature::from_packet(&b);
            prop_assert_eq!(sig_a.as_str(), sig_b.as_str());
        }

        /// Differing payload windows must produce differing signatures.
        #[test]
        fn prop_signature_distinguishes_payloads(
            payload_a in proptest::collection::vec(any::<u8>(), 4),
            payload_b in proptest::collection::vec(any::<u8>(), 4),
        ) {
            prop_assume!(payload_a != payload_b);
            let a = long_packet(&payload_a);
            let b = long_packet(&payload_b);
            let sig_a = Signature::from_packet(&a);
            let sig_b = Signature::from_packet(&b);
            prop_assert_ne!(sig_a.as_str(), sig_b.as_str());
        }
    }
}
