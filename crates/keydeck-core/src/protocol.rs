//! Hardware layer-sync protocol: unsolicited layer-change notifications.
//!
//! The device answers polled state queries and spontaneously pushes
//! layer-change notifications; both use the same 64-byte frame shape.
//! Only the unsolicited notification is decoded here; malformed frames
//! are not an error path, they are simply not notifications.

use crate::table::Layer;

/// Length of a device state frame.
pub const SYNC_FRAME_LEN: usize = 64;
/// Leading byte of every state frame.
pub const SYNC_FRAME_HEADER: u8 = 0x21;
/// Offset of the frame-kind marker.
pub const SYNC_KIND_INDEX: usize = 15;
/// Frame-kind marker for an unsolicited layer-change notification.
pub const SYNC_KIND_NOTIFY: u8 = 0x52;
/// Offset of the reported layer number.
pub const SYNC_LAYER_INDEX: usize = 17;

/// Decode an unsolicited layer-change notification.
///
/// Returns the reported layer for a well-formed notification frame, `None`
/// for anything else (wrong length, wrong header, polled responses,
/// out-of-range layer).
#[must_use]
pub fn parse_layer_notification(frame: &[u8]) -> Option<Layer> {
    if frame.len() != SYNC_FRAME_LEN
        || frame[0] != SYNC_FRAME_HEADER
        || frame[SYNC_KIND_INDEX] != SYNC_KIND_NOTIFY
    {
        return None;
    }
    Layer::new(frame[SYNC_LAYER_INDEX])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notify_frame(layer: u8) -> [u8; SYNC_FRAME_LEN] {
        let mut frame = [0u8; SYNC_FRAME_LEN];
        frame[0] = SYNC_FRAME_HEADER;
        frame[SYNC_KIND_INDEX] = SYNC_KIND_NOTIFY;
        frame[SYNC_LAYER_INDEX] = layer;
        frame
    }

    #[test]
    fn test_valid_notification() {
        let layer = parse_layer_notification(&notify_frame(3)).unwrap();
        assert_eq!(layer.value(), 3);
    }

    #[test]
    fn test_out_of_range_layer_is_ignored() {
        assert!(parse_layer_notification(&notify_frame(5)).is_none());
        assert!(parse_layer_notification(&notify_frame(0xFF)).is_none());
    }

    #[test]
    fn test_wrong_length_is_ignored() {
        let frame = notify_frame(2);
        assert!(parse_layer_notification(&frame[..32]).is_none());
    }

    #[test]
    fn test_wrong_header_is_ignored() {
        let mut frame = notify_frame(2);
        frame[0] = 0x22;
        assert!(parse_layer_notification(&frame).is_none());
    }

    #[test]
    fn test_polled_response_is_not_a_notification() {
        let mut frame = notify_frame(2);
        frame[SYNC_KIND_INDEX] = 0x51;
        assert!(parse_layer_notification(&frame).is_none());
    }
}
