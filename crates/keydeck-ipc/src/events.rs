//! IPC event types (server to client).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event sent from daemon to subscribed clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type
    pub event: EventType,
    /// Event data
    pub data: Value,
}

impl Event {
    /// Build an event from a typed data payload.
    #[must_use]
    pub fn new(event: EventType, data: impl Serialize) -> Self {
        Self { event, data: serde_json::to_value(data).unwrap_or(Value::Null) }
    }
}

/// Types of events that can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Active layer changed (hardware sync, jump, or user command)
    LayerChanged,
    /// A dispatch matched; the slot should light up on the OSD
    SlotHighlighted,
    /// The slot highlight timed out
    HighlightCleared,
    /// A detection run assigned a signature
    MappingConfirmed,
    /// ManualDetect collected a new candidate
    CandidateAdded,
    /// A packet matched no binding
    UnknownSignal,
    /// Free-form feedback line for the visible log
    Feedback,
    /// A new capture run started; clients should clear the feedback log
    FeedbackLogCleared,
    /// The binding table changed; clients should re-read it
    BindingsChanged,
    /// The on-screen display mode cycled to the next style
    OsdModeCycled,
    /// Keypad device connected
    DeviceConnected,
    /// Keypad device disconnected
    DeviceDisconnected,
}

/// Layer changed event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerChangedData {
    pub layer: u8,
}

/// Slot highlighted event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotHighlightedData {
    pub slot: u8,
    /// Mic mute state, when this dispatch toggled it
    pub mic_muted: Option<bool>,
}

/// Mapping confirmed event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfirmedData {
    pub signature: String,
}

/// Candidate added event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAddedData {
    /// 1-based position in the candidate list
    pub index: usize,
    pub signature: String,
}

/// Unknown signal event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnknownSignalData {
    pub signature: String,
    pub hint: Option<String>,
}

/// Feedback event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackData {
    pub text: String,
    pub icon: Option<String>,
    pub slot: Option<u8>,
}

/// Device connected event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConnectedData {
    pub vendor_id: u16,
    pub product_id: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_round_trip() {
        let event =
            Event::new(EventType::SlotHighlighted, SlotHighlightedData { slot: 3, mic_muted: None });
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event, EventType::SlotHighlighted);
        let data: SlotHighlightedData = serde_json::from_value(back.data).unwrap();
        assert_eq!(data.slot, 3);
    }

    #[test]
    fn test_event_type_wire_names_are_snake_case() {
        let json = serde_json::to_string(&EventType::LayerChanged).unwrap();
        assert_eq!(json, r#""layer_changed""#);
    }
}
