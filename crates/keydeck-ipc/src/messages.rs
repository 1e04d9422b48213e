//! IPC message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use keydeck_core::action::Action;

/// Request envelope sent from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID for matching responses
    pub id: u64,
    /// The method to invoke
    pub method: Method,
}

/// Response envelope sent from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this is responding to
    pub id: u64,
    /// Result of the request
    pub result: Result<Value, ErrorInfo>,
}

/// Error information in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
}

impl ErrorInfo {
    /// Create a new error.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Methods that can be invoked via IPC.
///
/// Layer and slot numbers travel as raw bytes; the daemon validates them
/// against the hardware ranges and rejects out-of-range values with an
/// error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Method {
    // State queries
    /// Get the active layer and detection status
    GetState,
    /// Get the full binding table
    GetBindings,

    // Binding management
    /// Assign a trigger signature to a (layer, slot)
    AssignBinding { layer: u8, slot: u8, signature: String },
    /// Reset a (layer, slot) to its default unbound state
    UnmapBinding { layer: u8, slot: u8 },
    /// Change the action bound at a (layer, slot)
    SetAction { layer: u8, slot: u8, action: Action },
    /// Switch the active layer
    SetActiveLayer { layer: u8 },

    // Detection
    /// Begin instant capture for a target slot
    StartAutoDetect { layer: u8, slot: u8 },
    /// Begin list-mode capture
    StartManualDetect,
    /// Leave any capture mode
    StopDetect,
    /// Get the candidates collected by ManualDetect
    GetCandidates,
    /// Assign a collected candidate to a (layer, slot)
    PickCandidate { index: usize, layer: u8, slot: u8 },

    // System
    /// Request graceful shutdown
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip() {
        let request = Request {
            id: 7,
            method: Method::AssignBinding { layer: 2, slot: 5, signature: "0A 1B".into() },
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 7);
        assert!(matches!(
            back.method,
            Method::AssignBinding { layer: 2, slot: 5, ref signature } if signature == "0A 1B"
        ));
    }

    #[test]
    fn test_method_wire_format_is_tagged() {
        let json = serde_json::to_string(&Method::StartAutoDetect { layer: 1, slot: 4 }).unwrap();
        assert!(json.contains(r#""type":"StartAutoDetect""#));
        assert!(json.contains(r#""params""#));
    }

    #[test]
    fn test_unit_methods_need_no_params() {
        let method: Method = serde_json::from_str(r#"{"type":"Shutdown"}"#).unwrap();
        assert!(matches!(method, Method::Shutdown));
    }

    #[test]
    fn test_error_response_round_trip() {
        let response =
            Response { id: 3, result: Err(ErrorInfo::new(400, "layer 9 out of range")) };
        let json = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();
        assert!(matches!(back.result, Err(ref e) if e.code == 400));
    }
}
