//! Request handling for the IPC server.

use serde_json::{Value, json};
use tracing::{debug, info};

use keydeck_core::engine::Engine;
use keydeck_core::signature::Signature;
use keydeck_core::table::{Layer, Slot};
use keydeck_ipc::messages::{ErrorInfo, Method};

/// What handling one request produced.
pub struct HandleOutcome {
    /// The response payload for the client.
    pub response: Result<Value, ErrorInfo>,
    /// Whether the daemon should shut down after responding.
    pub shutdown: bool,
}

impl HandleOutcome {
    fn reply(response: Result<Value, ErrorInfo>) -> Self {
        Self { response, shutdown: false }
    }
}

/// Validate wire-level layer and slot numbers against hardware ranges.
fn coords(layer: u8, slot: u8) -> Result<(Layer, Slot), ErrorInfo> {
    let layer = Layer::new(layer).ok_or_else(|| ErrorInfo::new(400, format!("layer {layer} out of range")))?;
    let slot = Slot::new(slot).ok_or_else(|| ErrorInfo::new(400, format!("slot {slot} out of range")))?;
    Ok((layer, slot))
}

/// Handle an IPC request against the engine.
pub fn handle_request(engine: &mut Engine, device_connected: bool, method: &Method) -> HandleOutcome {
    match method {
        Method::GetState => HandleOutcome::reply(Ok(json!({
            "active_layer": engine.active_layer().value(),
            "detecting": engine.is_detecting(),
            "device_connected": device_connected,
        }))),

        Method::GetBindings => {
            let bindings: Vec<Value> = engine
                .table()
                .entries()
                .map(|(layer, slot, binding)| {
                    json!({
                        "layer": layer.value(),
                        "slot": slot.value(),
                        "trigger": binding.trigger.as_ref().map(Signature::as_str),
                        "action": serde_json::to_value(&binding.action).unwrap_or(Value::Null),
                        "display_name": binding.display_name,
                    })
                })
                .collect();
            HandleOutcome::reply(Ok(Value::Array(bindings)))
        }

        Method::AssignBinding { layer, slot, signature } => {
            HandleOutcome::reply(coords(*layer, *slot).map(|(layer, slot)| {
                engine.assign(layer, slot, Signature::from_string(signature.clone()));
                json!({"success": true})
            }))
        }

        Method::UnmapBinding { layer, slot } => {
            HandleOutcome::reply(coords(*layer, *slot).map(|(layer, slot)| {
                engine.unmap(layer, slot);
                json!({"success": true})
            }))
        }

        Method::SetAction { layer, slot, action } => {
            HandleOutcome::reply(coords(*layer, *slot).map(|(layer, slot)| {
                engine.set_action(layer, slot, action.clone());
                json!({"success": true})
            }))
        }

        Method::SetActiveLayer { layer } => {
            let result = Layer::new(*layer)
                .ok_or_else(|| ErrorInfo::new(400, format!("layer {layer} out of range")))
                .map(|layer| {
                    engine.set_active_layer(layer);
                    json!({"success": true})
                });
            HandleOutcome::reply(result)
        }

        Method::StartAutoDetect { layer, slot } => {
            HandleOutcome::reply(coords(*layer, *slot).map(|(layer, slot)| {
                engine.start_auto_detect(layer, slot);
                json!({"success": true})
            }))
        }

        Method::StartManualDetect => {
            engine.start_manual_detect();
            HandleOutcome::reply(Ok(json!({"success": true})))
        }

        Method::StopDetect => {
            engine.stop_detect();
            HandleOutcome::reply(Ok(json!({"success": true})))
        }

        Method::GetCandidates => {
            let candidates: Vec<Value> = engine
                .candidates()
                .iter()
                .enumerate()
                .map(|(index, candidate)| {
                    json!({
                        "index": index,
                        "signature": candidate.signature.as_str(),
                        "raw": candidate.raw,
                    })
                })
                .collect();
            HandleOutcome::reply(Ok(Value::Array(candidates)))
        }

        Method::PickCandidate { index, layer, slot } => {
            let result = coords(*layer, *slot).and_then(|(layer, slot)| {
                engine
                    .pick_candidate(*index, layer, slot)
                    .map(|()| json!({"success": true}))
                    .map_err(|e| ErrorInfo::new(404, e.to_string()))
            });
            HandleOutcome::reply(result)
        }

        Method::Shutdown => {
            info!("Shutdown requested via IPC");
            HandleOutcome { response: Ok(json!({"success": true})), shutdown: true }
        }
    }
}

/// Trace a request at debug level without dumping payload contents.
pub fn trace_request(client_id: u64, method: &Method) {
    debug!(client_id, method = ?std::mem::discriminant(method), "Handling IPC request");
}
