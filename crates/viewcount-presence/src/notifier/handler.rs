//! Incoming message parsing.

use viewcount_common::NotifierError;

use crate::store::PresenceRecord;

use super::types::{ChangeAction, ChangeEvent};

/// Parse a `{ "action": ..., "record": {...} }` payload delivered on `topic`.
pub(crate) fn parse_change(
    topic: &str,
    data: &serde_json::Value,
) -> Result<ChangeEvent, NotifierError> {
    let action = data
        .get("action")
        .cloned()
        .ok_or_else(|| NotifierError::Parse("missing action".into()))?;
    let action: ChangeAction =
        serde_json::from_value(action).map_err(|e| NotifierError::Parse(e.to_string()))?;

    let record = data
        .get("record")
        .cloned()
        .ok_or_else(|| NotifierError::Parse("missing record".into()))?;
    let record: PresenceRecord =
        serde_json::from_value(record).map_err(|e| NotifierError::Parse(e.to_string()))?;

    Ok(ChangeEvent {
        topic: topic.to_string(),
        action,
        record,
    })
}

/// Serialize a change back into the wire payload.
pub(crate) fn change_payload(event: &ChangeEvent) -> serde_json::Value {
    serde_json::json!({
        "action": event.action,
        "record": event.record,
    })
}
