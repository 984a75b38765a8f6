//! Helpers for producing event markers.
//!
//! Agents and skills embed the marker text in a Task prompt; the hook
//! parses it back out with [`crate::events::extract_markers`].
//!
//! ```rust,ignore
//! let marker = emit::to_marker(&emit::progress("a1", "Wiring routes", 40.0, &["schema"]))?;
//! // [SPAWNER_EVENT]{"type":"agent:progress",...}[/SPAWNER_EVENT]
//! ```

use serde_json::Value;

use crate::error::{Result, SpawnerError};
use crate::events::{
    CompleteData, ErrorData, EventKind, EventPayload, HandoffData, ProgressData, Severity,
    SpawnData, SpawnerEvent, WaitingData, MARKER_CLOSE, MARKER_OPEN,
};

pub fn spawn(id: &str, name: &str, icon: &str, skills: &[&str], task: &str) -> SpawnerEvent {
    SpawnerEvent::new(EventPayload::Spawn(SpawnData {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        task: task.to_string(),
    }))
}

pub fn progress(id: &str, message: &str, percent: f64, completed: &[&str]) -> SpawnerEvent {
    SpawnerEvent::new(EventPayload::Progress(ProgressData {
        id: id.to_string(),
        message: message.to_string(),
        percent,
        completed: completed.iter().map(|s| s.to_string()).collect(),
    }))
}

pub fn waiting(id: &str, waiting_for: &str, reason: &str) -> SpawnerEvent {
    SpawnerEvent::new(EventPayload::Waiting(WaitingData {
        id: id.to_string(),
        waiting_for: waiting_for.to_string(),
        reason: reason.to_string(),
    }))
}

pub fn handoff(from: &str, to: &str, payload: Value, description: &str) -> SpawnerEvent {
    SpawnerEvent::new(EventPayload::Handoff(HandoffData {
        from: from.to_string(),
        to: to.to_string(),
        payload,
        description: description.to_string(),
    }))
}

pub fn complete(id: &str, result: &str, duration: Option<u64>) -> SpawnerEvent {
    SpawnerEvent::new(EventPayload::Complete(CompleteData {
        id: id.to_string(),
        result: result.to_string(),
        duration,
        tasks_completed: None,
    }))
}

pub fn error(id: &str, error: &str, severity: Severity) -> SpawnerEvent {
    SpawnerEvent::new(EventPayload::Error(ErrorData {
        id: id.to_string(),
        error: error.to_string(),
        severity,
    }))
}

/// Builds an event from a kind name (`progress` or `agent:progress`) and a
/// JSON data object, validating required fields.
pub fn build(kind: &str, data: Value) -> Result<SpawnerEvent> {
    let kind = EventKind::from_tag(kind).ok_or_else(|| SpawnerError::UnknownEventType(kind.to_string()))?;
    Ok(SpawnerEvent::new(EventPayload::from_data(kind, data)?))
}

/// `[SPAWNER_EVENT]{json}[/SPAWNER_EVENT]`
pub fn to_marker(event: &SpawnerEvent) -> Result<String> {
    let json = serde_json::to_string(event).map_err(|e| SpawnerError::json("serialize event", e))?;
    Ok(format!("{}{}{}", MARKER_OPEN, json, MARKER_CLOSE))
}
