//! Lifecycle events emitted by agents (or inferred from Task tool calls).
//!
//! Events reach the hook in two shapes:
//!
//! ```text
//! tool_input.spawner_event = { "type": "agent:spawn", "timestamp": 1712, "data": { ... } }
//! tool_input.prompt        = "... [SPAWNER_EVENT]{...}[/SPAWNER_EVENT] ..."
//! ```
//!
//! The wire format is loosely typed, so parsing happens in two steps: the
//! `type` tag (or, when it is missing, the shape of `data`) selects a payload
//! variant, then the fields that variant cannot live without are validated.
//! Everything else defaults.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, SpawnerError};

pub const MARKER_OPEN: &str = "[SPAWNER_EVENT]";
pub const MARKER_CLOSE: &str = "[/SPAWNER_EVENT]";

static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\[SPAWNER_EVENT\](.*?)\[/SPAWNER_EVENT\]").expect("marker regex is valid")
});

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Spawn,
    Progress,
    Waiting,
    Handoff,
    Complete,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Spawn,
        EventKind::Progress,
        EventKind::Waiting,
        EventKind::Handoff,
        EventKind::Complete,
        EventKind::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Spawn => "spawn",
            EventKind::Progress => "progress",
            EventKind::Waiting => "waiting",
            EventKind::Handoff => "handoff",
            EventKind::Complete => "complete",
            EventKind::Error => "error",
        }
    }

    /// Tag written into the `type` field of an event.
    pub fn tag(self) -> &'static str {
        match self {
            EventKind::Spawn => "agent:spawn",
            EventKind::Progress => "agent:progress",
            EventKind::Waiting => "agent:waiting",
            EventKind::Handoff => "agent:handoff",
            EventKind::Complete => "agent:complete",
            EventKind::Error => "agent:error",
        }
    }

    /// Accepts both `agent:progress` and bare `progress`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        let bare = tag.strip_prefix("agent:").unwrap_or(tag);
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(bare))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Payloads
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpawnData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub percent: f64,
    /// Full history of finished sub-steps, not a delta.
    #[serde(default)]
    pub completed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WaitingData {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "waitingFor")]
    pub waiting_for: String,
    #[serde(default)]
    pub reason: String,
}

/// Handoffs address agents by display name, not by id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandoffData {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompleteData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub result: String,
    #[serde(
        default,
        deserialize_with = "lenient_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<u64>,
    #[serde(default, alias = "tasksCompleted", skip_serializing_if = "Option::is_none")]
    pub tasks_completed: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Warning,
    Blocking,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Spawn(SpawnData),
    Progress(ProgressData),
    Waiting(WaitingData),
    Handoff(HandoffData),
    Complete(CompleteData),
    Error(ErrorData),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Spawn(_) => EventKind::Spawn,
            EventPayload::Progress(_) => EventKind::Progress,
            EventPayload::Waiting(_) => EventKind::Waiting,
            EventPayload::Handoff(_) => EventKind::Handoff,
            EventPayload::Complete(_) => EventKind::Complete,
            EventPayload::Error(_) => EventKind::Error,
        }
    }

    /// Parses `data` for a known kind and checks the fields that kind requires.
    pub fn from_data(kind: EventKind, data: Value) -> Result<Self> {
        let context = kind.as_str();
        let payload = match kind {
            EventKind::Spawn => EventPayload::Spawn(decode(kind, data)?),
            EventKind::Progress => EventPayload::Progress(decode(kind, data)?),
            EventKind::Waiting => EventPayload::Waiting(decode(kind, data)?),
            EventKind::Handoff => EventPayload::Handoff(decode(kind, data)?),
            EventKind::Complete => EventPayload::Complete(decode(kind, data)?),
            EventKind::Error => EventPayload::Error(decode(kind, data)?),
        };
        payload.validate().map_err(|field| {
            SpawnerError::invalid(context, format!("{} is required", field))
        })?;
        Ok(payload)
    }

    /// Returns the name of the first missing required field.
    fn validate(&self) -> std::result::Result<(), &'static str> {
        match self {
            EventPayload::Spawn(d) => require(&d.id, "id"),
            EventPayload::Progress(d) => require(&d.id, "id"),
            EventPayload::Waiting(d) => {
                require(&d.id, "id")?;
                require(&d.waiting_for, "waiting_for")
            }
            EventPayload::Handoff(d) => {
                require(&d.from, "from")?;
                require(&d.to, "to")
            }
            EventPayload::Complete(d) => require(&d.id, "id"),
            EventPayload::Error(d) => {
                require(&d.id, "id")?;
                require(&d.error, "error")
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(kind: EventKind, data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| SpawnerError::invalid(kind.as_str(), e.to_string()))
}

fn require(value: &str, field: &'static str) -> std::result::Result<(), &'static str> {
    if value.trim().is_empty() {
        Err(field)
    } else {
        Ok(())
    }
}

fn lenient_millis<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_millis))
}

fn value_as_millis(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|v| *v >= 0.0).map(|v| v.round() as u64))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Type guards
// ═══════════════════════════════════════════════════════════════════════════════
//
// Loose structural checks over untyped JSON. Only used to pick a payload
// variant when an event arrives without a usable `type` tag.

fn has(value: &Value, field: &str) -> bool {
    value.get(field).is_some_and(|v| !v.is_null())
}

pub fn is_spawn_data(value: &Value) -> bool {
    has(value, "id") && has(value, "name")
}

pub fn is_progress_data(value: &Value) -> bool {
    has(value, "id") && has(value, "percent")
}

pub fn is_waiting_data(value: &Value) -> bool {
    has(value, "id") && has(value, "waiting_for")
}

pub fn is_handoff_data(value: &Value) -> bool {
    has(value, "from") && has(value, "to")
}

pub fn is_complete_data(value: &Value) -> bool {
    has(value, "id") && has(value, "result")
}

pub fn is_error_data(value: &Value) -> bool {
    has(value, "id") && has(value, "error")
}

/// Guesses the kind of an untagged payload. Most specific shapes first:
/// nearly every payload carries `id`, so spawn is checked last.
pub fn infer_kind(data: &Value) -> Option<EventKind> {
    if is_handoff_data(data) {
        Some(EventKind::Handoff)
    } else if is_waiting_data(data) {
        Some(EventKind::Waiting)
    } else if is_error_data(data) {
        Some(EventKind::Error)
    } else if is_progress_data(data) {
        Some(EventKind::Progress)
    } else if is_complete_data(data) {
        Some(EventKind::Complete)
    } else if is_spawn_data(data) {
        Some(EventKind::Spawn)
    } else {
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Event envelope
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnerEvent {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub payload: EventPayload,
}

impl SpawnerEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self::at(now_millis(), payload)
    }

    pub fn at(timestamp: i64, payload: EventPayload) -> Self {
        Self { timestamp, payload }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Builds an event from loosely-typed JSON.
    ///
    /// Accepts `{type, timestamp, data}` envelopes as well as a bare payload
    /// object (kind inferred from its shape). A missing timestamp means "now".
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(SpawnerError::invalid("event", "expected a JSON object"));
        }

        let tag = value.get("type").and_then(Value::as_str).map(str::to_string);
        let timestamp = value
            .get("timestamp")
            .and_then(value_as_millis)
            .map(|ms| ms as i64)
            .unwrap_or_else(now_millis);

        let data = if value.get("data").is_some_and(Value::is_object) {
            value["data"].clone()
        } else {
            value
        };

        // An unrecognized tag gets the same shape-based fallback as a missing one.
        let kind = match tag.as_deref().and_then(EventKind::from_tag) {
            Some(kind) => kind,
            None => infer_kind(&data).ok_or_else(|| {
                SpawnerError::UnknownEventType(tag.unwrap_or_else(|| "<missing>".to_string()))
            })?,
        };

        Ok(SpawnerEvent {
            timestamp,
            payload: EventPayload::from_data(kind, data)?,
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text.trim())
            .map_err(|e| SpawnerError::json("event payload", e))?;
        Self::from_value(value)
    }
}

#[derive(Serialize)]
struct WireEvent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: i64,
    data: &'a EventPayload,
}

impl Serialize for SpawnerEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        WireEvent {
            kind: self.kind().tag(),
            timestamp: self.timestamp,
            data: &self.payload,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SpawnerEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SpawnerEvent::from_value(value).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Markers
// ═══════════════════════════════════════════════════════════════════════════════

/// Returns the raw JSON bodies of every marker in `text`, in order.
pub fn marker_bodies(text: &str) -> impl Iterator<Item = &str> {
    MARKER_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Parses every marker embedded in `text`. Malformed markers are skipped.
pub fn extract_markers(text: &str) -> Vec<SpawnerEvent> {
    marker_bodies(text)
        .filter_map(|body| match SpawnerEvent::parse(body) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!(error = %err, "Skipping malformed event marker");
                None
            }
        })
        .collect()
}
