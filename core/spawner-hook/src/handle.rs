//! Event handler for Task and Skill tool calls.
//!
//! Reads one hook payload from stdin, turns it into lifecycle events, applies
//! them to the persisted session and writes the rendered result to stderr.
//!
//! ## Classification
//!
//! ```text
//! Skill                               → "loading skill" line (state untouched)
//! other tools                         → ignored
//! Task, PostToolUse / tool_response   → complete the agent tracked under tool_use_id
//! Task, spawner_event or markers      → each explicit event, in order
//! Task, otherwise                     → spawn inferred from subagent_type + description
//! ```
//!
//! Nothing here may fail the host's tool call: bad input is reported once and
//! dropped, persistence problems are logged.

use std::io::{self, Read, Write};

use serde::Deserialize;
use serde_json::Value;
use spawner_core::events::extract_markers;
use spawner_core::format::one_line;
use spawner_core::{
    all_agents_complete, apply_event, now_millis, AgentCatalog, Applied, CompleteData,
    EventPayload, HookConfig, NotificationState, Renderer, SpawnData, SpawnerEvent, StateStore,
};

const RESULT_SUMMARY_CHARS: usize = 80;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Value,
    #[serde(default)]
    pub tool_use_id: Option<String>,
    #[serde(default)]
    pub tool_response: Option<Value>,
    #[serde(default)]
    pub hook_event_name: Option<String>,
}

impl HookInput {
    fn is_post_tool_use(&self) -> bool {
        self.hook_event_name.as_deref() == Some("PostToolUse")
            || self.tool_response.as_ref().is_some_and(|r| !r.is_null())
    }

    fn input_str(&self, field: &str) -> &str {
        self.tool_input
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The host's tool-call id, or a timestamp-derived one.
    fn correlation_id(&self, now: i64) -> String {
        match self.tool_use_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("agent-{}", now),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Dispatch {
    Skill(String),
    Events(Vec<SpawnerEvent>),
    Nothing,
}

/// Everything one invocation needs, resolved from [`HookConfig`].
pub struct HookContext {
    pub store: StateStore,
    pub catalog: AgentCatalog,
    pub renderer: Renderer,
}

impl HookContext {
    pub fn from_config(config: &HookConfig) -> Self {
        HookContext {
            store: config.store(),
            catalog: config.catalog(),
            renderer: config.renderer(),
        }
    }
}

pub fn run(config: &HookConfig) -> Result<(), String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| format!("Failed to read stdin: {}", e))?;

    let ctx = HookContext::from_config(config);
    let stderr = io::stderr();
    let mut out = stderr.lock();
    handle_input(&input, &ctx, &mut out, now_millis());
    Ok(())
}

pub fn handle_input<W: Write>(raw: &str, ctx: &HookContext, out: &mut W, now: i64) {
    if raw.trim().is_empty() {
        return;
    }

    let input: HookInput = match serde_json::from_str(raw) {
        Ok(input) => input,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to parse hook input");
            write_block(out, &format!("spawner: ignoring unreadable hook input ({})", err));
            return;
        }
    };

    match classify(&input, &ctx.catalog, now) {
        Dispatch::Nothing => {
            tracing::trace!(tool = %input.tool_name, "Ignoring tool call");
        }
        Dispatch::Skill(skill) => write_block(out, &ctx.renderer.skill_loading(&skill)),
        Dispatch::Events(events) => process_events(&events, ctx, out, now),
    }
}

fn classify(input: &HookInput, catalog: &AgentCatalog, now: i64) -> Dispatch {
    match input.tool_name.as_str() {
        "Skill" => return Dispatch::Skill(skill_name(&input.tool_input)),
        "Task" => {}
        _ => return Dispatch::Nothing,
    }

    let id = input.correlation_id(now);

    // The prompt (and its markers) is echoed back on PostToolUse; only the
    // completion is new.
    if input.is_post_tool_use() {
        return Dispatch::Events(vec![inferred_completion(input, id, now)]);
    }

    let explicit = explicit_events(&input.tool_input);
    if !explicit.is_empty() {
        return Dispatch::Events(explicit);
    }

    Dispatch::Events(vec![inferred_spawn(input, id, catalog, now)])
}

fn skill_name(tool_input: &Value) -> String {
    ["skill", "name", "command"]
        .iter()
        .find_map(|field| tool_input.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// `tool_input.spawner_event` (object or JSON string), then prompt markers.
fn explicit_events(tool_input: &Value) -> Vec<SpawnerEvent> {
    let mut events = Vec::new();

    let parsed = match tool_input.get("spawner_event") {
        Some(Value::String(text)) if text.contains(spawner_core::events::MARKER_OPEN) => {
            events.extend(extract_markers(text));
            None
        }
        Some(Value::String(text)) => Some(SpawnerEvent::parse(text)),
        Some(value @ Value::Object(_)) => Some(SpawnerEvent::from_value(value.clone())),
        _ => None,
    };
    match parsed {
        Some(Ok(event)) => events.push(event),
        Some(Err(err)) => tracing::warn!(error = %err, "Skipping malformed spawner_event"),
        None => {}
    }

    if let Some(prompt) = tool_input.get("prompt").and_then(Value::as_str) {
        events.extend(extract_markers(prompt));
    }
    events
}

fn inferred_spawn(input: &HookInput, id: String, catalog: &AgentCatalog, now: i64) -> SpawnerEvent {
    let profile = catalog.resolve(input.input_str("subagent_type"));

    let description = input.input_str("description").trim();
    let task = if description.is_empty() {
        input
            .input_str("prompt")
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string()
    } else {
        description.to_string()
    };

    tracing::debug!(id = %id, name = %profile.name, "Inferred spawn from Task call");
    SpawnerEvent::at(
        now,
        EventPayload::Spawn(SpawnData {
            id,
            name: profile.name,
            icon: profile.icon,
            skills: Vec::new(),
            task,
        }),
    )
}

fn inferred_completion(input: &HookInput, id: String, now: i64) -> SpawnerEvent {
    let response = input.tool_response.as_ref().unwrap_or(&Value::Null);
    let duration = response
        .get("totalDurationMs")
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0).round() as u64)));

    SpawnerEvent::at(
        now,
        EventPayload::Complete(CompleteData {
            id,
            result: summarize_response(response),
            duration,
            tasks_completed: None,
        }),
    )
}

/// First non-empty line of the agent's reply, shortened.
fn summarize_response(response: &Value) -> String {
    let text = match response {
        Value::String(text) => text.as_str(),
        Value::Object(map) => map
            .get("content")
            .and_then(Value::as_array)
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find_map(|block| block.get("text").and_then(Value::as_str))
            })
            .or_else(|| map.get("result").and_then(Value::as_str))
            .unwrap_or_default(),
        _ => "",
    };

    let line = text
        .lines()
        .map(one_line)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    if line.chars().count() > RESULT_SUMMARY_CHARS {
        let cut: String = line.chars().take(RESULT_SUMMARY_CHARS - 1).collect();
        format!("{}…", cut)
    } else {
        line
    }
}

fn process_events<W: Write>(events: &[SpawnerEvent], ctx: &HookContext, out: &mut W, now: i64) {
    // Render even when another invocation holds the lock; the write may then
    // race, which costs one stale update at worst.
    let _lock = match ctx.store.lock() {
        Ok(lock) => Some(lock),
        Err(err) => {
            tracing::warn!(error = %err, "Proceeding without state lock");
            None
        }
    };

    let mut state = ctx.store.load();
    let mut finished = false;
    for event in events {
        let applied = apply_event(&mut state, event, now);
        tracing::debug!(kind = %event.kind(), "Applied event");
        if let Some(text) = ctx.renderer.applied(&applied) {
            write_block(out, &text);
        }

        // The session ends at the completion that finishes it; later events
        // in the same batch open a new one.
        if matches!(applied, Applied::Completed(_)) && all_agents_complete(&state) {
            write_block(out, &ctx.renderer.dashboard(&state, now));
            if let Err(err) = ctx.store.clear() {
                tracing::warn!(error = %err, "Failed to clear finished session");
            }
            state = NotificationState::new(now);
            finished = true;
        }
    }

    if finished && state.is_empty() {
        return;
    }
    if let Err(err) = ctx.store.save(&state) {
        tracing::warn!(error = %err, "Failed to save session state");
    }
}

fn write_block<W: Write>(out: &mut W, text: &str) {
    if let Err(err) = writeln!(out, "{}", text) {
        tracing::debug!(error = %err, "Failed to write notification");
    }
}
