//! Serialized session state shared by every hook invocation.
//!
//! **Breaking changes are allowed**: the snapshot only has to survive one
//! session. Current on-disk format is v1.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::events::HandoffData;

pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Waiting,
    Complete,
    Error,
}

impl AgentStatus {
    pub fn label(self) -> &'static str {
        match self {
            AgentStatus::Active => "ACTIVE",
            AgentStatus::Waiting => "WAITING",
            AgentStatus::Complete => "DONE",
            AgentStatus::Error => "BLOCKED",
        }
    }
}

/// One agent instance, from spawn until the end of the session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub id: String,
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub completed: Vec<String>,
    #[serde(default)]
    pub current: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub start_time: i64,
    /// Milliseconds; zero until the agent completes.
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub handoffs_in: Vec<String>,
    #[serde(default)]
    pub handoffs_out: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_for: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Count reported by the agent on completion, when it sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks_completed: Option<u32>,
}

impl AgentState {
    /// Number of tasks shown in the summary; an agent did at least its own.
    pub fn task_count(&self) -> usize {
        match self.tasks_completed {
            Some(n) if n > 0 => n as usize,
            _ => self.completed.len().max(1),
        }
    }

    pub fn is_waiting_for(&self, name: &str) -> bool {
        self.status == AgentStatus::Waiting && self.waiting_for.as_deref() == Some(name)
    }
}

/// Whole-session snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, with = "pairs")]
    pub active_agents: IndexMap<String, AgentState>,
    /// Append-only: ids are never removed once completed.
    #[serde(default, with = "pairs")]
    pub completed_agents: IndexMap<String, AgentState>,
    /// Append-only, in announcement order.
    #[serde(default)]
    pub handoffs: Vec<HandoffData>,
    pub start_time: i64,
    #[serde(default)]
    pub total_tasks: u32,
    /// Display name → id of the most recently spawned active agent with that name.
    #[serde(skip)]
    name_index: HashMap<String, String>,
}

// The name index is derived data and stays out of equality.
impl PartialEq for NotificationState {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.active_agents == other.active_agents
            && self.completed_agents == other.completed_agents
            && self.handoffs == other.handoffs
            && self.start_time == other.start_time
            && self.total_tasks == other.total_tasks
    }
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl NotificationState {
    pub fn new(start_time: i64) -> Self {
        Self {
            version: STATE_VERSION,
            active_agents: IndexMap::new(),
            completed_agents: IndexMap::new(),
            handoffs: Vec::new(),
            start_time,
            total_tasks: 0,
            name_index: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.active_agents.is_empty() && self.completed_agents.is_empty() && self.handoffs.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.active_agents.contains_key(id) || self.completed_agents.contains_key(id)
    }

    /// Every agent seen this session: completed first, in completion order,
    /// then the ones still running.
    pub fn all_agents(&self) -> impl Iterator<Item = &AgentState> {
        self.completed_agents.values().chain(self.active_agents.values())
    }

    /// Resolves a display name to an active agent id.
    pub fn active_id_for_name(&self, name: &str) -> Option<&str> {
        self.name_index.get(name).map(String::as_str)
    }

    pub(crate) fn index_name(&mut self, name: &str, id: &str) {
        if let Some(previous) = self.name_index.insert(name.to_string(), id.to_string()) {
            if previous != id {
                tracing::debug!(name, id, shadowed = %previous, "Agent name now resolves to newer spawn");
            }
        }
    }

    /// Rebuilds the name index from `active_agents`. Later spawns win ties.
    pub fn rebuild_name_index(&mut self) {
        self.name_index = self
            .active_agents
            .iter()
            .map(|(id, agent)| (agent.name.clone(), id.clone()))
            .collect();
    }
}

/// Serializes an `IndexMap` as an ordered list of `[key, value]` pairs.
mod pairs {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::hash::Hash;

    pub fn serialize<K, V, S>(map: &IndexMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<IndexMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Eq + Hash,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let entries = Vec::<(K, V)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, name: &str) -> AgentState {
        AgentState {
            id: id.to_string(),
            name: name.to_string(),
            icon: "🤖".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_task_count_defaults_to_one() {
        let mut a = agent("a1", "Frontend");
        assert_eq!(a.task_count(), 1);
        a.completed = vec!["one".into(), "two".into()];
        assert_eq!(a.task_count(), 2);
        a.tasks_completed = Some(5);
        assert_eq!(a.task_count(), 5);
    }

    #[test]
    fn test_maps_serialize_as_pairs() {
        let mut state = NotificationState::new(10);
        state.active_agents.insert("a1".into(), agent("a1", "Frontend"));

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["activeAgents"][0][0], "a1");
        assert_eq!(value["activeAgents"][0][1]["name"], "Frontend");
        assert_eq!(value["startTime"], 10);
        assert!(value.get("nameIndex").is_none());
    }

    #[test]
    fn test_pairs_preserve_order() {
        let mut state = NotificationState::new(0);
        for id in ["z", "a", "m"] {
            state.completed_agents.insert(id.into(), agent(id, id));
        }
        let text = serde_json::to_string(&state).unwrap();
        let back: NotificationState = serde_json::from_str(&text).unwrap();
        let ids: Vec<_> = back.completed_agents.keys().cloned().collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_rebuilt_index_prefers_later_spawn() {
        let mut state = NotificationState::new(0);
        state.active_agents.insert("a1".into(), agent("a1", "Backend"));
        state.active_agents.insert("a2".into(), agent("a2", "Backend"));
        state.rebuild_name_index();
        assert_eq!(state.active_id_for_name("Backend"), Some("a2"));
    }
}
