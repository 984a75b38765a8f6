//! Display names and icons for agent types.
//!
//! Task calls only carry a `subagent_type` string such as `frontend`,
//! `Backend` or `spawner:frontend`. Resolution order:
//!
//! 1. exact key
//! 2. lowercased key
//! 3. last `:`-delimited segment (exact, then lowercased)
//! 4. derived: title-cased type string + keyword icon

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const GENERIC_ICON: &str = "🤖";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub icon: String,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
        }
    }
}

const BUILTIN: &[(&str, &str, &str)] = &[
    ("frontend", "Frontend", "🎨"),
    ("backend", "Backend", "🔧"),
    ("database", "Database", "💾"),
    ("api", "API", "🔌"),
    ("devops", "DevOps", "🚀"),
    ("testing", "QA", "🧪"),
    ("qa", "QA", "🧪"),
    ("security", "Security", "🔒"),
    ("docs", "Docs", "📝"),
    ("design", "Design", "📐"),
    ("mobile", "Mobile", "📱"),
    ("data", "Data", "📊"),
    ("ai", "AI", "🧠"),
    ("performance", "Performance", "⚡"),
    ("architect", "Architect", "🧱"),
    ("orchestrator", "Orchestrator", "🎯"),
    ("general-purpose", "General", "🤖"),
    ("explore", "Explorer", "🔍"),
    ("plan", "Planner", "📋"),
    ("code-reviewer", "Reviewer", "👀"),
];

/// Keyword → icon, checked in order against a lowercased agent name.
const ICON_KEYWORDS: &[(&[&str], &str)] = &[
    (&["front", "ui", "react", "css"], "🎨"),
    (&["back", "server"], "🔧"),
    (&["database", "sql", "db"], "💾"),
    (&["api"], "🔌"),
    (&["test", "qa"], "🧪"),
    (&["secur", "auth"], "🔒"),
    (&["devops", "deploy", "infra", "ci"], "🚀"),
    (&["doc", "writ", "copy"], "📝"),
    (&["design"], "📐"),
    (&["mobile", "ios", "android"], "📱"),
    (&["review"], "👀"),
    (&["plan", "architect"], "📋"),
    (&["explor", "search", "research"], "🔍"),
    (&["data", "analyt"], "📊"),
];

/// Picks an icon for an agent name that is not in the catalog.
pub fn get_agent_icon(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    ICON_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, icon)| *icon)
        .unwrap_or(GENERIC_ICON)
}

/// `data-pipeline` → `Data Pipeline`.
pub fn title_case(raw: &str) -> String {
    raw.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct AgentCatalog {
    entries: HashMap<String, AgentProfile>,
}

impl Default for AgentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AgentCatalog {
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(key, name, icon)| (key.to_string(), AgentProfile::new(*name, *icon)))
            .collect();
        Self { entries }
    }

    /// Built-in entries plus `custom`, which wins on key collisions.
    pub fn with_custom(custom: &HashMap<String, AgentProfile>) -> Self {
        let mut catalog = Self::builtin();
        for (key, profile) in custom {
            catalog.entries.insert(key.clone(), profile.clone());
        }
        catalog
    }

    fn lookup(&self, key: &str) -> Option<&AgentProfile> {
        self.entries
            .get(key)
            .or_else(|| self.entries.get(&key.to_lowercase()))
    }

    /// Resolves a `subagent_type` to a display profile. Never fails.
    pub fn resolve(&self, agent_type: &str) -> AgentProfile {
        let agent_type = agent_type.trim();

        if let Some(profile) = self.lookup(agent_type) {
            return profile.clone();
        }

        let segment = agent_type.rsplit(':').next().unwrap_or(agent_type).trim();
        if let Some(profile) = self.lookup(segment) {
            return profile.clone();
        }

        let name = title_case(segment);
        if name.is_empty() {
            return AgentProfile::new("Agent", GENERIC_ICON);
        }
        let icon = get_agent_icon(&name);
        AgentProfile::new(name, icon)
    }
}
