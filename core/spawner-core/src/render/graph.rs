//! Collaboration graph for the end-of-session dashboard.
//!
//! A small-graph heuristic, not a general layout algorithm. Sessions rarely
//! have more than four or five agents, and three shapes cover them:
//!
//! ```text
//! no edges          single root             several roots
//!
//! 🎨 A  🔧 B        🎨 A                    🎨 A ──┐
//!                   ├──▶ 🔧 B               🔧 B ──┤
//!                   │    └──▶ 🧪 C                 └──▶ 🧪 C
//!                   └──▶ 📝 D                           🧪 C ──▶ 🚀 D
//! ```
//!
//! Agents with no handoffs in or out are listed on a trailing `solo` line
//! once the graph has edges.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::catalog::get_agent_icon;
use crate::events::HandoffData;
use crate::format::{pad_right, width};

/// Sender name → distinct receiver names, in first-seen order.
pub type Adjacency = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub name: String,
    pub icon: String,
}

impl GraphNode {
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
        }
    }

    fn label(&self) -> String {
        format!("{} {}", self.icon, self.name)
    }
}

pub fn build_adjacency(handoffs: &[HandoffData]) -> Adjacency {
    let mut adjacency = Adjacency::new();
    for handoff in handoffs {
        let targets = adjacency.entry(handoff.from.clone()).or_default();
        if !targets.contains(&handoff.to) {
            targets.push(handoff.to.clone());
        }
    }
    adjacency
}

fn has_incoming(adjacency: &Adjacency, name: &str) -> bool {
    adjacency.values().any(|targets| targets.iter().any(|t| t == name))
}

fn is_connected(adjacency: &Adjacency, name: &str) -> bool {
    adjacency.contains_key(name) || has_incoming(adjacency, name)
}

/// Senders that nobody handed work to. Falls back to the first sender when
/// every sender also receives (a cycle).
pub fn roots(adjacency: &Adjacency) -> Vec<String> {
    let found: Vec<String> = adjacency
        .keys()
        .filter(|name| !has_incoming(adjacency, name))
        .cloned()
        .collect();
    if found.is_empty() {
        adjacency.keys().take(1).cloned().collect()
    } else {
        found
    }
}

struct Labels<'a> {
    nodes: &'a [GraphNode],
}

impl Labels<'_> {
    fn of(&self, name: &str) -> String {
        match self.nodes.iter().find(|n| n.name == name) {
            Some(node) => node.label(),
            None => format!("{} {}", get_agent_icon(name), name),
        }
    }

    fn join(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.of(n))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Lays the graph out as text lines (unstyled).
pub fn layout(adjacency: &Adjacency, nodes: &[GraphNode]) -> Vec<String> {
    let labels = Labels { nodes };

    if adjacency.is_empty() {
        if nodes.is_empty() {
            return Vec::new();
        }
        let flat = nodes
            .iter()
            .map(GraphNode::label)
            .collect::<Vec<_>>()
            .join("  ");
        return vec![flat];
    }

    let roots = roots(adjacency);
    let mut lines = if roots.len() == 1 {
        single_root(adjacency, &roots[0], &labels)
    } else {
        multi_root(adjacency, &roots, &labels)
    };

    // Cycles nobody hands into have no root; draw each from its first sender.
    let mut reached = reachable(adjacency, &roots);
    while let Some(start) = adjacency
        .keys()
        .find(|sender| !reached.contains(sender.as_str()))
        .cloned()
    {
        lines.extend(single_root(adjacency, &start, &labels));
        reached.extend(reachable(adjacency, std::slice::from_ref(&start)));
    }

    let solo: Vec<String> = nodes
        .iter()
        .filter(|n| !is_connected(adjacency, &n.name))
        .map(|n| n.name.clone())
        .collect();
    if !solo.is_empty() {
        lines.push(format!("solo: {}", labels.join(&solo)));
    }

    lines
}

/// Every name reachable from `starts`, the starts included.
fn reachable(adjacency: &Adjacency, starts: &[String]) -> HashSet<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut stack: Vec<&String> = starts.iter().collect();
    while let Some(name) = stack.pop() {
        if seen.insert(name.clone()) {
            stack.extend(targets_of(adjacency, name));
        }
    }
    seen
}

fn targets_of<'a>(adjacency: &'a Adjacency, name: &str) -> &'a [String] {
    adjacency.get(name).map(Vec::as_slice).unwrap_or(&[])
}

fn single_root(adjacency: &Adjacency, root: &str, labels: &Labels<'_>) -> Vec<String> {
    let mut lines = vec![labels.of(root)];
    let children = targets_of(adjacency, root);

    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, rail) = if last { ("└──▶ ", "     ") } else { ("├──▶ ", "│    ") };
        lines.push(format!("{}{}", branch, labels.of(child)));

        let grandchildren: Vec<String> = targets_of(adjacency, child)
            .iter()
            .filter(|g| *g != child)
            .cloned()
            .collect();
        if !grandchildren.is_empty() {
            lines.push(format!("{}└──▶ {}", rail, labels.join(&grandchildren)));
        }
    }

    lines
}

fn multi_root(adjacency: &Adjacency, roots: &[String], labels: &Labels<'_>) -> Vec<String> {
    let root_labels: Vec<String> = roots.iter().map(|r| labels.of(r)).collect();
    let column = root_labels.iter().map(|l| width(l)).max().unwrap_or(0);

    let mut lines: Vec<String> = root_labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let joint = if i == 0 { "┐" } else { "┤" };
            format!("{} ──{}", pad_right(label, column), joint)
        })
        .collect();

    let mut union: Vec<String> = Vec::new();
    for root in roots {
        for target in targets_of(adjacency, root) {
            if !union.contains(target) {
                union.push(target.clone());
            }
        }
    }

    let indent = " ".repeat(column + 3);
    lines.push(format!("{}└──▶ {}", indent, labels.join(&union)));

    let mut shown: HashSet<String> = roots.iter().chain(union.iter()).cloned().collect();
    let note_indent = " ".repeat(column + 3 + 5);
    for target in &union {
        let further: Vec<String> = targets_of(adjacency, target)
            .iter()
            .filter(|f| !shown.contains(f.as_str()))
            .cloned()
            .collect();
        if further.is_empty() {
            continue;
        }
        shown.extend(further.iter().cloned());
        lines.push(format!(
            "{}{} ──▶ {}",
            note_indent,
            labels.of(target),
            labels.join(&further)
        ));
    }

    lines
}
