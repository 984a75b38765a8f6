//! End-of-session summary: collaboration graph plus a stats table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Table};

use crate::format::format_duration;
use crate::state::{AgentState, AgentStatus, NotificationState};

use super::graph::{build_adjacency, layout, GraphNode};
use super::Theme;

fn elapsed(from: i64, now: i64) -> u64 {
    now.saturating_sub(from).max(0) as u64
}

fn agent_duration(agent: &AgentState, now: i64) -> u64 {
    if agent.status == AgentStatus::Complete {
        agent.duration
    } else {
        elapsed(agent.start_time, now)
    }
}

/// `←Backend, →QA`, or `-` when the agent never handed anything off.
fn handoff_arrows(agent: &AgentState) -> String {
    let arrows: Vec<String> = agent
        .handoffs_in
        .iter()
        .map(|from| format!("←{}", from))
        .chain(agent.handoffs_out.iter().map(|to| format!("→{}", to)))
        .collect();
    if arrows.is_empty() {
        "-".to_string()
    } else {
        arrows.join(", ")
    }
}

/// One node per distinct agent name, in session order.
fn graph_nodes(state: &NotificationState) -> Vec<GraphNode> {
    let mut nodes: Vec<GraphNode> = Vec::new();
    for agent in state.all_agents() {
        if !nodes.iter().any(|n| n.name == agent.name) {
            nodes.push(GraphNode::new(agent.name.clone(), agent.icon.clone()));
        }
    }
    nodes
}

pub fn collaboration_graph(state: &NotificationState) -> Vec<String> {
    layout(&build_adjacency(&state.handoffs), &graph_nodes(state))
}

pub fn stats_table(state: &NotificationState, now: i64) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Agent", "Tasks", "Duration", "Handoffs"]);

    let mut total_tasks = 0;
    let mut agents = 0;
    for agent in state.all_agents() {
        let tasks = agent.task_count();
        total_tasks += tasks;
        agents += 1;
        table.add_row(vec![
            Cell::new(format!("{} {}", agent.icon, agent.name)),
            Cell::new(tasks),
            Cell::new(format_duration(agent_duration(agent, now))),
            Cell::new(handoff_arrows(agent)),
        ]);
    }

    let plural = |n: usize, word: &str| {
        if n == 1 {
            format!("{} {}", n, word)
        } else {
            format!("{} {}s", n, word)
        }
    };
    table.add_row(vec![
        Cell::new(format!("Total · {}", plural(agents, "agent"))),
        Cell::new(total_tasks),
        Cell::new(format_duration(elapsed(state.start_time, now))),
        Cell::new(plural(state.handoffs.len(), "handoff")),
    ]);

    if let Some(column) = table.column_mut(1) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    table
}

pub fn render_dashboard(theme: &Theme, state: &NotificationState, now: i64) -> String {
    let mut out = vec![
        theme
            .ok
            .apply_to(format!(
                "✨ Session complete in {}",
                format_duration(elapsed(state.start_time, now))
            ))
            .to_string(),
        String::new(),
        theme.title.apply_to("Collaboration").to_string(),
    ];

    out.extend(
        collaboration_graph(state)
            .into_iter()
            .map(|line| format!("  {}", line)),
    );
    out.push(String::new());
    out.push(stats_table(state, now).to_string());

    out.join("\n")
}
