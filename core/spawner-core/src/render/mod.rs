//! Terminal rendering.
//!
//! Every function here builds a `String` and nothing else; the hook decides
//! where it goes (stderr). Styles are bound to stderr, so `NO_COLOR` and
//! non-tty stderr strip them automatically.

pub mod dashboard;
pub mod frame;
pub mod graph;

use console::Style;

use crate::catalog::get_agent_icon;
use crate::events::{HandoffData, Severity};
use crate::format::{format_duration, one_line};
use crate::handlers::{Applied, HandoffOutcome};
use crate::state::{AgentState, AgentStatus, NotificationState};

use frame::FrameKind;

pub use dashboard::{collaboration_graph, render_dashboard, stats_table};
pub use graph::{build_adjacency, layout, Adjacency, GraphNode};

/// Inner width bounds for agent lanes.
pub const MIN_LANE_WIDTH: usize = 36;
pub const DEFAULT_LANE_WIDTH: usize = 64;

const BAR_CELLS: usize = 20;
const RECENT_STEPS: usize = 3;

#[derive(Debug, Clone)]
pub struct Theme {
    pub title: Style,
    pub dim: Style,
    pub accent: Style,
    pub ok: Style,
    pub warn: Style,
    pub danger: Style,
    pub bar: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            title: Style::new().bold().for_stderr(),
            dim: Style::new().dim().for_stderr(),
            accent: Style::new().cyan().for_stderr(),
            ok: Style::new().green().bold().for_stderr(),
            warn: Style::new().yellow().for_stderr(),
            danger: Style::new().red().bold().for_stderr(),
            bar: Style::new().magenta().for_stderr(),
        }
    }
}

impl Theme {
    pub fn status(&self, status: AgentStatus) -> &Style {
        match status {
            AgentStatus::Active => &self.accent,
            AgentStatus::Waiting => &self.warn,
            AgentStatus::Complete => &self.ok,
            AgentStatus::Error => &self.danger,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    theme: Theme,
    lane_width: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new(DEFAULT_LANE_WIDTH)
    }
}

impl Renderer {
    pub fn new(lane_width: usize) -> Self {
        Renderer {
            theme: Theme::default(),
            lane_width: lane_width.max(MIN_LANE_WIDTH),
        }
    }

    fn progress_bar(&self, percent: u8) -> String {
        let percent = percent.min(100) as usize;
        let filled = (percent * BAR_CELLS + 50) / 100;
        format!(
            "{}{} {:>3}%",
            self.theme.bar.apply_to("█".repeat(filled)),
            self.theme.dim.apply_to("░".repeat(BAR_CELLS - filled)),
            percent
        )
    }

    fn recent_steps(&self, completed: &[String]) -> String {
        let skip = completed.len().saturating_sub(RECENT_STEPS);
        let steps: Vec<String> = completed[skip..]
            .iter()
            .map(|step| format!("{} {}", self.theme.ok.apply_to("✓"), one_line(step)))
            .collect();
        let mut line = steps.join("  ");
        if skip > 0 {
            line = format!("{} {}", self.theme.dim.apply_to(format!("+{}", skip)), line);
        }
        line
    }

    /// Boxed lane for one agent.
    ///
    /// ```text
    /// ╭─ 🎨 Frontend [ACTIVE] ───────────────╮
    /// │ Build login page                      │
    /// │ ▸ Implementing form                   │
    /// │ ██████████░░░░░░░░░░  50%             │
    /// │ ✓ setup  ✓ layout                     │
    /// ╰───────────────────────────────────────╯
    /// ```
    pub fn agent_lane(&self, agent: &AgentState) -> String {
        let t = &self.theme;
        let status_style = t.status(agent.status);
        let title = format!(
            "{} {} {}",
            agent.icon,
            t.title.apply_to(&agent.name),
            status_style.apply_to(format!("[{}]", agent.status.label()))
        );

        let mut body = Vec::new();
        if !agent.task.trim().is_empty() {
            body.push(t.dim.apply_to(one_line(&agent.task)).to_string());
        }
        body.push(format!("{} {}", t.accent.apply_to("▸"), one_line(&agent.current)));

        let mut bar = self.progress_bar(agent.progress);
        if agent.status == AgentStatus::Complete {
            bar = format!("{}  done in {}", bar, format_duration(agent.duration));
        }
        body.push(bar);

        if let Some(waiting_for) = &agent.waiting_for {
            let mut line = format!("⏳ waiting for {}", waiting_for);
            if let Some(reason) = &agent.waiting_reason {
                line = format!("{}: {}", line, one_line(reason));
            }
            body.push(t.warn.apply_to(line).to_string());
        }
        if let Some(error) = &agent.error {
            if agent.status != AgentStatus::Error {
                body.push(t.warn.apply_to(format!("⚠ {}", one_line(error))).to_string());
            }
        }
        if !agent.completed.is_empty() {
            body.push(self.recent_steps(&agent.completed));
        }

        frame::draw(
            FrameKind::Rounded,
            &title,
            &body,
            status_style,
            MIN_LANE_WIDTH,
            self.lane_width,
        )
    }

    /// `🔧 Backend ──▶ 🎨 Frontend  API ready`
    pub fn handoff(&self, handoff: &HandoffData, outcome: &HandoffOutcome) -> String {
        let t = &self.theme;
        let icon = |agent: &Option<AgentState>, name: &str| match agent {
            Some(agent) => agent.icon.clone(),
            None => get_agent_icon(name).to_string(),
        };

        let mut line = format!(
            "{} {} {} {} {}",
            icon(&outcome.sender, &handoff.from),
            t.title.apply_to(&handoff.from),
            t.accent.apply_to("──▶"),
            icon(&outcome.receiver, &handoff.to),
            t.title.apply_to(&handoff.to),
        );
        if !handoff.description.trim().is_empty() {
            line = format!("{}  {}", line, t.dim.apply_to(one_line(&handoff.description)));
        }
        if outcome.unblocked {
            line = format!("{}  {}", line, t.ok.apply_to(format!("({} unblocked)", handoff.to)));
        }
        line
    }

    /// Heavy red box; the session cannot finish until this agent recovers.
    pub fn blocker(&self, agent: &AgentState, error: &str) -> String {
        let t = &self.theme;
        let title = format!(
            "{} {} {}",
            t.danger.apply_to("⛔ BLOCKED ·"),
            agent.icon,
            t.title.apply_to(&agent.name)
        );
        let mut body = vec![t.danger.apply_to(one_line(error)).to_string()];
        if !agent.task.trim().is_empty() {
            body.push(t.dim.apply_to(format!("while: {}", one_line(&agent.task))).to_string());
        }
        frame::draw(
            FrameKind::Heavy,
            &title,
            &body,
            &t.danger,
            MIN_LANE_WIDTH,
            self.lane_width,
        )
    }

    pub fn warning(&self, agent: &AgentState, error: &str) -> String {
        self.theme
            .warn
            .apply_to(format!("⚠  {} {}: {}", agent.icon, agent.name, one_line(error)))
            .to_string()
    }

    pub fn skill_loading(&self, skill: &str) -> String {
        format!(
            "📚 {} {}",
            self.theme.dim.apply_to("Loading skill:"),
            self.theme.accent.apply_to(skill)
        )
    }

    /// Output for one applied event; `None` when the event was ignored.
    pub fn applied(&self, applied: &Applied) -> Option<String> {
        match applied {
            Applied::Spawned(agent)
            | Applied::Progressed(agent)
            | Applied::Waiting(agent)
            | Applied::Completed(agent) => Some(self.agent_lane(agent)),
            // Neither side belongs to this session.
            Applied::Handoff { outcome, .. }
                if outcome.sender.is_none() && outcome.receiver.is_none() =>
            {
                None
            }
            Applied::Handoff { handoff, outcome } => Some(self.handoff(handoff, outcome)),
            Applied::Errored { agent, severity } => {
                let error = agent.error.as_deref().unwrap_or_default();
                Some(match severity {
                    Severity::Blocking => self.blocker(agent, error),
                    Severity::Warning => self.warning(agent, error),
                })
            }
            Applied::Ignored(_) => None,
        }
    }

    pub fn dashboard(&self, state: &NotificationState, now: i64) -> String {
        render_dashboard(&self.theme, state, now)
    }

    /// Snapshot of a running session: active lanes plus the graph so far.
    pub fn session_status(&self, state: &NotificationState, now: i64) -> String {
        let t = &self.theme;
        if state.is_empty() {
            return t.dim.apply_to("No spawner session in progress").to_string();
        }

        let mut out = vec![t
            .title
            .apply_to(format!(
                "Session running for {} · {} active · {} done · {} handoffs",
                format_duration(now.saturating_sub(state.start_time).max(0) as u64),
                state.active_agents.len(),
                state.completed_agents.len(),
                state.handoffs.len()
            ))
            .to_string()];

        for agent in state.active_agents.values() {
            out.push(self.agent_lane(agent));
        }

        let graph = collaboration_graph(state);
        if !graph.is_empty() {
            out.push(t.title.apply_to("Collaboration").to_string());
            out.extend(graph.into_iter().map(|line| format!("  {}", line)));
        }

        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use console::strip_ansi_codes;

    use crate::format::width;

    fn frontend() -> AgentState {
        AgentState {
            id: "a1".into(),
            name: "Frontend".into(),
            icon: "🎨".into(),
            task: "Build login page".into(),
            current: "Implementing form".into(),
            progress: 50,
            completed: vec!["setup".into(), "layout".into()],
            ..Default::default()
        }
    }

    fn plain(text: &str) -> String {
        strip_ansi_codes(text).into_owned()
    }

    #[test]
    fn test_agent_lane_shows_task_current_and_progress() {
        let lane = plain(&Renderer::default().agent_lane(&frontend()));
        let rows: Vec<&str> = lane.lines().collect();

        assert!(rows[0].starts_with("╭─ 🎨 Frontend [ACTIVE] "));
        assert!(lane.contains("Build login page"));
        assert!(lane.contains("▸ Implementing form"));
        assert!(lane.contains("██████████░░░░░░░░░░  50%"));
        assert!(lane.contains("✓ setup  ✓ layout"));

        let first = width(rows[0]);
        assert!(rows.iter().all(|r| width(r) == first), "{}", lane);
    }

    #[test]
    fn test_agent_lane_keeps_only_recent_steps() {
        let mut agent = frontend();
        agent.completed = (1..=5).map(|i| format!("step{}", i)).collect();
        let lane = plain(&Renderer::default().agent_lane(&agent));
        assert!(lane.contains("+2 ✓ step3  ✓ step4  ✓ step5"));
        assert!(!lane.contains("step1"));
    }

    #[test]
    fn test_agent_lane_waiting_and_complete_details() {
        let renderer = Renderer::default();

        let mut waiting = frontend();
        waiting.status = AgentStatus::Waiting;
        waiting.waiting_for = Some("Backend".into());
        waiting.waiting_reason = Some("needs API".into());
        let lane = plain(&renderer.agent_lane(&waiting));
        assert!(lane.contains("[WAITING]"));
        assert!(lane.contains("⏳ waiting for Backend: needs API"));

        let mut done = frontend();
        done.status = AgentStatus::Complete;
        done.progress = 100;
        done.duration = 125_000;
        let lane = plain(&renderer.agent_lane(&done));
        assert!(lane.contains("[DONE]"));
        assert!(lane.contains("100%  done in 2m 5s"));
    }

    #[test]
    fn test_lane_width_is_capped() {
        let mut agent = frontend();
        agent.task = "word ".repeat(100);
        let lane = plain(&Renderer::new(40).agent_lane(&agent));
        assert!(lane.lines().all(|row| width(row) == 44), "{}", lane);
        assert!(lane.contains('…'));
    }

    #[test]
    fn test_handoff_line_with_unblock_note() {
        let handoff = HandoffData {
            from: "Backend".into(),
            to: "Frontend".into(),
            description: "API contract ready".into(),
            ..Default::default()
        };
        let outcome = HandoffOutcome {
            sender: None,
            receiver: Some(frontend()),
            unblocked: true,
        };
        let line = plain(&Renderer::default().handoff(&handoff, &outcome));
        assert_eq!(
            line,
            "🔧 Backend ──▶ 🎨 Frontend  API contract ready  (Frontend unblocked)"
        );
    }

    #[test]
    fn test_handoff_between_strangers_renders_nothing() {
        let applied = Applied::Handoff {
            handoff: HandoffData {
                from: "Ghost".into(),
                to: "Phantom".into(),
                ..Default::default()
            },
            outcome: HandoffOutcome::default(),
        };
        assert_eq!(Renderer::default().applied(&applied), None);
    }

    #[test]
    fn test_blocker_and_warning_are_distinct() {
        let renderer = Renderer::default();
        let agent = frontend();

        let blocker = plain(&renderer.blocker(&agent, "npm install failed"));
        assert!(blocker.starts_with("┏━ ⛔ BLOCKED · 🎨 Frontend"));
        assert!(blocker.contains("┃ npm install failed"));
        assert!(blocker.contains("while: Build login page"));

        let warning = plain(&renderer.warning(&agent, "deprecated API"));
        assert_eq!(warning, "⚠  🎨 Frontend: deprecated API");
        assert_eq!(warning.lines().count(), 1);
    }

    #[test]
    fn test_applied_ignored_renders_nothing() {
        let renderer = Renderer::default();
        assert!(renderer
            .applied(&Applied::Ignored(crate::events::EventKind::Progress))
            .is_none());
    }

    #[test]
    fn test_skill_loading_line() {
        let line = plain(&Renderer::default().skill_loading("react-patterns"));
        assert_eq!(line, "📚 Loading skill: react-patterns");
    }

    #[test]
    fn test_session_status_for_empty_and_running_sessions() {
        let renderer = Renderer::default();
        let empty = NotificationState::new(0);
        assert_eq!(
            plain(&renderer.session_status(&empty, 10)),
            "No spawner session in progress"
        );

        let mut state = NotificationState::new(0);
        state.active_agents.insert("a1".into(), frontend());
        let text = plain(&renderer.session_status(&state, 61_000));
        assert!(text.starts_with("Session running for 1m 1s · 1 active · 0 done · 0 handoffs"));
        assert!(text.contains("╭─ 🎨 Frontend"));
        assert!(text.contains("Collaboration\n  🎨 Frontend"));
    }
}
